use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::gateway::{Clock, IncomingCallGateway, NotificationRequest, PermissionStatus, SystemClock};
use crate::agent::{AgentId, NotificationId};
use crate::config::NotificationChannel;
use crate::error::{CallError, CallResult};
use crate::store::AgentStore;

/// Schedules simulated incoming calls and keeps agents' schedule fields in step
#[derive(Clone)]
pub struct IncomingCallScheduler {
    gateway: Arc<dyn IncomingCallGateway>,
    agents: AgentStore,
    clock: Arc<dyn Clock>,
    channel: NotificationChannel,
    permission_granted: Arc<AtomicBool>,
}

impl IncomingCallScheduler {
    pub fn new(gateway: Arc<dyn IncomingCallGateway>, agents: AgentStore) -> Self {
        Self {
            gateway,
            agents,
            clock: Arc::new(SystemClock),
            channel: NotificationChannel::default(),
            permission_granted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_channel(mut self, channel: NotificationChannel) -> Self {
        self.channel = channel;
        self
    }

    /// Ask for notification permission unless it was already granted
    pub async fn ensure_permission(&self) -> CallResult<()> {
        if self.permission_granted.load(Ordering::SeqCst) {
            return Ok(());
        }
        match self.gateway.request_permission().await? {
            PermissionStatus::Granted => {
                self.permission_granted.store(true, Ordering::SeqCst);
                Ok(())
            }
            PermissionStatus::Denied => {
                tracing::warn!("notification permission refused");
                Err(CallError::permission_denied("schedule incoming call"))
            }
        }
    }

    /// Register an incoming-call alert from `agent_name` at `when`
    ///
    /// # Errors
    ///
    /// * `CallError::PermissionDenied` - The user refused notifications
    /// * `CallError::InvalidSchedule` - `when` is not in the future
    /// * `CallError::NotificationFailure` - The platform rejected the alert
    pub async fn schedule(&self, agent_name: &str, when: DateTime<Utc>, agent_id: &AgentId) -> CallResult<NotificationId> {
        self.ensure_permission().await?;

        let now = self.clock.now();
        if when <= now {
            return Err(CallError::invalid_schedule(format!(
                "call time {} is not after current time {}",
                when.to_rfc3339(),
                now.to_rfc3339()
            )));
        }

        let request = NotificationRequest::incoming_call(agent_name, agent_id, when, self.channel.clone());
        let notification_id = self.gateway.schedule(request).await?;
        if notification_id.is_empty() {
            return Err(CallError::notification_failure("platform returned an empty notification id"));
        }

        tracing::info!(
            agent_id = %agent_id,
            notification_id = %notification_id,
            at = %when.to_rfc3339(),
            "scheduled incoming call"
        );
        Ok(notification_id)
    }

    /// Best-effort cancellation of the trigger and any displayed alert
    pub async fn cancel(&self, notification_id: &NotificationId) {
        match self.gateway.cancel(notification_id).await {
            Ok(()) => tracing::info!(notification_id = %notification_id, "cancelled incoming call"),
            Err(e) => tracing::warn!(notification_id = %notification_id, error = %e, "failed to cancel notification"),
        }
    }

    /// Schedule a call from a stored agent, replacing any call already scheduled for it
    pub async fn schedule_for_agent(&self, agent_id: &AgentId, when: DateTime<Utc>) -> CallResult<NotificationId> {
        let agent = self
            .agents
            .get(agent_id)
            .await?
            .ok_or_else(|| CallError::AgentNotFound { agent_id: agent_id.to_string() })?;

        let name = agent.params.name.trim();
        if name.is_empty() {
            return Err(CallError::invalid_schedule("agent name is empty"));
        }
        if when <= self.clock.now() {
            return Err(CallError::invalid_schedule("call time must be in the future"));
        }

        if let Some(previous) = agent.params.notification_id() {
            self.cancel(previous).await;
        }

        let notification_id = self.schedule(name, when, agent_id).await?;
        self.agents
            .mark_scheduled(agent_id, notification_id.clone(), when)
            .await?;
        Ok(notification_id)
    }

    /// Cancel the agent's scheduled call, if any. Returns whether one was set.
    pub async fn cancel_for_agent(&self, agent_id: &AgentId) -> CallResult<bool> {
        match self.agents.clear_schedule(agent_id).await? {
            Some(notification_id) => {
                self.cancel(&notification_id).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
