use std::sync::{Arc, Weak};

use async_trait::async_trait;

use super::gateway::{
    CallActionHandler, CallActionKind, ExecutionContext, IncomingCallGateway, NotificationEvent,
};
use crate::agent::{AgentId, NotificationId};
use crate::error::{CallError, CallResult};
use crate::store::{AgentStore, CallSignalStore, PendingCall};

/// Screens the dispatcher can move the live UI to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Agent list
    Home,
    /// Ringing screen for an agent
    IncomingCall(AgentId),
    /// Active call with an agent
    RealtimeCall(AgentId),
}

/// Live UI navigation, only usable in the foreground
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Turns alert events into navigation or durable call signals
pub struct CallActionDispatcher {
    agents: AgentStore,
    signals: CallSignalStore,
    gateway: Arc<dyn IncomingCallGateway>,
    navigator: Arc<dyn Navigator>,
}

impl CallActionDispatcher {
    pub fn new(
        agents: AgentStore,
        signals: CallSignalStore,
        gateway: Arc<dyn IncomingCallGateway>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            agents,
            signals,
            gateway,
            navigator,
        }
    }

    /// Register with the gateway as its action handler.
    ///
    /// The gateway only holds a weak reference. Events delivered after the
    /// last `Arc` to the dispatcher is dropped are ignored.
    pub fn install(self: &Arc<Self>) {
        self.gateway
            .set_action_handler(Arc::new(InstalledDispatcher(Arc::downgrade(self))));
    }

    /// Handle one alert event.
    ///
    /// In the foreground the UI moves directly and pending signals are
    /// dropped. In the background only the signal store is written.
    pub async fn dispatch(&self, event: NotificationEvent, context: ExecutionContext) -> CallResult<()> {
        tracing::info!(?event, ?context, "notification event");
        let agent_id = event.agent_id().clone();
        let fired = self.forget_schedule(&agent_id).await;

        match (context, event) {
            (ExecutionContext::Foreground, NotificationEvent::ActionPressed(action)) => {
                if let Err(e) = self.signals.clear().await {
                    tracing::warn!(agent_id = %action.agent_id, error = %e, "failed to clear call signals");
                }
                match action.kind {
                    CallActionKind::Answer => self.navigator.navigate(Route::RealtimeCall(action.agent_id)),
                    CallActionKind::Decline => {
                        self.dismiss(fired).await;
                        self.navigator.navigate(Route::Home);
                    }
                }
            }
            (ExecutionContext::Foreground, NotificationEvent::FullScreenShown(intent)) => {
                self.navigator.navigate(Route::IncomingCall(intent.agent_id));
            }
            (ExecutionContext::Background, NotificationEvent::ActionPressed(action)) => match action.kind {
                CallActionKind::Answer => self.signals.record_direct_start(&action.agent_id).await?,
                CallActionKind::Decline => self.dismiss(fired).await,
            },
            (ExecutionContext::Background, NotificationEvent::FullScreenShown(intent)) => {
                self.signals.record_incoming(&intent.agent_id).await?;
            }
        }
        Ok(())
    }

    /// Replay a signal left by the background handler, at most once.
    ///
    /// Returns the route taken, or `None` when nothing was pending or the
    /// agent no longer exists.
    pub async fn resume(&self) -> CallResult<Option<Route>> {
        let Some(pending) = self.signals.consume().await? else {
            return Ok(None);
        };

        if self.agents.get(pending.agent_id()).await?.is_none() {
            tracing::warn!(agent_id = %pending.agent_id(), "pending call for unknown agent dropped");
            return Ok(None);
        }

        let route = match pending {
            PendingCall::DirectStart(id) => Route::RealtimeCall(id),
            PendingCall::ShowIncoming(id) => Route::IncomingCall(id),
        };
        self.navigator.navigate(route.clone());
        Ok(Some(route))
    }

    /// The alert fired, so the agent no longer has a call scheduled
    async fn forget_schedule(&self, agent_id: &AgentId) -> Option<NotificationId> {
        match self.agents.clear_schedule(agent_id).await {
            Ok(previous) => previous,
            Err(CallError::AgentNotFound { .. }) => None,
            Err(e) => {
                tracing::warn!(agent_id = %agent_id, error = %e, "failed to clear fired schedule");
                None
            }
        }
    }

    async fn dismiss(&self, notification_id: Option<NotificationId>) {
        let Some(notification_id) = notification_id else {
            return;
        };
        if let Err(e) = self.gateway.cancel(&notification_id).await {
            tracing::warn!(notification_id = %notification_id, error = %e, "failed to dismiss notification");
        }
    }
}

/// Weak handle to a dispatcher, as registered with the gateway
struct InstalledDispatcher(Weak<CallActionDispatcher>);

#[async_trait]
impl CallActionHandler for InstalledDispatcher {
    async fn on_event(&self, event: NotificationEvent, context: ExecutionContext) {
        match self.0.upgrade() {
            Some(dispatcher) => dispatcher.on_event(event, context).await,
            None => tracing::debug!(?event, ?context, "dispatcher dropped, event ignored"),
        }
    }
}

#[async_trait]
impl CallActionHandler for CallActionDispatcher {
    async fn on_event(&self, event: NotificationEvent, context: ExecutionContext) {
        if let Err(e) = self.dispatch(event, context).await {
            tracing::error!(?context, error = %e, "failed to handle notification event");
        }
    }
}
