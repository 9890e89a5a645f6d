//! Terminal stand-in for the platform notification service
//!
//! Scheduled alerts are kept in the data directory so a later invocation can
//! list them or simulate their delivery with `meetai notify`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use meetai_call_core::agent::{AgentId, NotificationId};
use meetai_call_core::scheduler::{
    CallActionHandler, ExecutionContext, IncomingCallGateway, NotificationEvent, NotificationRequest,
    PermissionStatus,
};
use meetai_call_core::{CallError, CallResult, KeyValueStore};

/// Key holding alerts scheduled from the CLI
pub const PENDING_KEY: &str = "cliNotifications";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: NotificationId,
    pub request: NotificationRequest,
}

pub struct StoredGateway {
    backend: Arc<dyn KeyValueStore>,
    handler: Mutex<Option<Arc<dyn CallActionHandler>>>,
}

impl StoredGateway {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            handler: Mutex::new(None),
        }
    }

    pub async fn pending(&self) -> CallResult<Vec<StoredNotification>> {
        match self.backend.get(PENDING_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| CallError::storage_failure(PENDING_KEY, e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    pub async fn pending_for(&self, agent_id: &AgentId) -> CallResult<Option<StoredNotification>> {
        Ok(self
            .pending()
            .await?
            .into_iter()
            .find(|n| n.request.agent_id() == agent_id))
    }

    async fn save(&self, pending: &[StoredNotification]) -> CallResult<()> {
        let raw = serde_json::to_string(pending).map_err(|e| CallError::storage_failure(PENDING_KEY, e.to_string()))?;
        self.backend.set(PENDING_KEY, raw).await
    }

    /// Hand `event` to the registered handler, as the platform would
    pub async fn deliver(&self, event: NotificationEvent, context: ExecutionContext) -> bool {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => {
                handler.on_event(event, context).await;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl IncomingCallGateway for StoredGateway {
    async fn request_permission(&self) -> CallResult<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn schedule(&self, request: NotificationRequest) -> CallResult<NotificationId> {
        let id = NotificationId::new(format!(
            "cli-{}-{}",
            request.agent_id(),
            request.trigger_at.timestamp()
        ));
        let mut pending = self.pending().await?;
        pending.retain(|n| n.id != id);
        pending.push(StoredNotification {
            id: id.clone(),
            request,
        });
        self.save(&pending).await?;
        Ok(id)
    }

    async fn cancel(&self, notification_id: &NotificationId) -> CallResult<()> {
        let mut pending = self.pending().await?;
        let before = pending.len();
        pending.retain(|n| &n.id != notification_id);
        if pending.len() != before {
            self.save(&pending).await?;
        }
        Ok(())
    }

    fn set_action_handler(&self, handler: Arc<dyn CallActionHandler>) {
        *self.handler.lock() = Some(handler);
    }
}
