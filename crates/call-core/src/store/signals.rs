//! One-shot call signals crossing the background/foreground boundary
//!
//! A background notification handler cannot touch live UI. It leaves a signal
//! instead: a single-slot mailbox per signal type, overwritten on write and
//! cleared when the foreground resume path consumes it.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{KeyValueStore, DIRECT_START_KEY, SHOW_INCOMING_KEY};
use crate::agent::AgentId;
use crate::error::CallResult;

/// What the next foreground activation should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingCall {
    /// The user answered from the notification: open the call screen
    DirectStart(AgentId),
    /// The full-screen alert fired: show the incoming-call screen
    ShowIncoming(AgentId),
}

impl PendingCall {
    pub fn agent_id(&self) -> &AgentId {
        match self {
            PendingCall::DirectStart(id) | PendingCall::ShowIncoming(id) => id,
        }
    }

    /// Direct start wins over a stale incoming-call delivery
    fn resolve(direct_start: Option<AgentId>, show_incoming: Option<AgentId>) -> Option<Self> {
        match (direct_start, show_incoming) {
            (Some(id), _) => Some(PendingCall::DirectStart(id)),
            (None, Some(id)) => Some(PendingCall::ShowIncoming(id)),
            (None, None) => None,
        }
    }
}

/// Durable call-signal flags.
///
/// Clones share one consume lock. Build a single store per backend and clone
/// it; separately constructed stores over the same backend are not
/// serialized against each other.
#[derive(Clone)]
pub struct CallSignalStore {
    backend: Arc<dyn KeyValueStore>,
    consume_lock: Arc<Mutex<()>>,
}

impl CallSignalStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            consume_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Ask the next activation to show the incoming-call screen for `agent_id`
    pub async fn record_incoming(&self, agent_id: &AgentId) -> CallResult<()> {
        self.backend.set(SHOW_INCOMING_KEY, agent_id.to_string()).await?;
        tracing::debug!(agent_id = %agent_id, "recorded show-incoming signal");
        Ok(())
    }

    /// Ask the next activation to start the call for `agent_id` directly
    pub async fn record_direct_start(&self, agent_id: &AgentId) -> CallResult<()> {
        self.backend.set(DIRECT_START_KEY, agent_id.to_string()).await?;
        tracing::debug!(agent_id = %agent_id, "recorded direct-start signal");
        Ok(())
    }

    /// Read the pending signal without clearing it
    pub async fn peek(&self) -> CallResult<Option<PendingCall>> {
        let direct_start = self.read(DIRECT_START_KEY).await?;
        let show_incoming = self.read(SHOW_INCOMING_KEY).await?;
        Ok(PendingCall::resolve(direct_start, show_incoming))
    }

    /// Read and clear both signals.
    ///
    /// Consumers in this process are serialized, so each written signal is
    /// returned at most once.
    pub async fn consume(&self) -> CallResult<Option<PendingCall>> {
        let _guard = self.consume_lock.lock().await;
        let pending = self.peek().await?;
        self.clear().await?;
        if let Some(pending) = &pending {
            tracing::info!(?pending, "consumed call signal");
        }
        Ok(pending)
    }

    /// Drop both signals
    pub async fn clear(&self) -> CallResult<()> {
        self.backend.remove(DIRECT_START_KEY).await?;
        self.backend.remove(SHOW_INCOMING_KEY).await
    }

    async fn read(&self, key: &str) -> CallResult<Option<AgentId>> {
        Ok(self
            .backend
            .get(key)
            .await?
            .filter(|raw| !raw.is_empty())
            .map(AgentId::from))
    }
}
