//! Durable key-value storage
//!
//! Everything the app persists is a string value under a fixed key:
//!
//! ```text
//! agentsData               JSON list of agents (ordered)
//! serverType               JSON string, "local" | "vercel"
//! localUrl                 JSON string
//! shouldShowIncomingCall   agent id, raw string
//! shouldStartRealtimeCall  agent id, raw string
//! ```
//!
//! Saves are last-writer-wins. A read of a missing key is never an error:
//! each typed store substitutes its default.

pub mod agents;
pub mod backend;
pub mod settings;
pub mod signals;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CallError, CallResult};

pub use agents::AgentStore;
pub use backend::{JsonFileStore, MemoryStore};
pub use settings::SettingsStore;
pub use signals::{CallSignalStore, PendingCall};

/// Key holding the agent list
pub const AGENTS_KEY: &str = "agentsData";
/// Key holding the server mode
pub const SERVER_TYPE_KEY: &str = "serverType";
/// Key holding the local proxy URL
pub const LOCAL_URL_KEY: &str = "localUrl";
/// Key holding the agent id whose incoming-call screen should be shown
pub const SHOW_INCOMING_KEY: &str = "shouldShowIncomingCall";
/// Key holding the agent id whose call should start directly
pub const DIRECT_START_KEY: &str = "shouldStartRealtimeCall";

/// Persisted string storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a key; `None` when absent
    async fn get(&self, key: &str) -> CallResult<Option<String>>;

    /// Overwrite a key
    async fn set(&self, key: &str, value: String) -> CallResult<()>;

    /// Delete a key; deleting an absent key succeeds
    async fn remove(&self, key: &str) -> CallResult<()>;
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> CallResult<Option<T>> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CallError::storage_failure(key, format!("corrupt value: {}", e))),
        None => Ok(None),
    }
}

pub(crate) async fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> CallResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| CallError::storage_failure(key, e.to_string()))?;
    store.set(key, raw).await
}
