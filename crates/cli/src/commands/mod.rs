pub mod agents;
pub mod calls;
pub mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use meetai_call_core::{
    AgentId, AgentStore, CallSignalStore, ClientConfig, JsonFileStore, KeyValueStore, SettingsStore,
};

/// Stores opened over one data directory
pub struct Context {
    pub backend: Arc<dyn KeyValueStore>,
    pub agents: AgentStore,
    pub settings: SettingsStore,
    pub signals: CallSignalStore,
    pub config: ClientConfig,
}

impl Context {
    pub fn open(data_dir: &Path) -> Self {
        let backend: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(data_dir));
        Self {
            agents: AgentStore::new(backend.clone()),
            settings: SettingsStore::new(backend.clone()),
            signals: CallSignalStore::new(backend.clone()),
            config: ClientConfig::new(),
            backend,
        }
    }

    /// `<platform data dir>/meet-with-ai`
    pub fn default_data_dir() -> anyhow::Result<PathBuf> {
        let base = dirs::data_dir().context("no data directory on this platform, pass --data-dir")?;
        Ok(base.join("meet-with-ai"))
    }

    /// Resolve an agent by id, failing with a readable message
    pub async fn require_agent(&self, id: &str) -> anyhow::Result<meetai_call_core::Agent> {
        self.agents
            .get(&AgentId::from(id))
            .await?
            .with_context(|| format!("no agent with id '{}'", id))
    }
}
