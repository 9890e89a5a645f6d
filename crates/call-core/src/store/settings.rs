use std::sync::Arc;

use super::{read_json, write_json, KeyValueStore, LOCAL_URL_KEY, SERVER_TYPE_KEY};
use crate::config::{ServerMode, ServerSettings, DEFAULT_LOCAL_URL};
use crate::error::CallResult;

/// Server location preference, stored as two independent keys
#[derive(Clone)]
pub struct SettingsStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load the preference, substituting defaults for missing keys
    pub async fn load(&self) -> CallResult<ServerSettings> {
        let mode: ServerMode = read_json(self.backend.as_ref(), SERVER_TYPE_KEY)
            .await?
            .unwrap_or_default();
        let local_url: String = read_json(self.backend.as_ref(), LOCAL_URL_KEY)
            .await?
            .unwrap_or_else(|| DEFAULT_LOCAL_URL.to_string());
        Ok(ServerSettings { mode, local_url })
    }

    pub async fn save(&self, settings: &ServerSettings) -> CallResult<()> {
        write_json(self.backend.as_ref(), SERVER_TYPE_KEY, &settings.mode).await?;
        write_json(self.backend.as_ref(), LOCAL_URL_KEY, &settings.local_url).await?;
        tracing::info!(mode = settings.mode.as_str(), url = %settings.effective_base_url(), "saved server settings");
        Ok(())
    }

    /// Base URL for the stored preference
    pub async fn base_url(&self) -> CallResult<String> {
        Ok(self.load().await?.effective_base_url().to_string())
    }
}
