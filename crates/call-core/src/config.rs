use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::AgentParams;

/// Hosted session proxy
pub const REMOTE_SERVER_URL: &str = "https://meet-with-ai-server.vercel.app";

/// Default address of a proxy running on the local network
pub const DEFAULT_LOCAL_URL: &str = "http://192.168.11.6:3001";

/// Realtime voice endpoint accepting SDP offers
pub const DEFAULT_REALTIME_URL: &str = "https://api.openai.com/v1/realtime";

/// Realtime model requested from the voice endpoint
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2025-06-03";

/// Label of the control-event data channel
pub const DEFAULT_DATA_CHANNEL_LABEL: &str = "oai-events";

/// Which proxy the app talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServerMode {
    #[default]
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "vercel", alias = "remote")]
    Remote,
}

impl ServerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerMode::Local => "local",
            ServerMode::Remote => "vercel",
        }
    }
}

/// Server location preference, edited only through the settings screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub mode: ServerMode,
    pub local_url: String,
}

impl ServerSettings {
    pub fn new(mode: ServerMode, local_url: impl Into<String>) -> Self {
        Self { mode, local_url: local_url.into() }
    }

    /// Base URL of the session proxy for the current preference
    pub fn effective_base_url(&self) -> &str {
        match self.mode {
            ServerMode::Remote => REMOTE_SERVER_URL,
            ServerMode::Local => &self.local_url,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::new(ServerMode::Local, DEFAULT_LOCAL_URL)
    }
}

/// Priority of the incoming-call notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    Default,
    High,
}

/// Notification channel used for simulated incoming calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: Importance,
    pub sound: String,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self {
            id: "incoming-call".to_string(),
            name: "Incoming Call".to_string(),
            importance: Importance::High,
            sound: "default".to_string(),
        }
    }
}

/// Configuration for the call client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Realtime voice endpoint receiving the SDP offer
    pub realtime_url: String,
    /// Model id passed as the `model` query parameter
    pub model: String,
    /// Timeout applied to every HTTP request
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Label of the control-event data channel
    pub data_channel_label: String,
    /// Parameters given to newly created agents
    pub default_agent: AgentParams,
    /// Channel the incoming-call notification is posted on
    pub notification_channel: NotificationChannel,
}

impl ClientConfig {
    /// Create a new client configuration with defaults
    pub fn new() -> Self {
        Self {
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            request_timeout: Duration::from_secs(30),
            data_channel_label: DEFAULT_DATA_CHANNEL_LABEL.to_string(),
            default_agent: AgentParams::default(),
            notification_channel: NotificationChannel::default(),
        }
    }

    /// Set realtime endpoint URL
    pub fn with_realtime_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_url = url.into();
        self
    }

    /// Set realtime model id
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set HTTP request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the parameters for newly created agents
    pub fn with_default_agent(mut self, params: AgentParams) -> Self {
        self.default_agent = params;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
