use std::net::SocketAddr;

use clap::Parser;

/// Upstream endpoint minting realtime sessions
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/realtime/sessions";

/// Model requested for every session
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview-2025-06-03";

/// Voice requested for every session
pub const DEFAULT_VOICE: &str = "verse";

/// Session proxy configuration, from flags or the environment
#[derive(Debug, Clone, Parser)]
#[command(name = "meetai-proxy", version, about = "Meet with AI session proxy")]
pub struct ProxyConfig {
    /// API key of the voice provider; requests fail with 500 when absent
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Upstream sessions endpoint
    #[arg(long, env = "MEETAI_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    /// Realtime model id
    #[arg(long, env = "MEETAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Voice of the agent
    #[arg(long, env = "MEETAI_VOICE", default_value = DEFAULT_VOICE)]
    pub voice: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

impl ProxyConfig {
    /// Configuration with defaults and the given key
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            bind_addr: "0.0.0.0".to_string(),
            port: 3001,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }

    /// Socket address to listen on
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.bind_addr, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address '{}': {}", addr, e))
    }

    /// The configured key, ignoring an empty value
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}
