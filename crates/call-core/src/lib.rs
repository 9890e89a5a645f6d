//! # Meet with AI call core
//!
//! Client-side coordination for voice calls with AI agents: the persisted
//! agent list, simulated incoming calls delivered as notifications, and the
//! realtime WebRTC call with the voice endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────┐      ┌───────────────────────┐
//! │ IncomingCallScheduler │─────▶│ IncomingCallGateway   │ (platform alerts)
//! └───────────────────────┘      └───────────┬───────────┘
//!                                            │ NotificationEvent
//! ┌───────────────────────┐      ┌───────────▼───────────┐
//! │ CallSignalStore       │◀─────│ CallActionDispatcher  │──▶ Navigator
//! └───────────────────────┘      └───────────────────────┘
//!
//! ┌───────────────────────┐      ┌───────────────────────┐
//! │ RealtimeCallSession   │─────▶│ SessionBootstrap      │──▶ session proxy
//! │                       │─────▶│ RealtimeEndpoint      │──▶ realtime voice API
//! │                       │─────▶│ PeerConnection, media │    (platform)
//! └───────────────────────┘      └───────────────────────┘
//! ```
//!
//! Every platform facility sits behind a trait so the whole flow runs
//! against fakes in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meetai_call_core::{
//!     AgentParams, AgentStore, ClientConfig, HttpBootstrapClient, JsonFileStore, SettingsStore,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(JsonFileStore::new("/tmp/meet-with-ai"));
//! let agents = AgentStore::new(backend.clone());
//! let agent = agents.create(AgentParams::new("Taro", "Talk about trains")).await?;
//!
//! let base_url = SettingsStore::new(backend).base_url().await?;
//! let proxy = HttpBootstrapClient::new(base_url, &ClientConfig::new())?;
//! println!("{} -> {}", agent.id, proxy.health_check().await?);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod session;
pub mod store;

pub use agent::{Agent, AgentId, AgentParams, NotificationId, DEFAULT_AGENT_NAME, DEFAULT_AGENT_PROMPT};
pub use bootstrap::{
    ClientSecret, ErrorBody, HealthResponse, HttpBootstrapClient, HttpRealtimeEndpoint, RealtimeEndpoint,
    RealtimeSessionInfo, SessionBootstrap, SessionRequest,
};
pub use config::{ClientConfig, Importance, NotificationChannel, ServerMode, ServerSettings};
pub use error::{CallError, CallResult};
pub use logging::{setup_logging, LoggingConfig};
pub use scheduler::{
    CallAction, CallActionDispatcher, CallActionHandler, CallActionKind, Clock, ExecutionContext,
    FullScreenIntent, IncomingCallGateway, IncomingCallScheduler, Navigator, NotificationEvent,
    NotificationRequest, PermissionStatus, Route, SystemClock,
};
pub use session::{
    CallSessionGuard, CallTarget, ConnectionStatus, RealtimeCallSession, SessionEvent, SessionServices,
    SessionSlot, SessionSnapshot,
};
pub use store::{
    AgentStore, CallSignalStore, JsonFileStore, KeyValueStore, MemoryStore, PendingCall, SettingsStore,
};

/// Version of the call core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
