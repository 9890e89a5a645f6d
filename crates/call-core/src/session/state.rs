use serde::{Deserialize, Serialize};

use crate::error::CallError;

/// Connection status of a realtime call session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Created, negotiation not started
    Idle,
    /// Bootstrap and SDP exchange in flight
    Connecting,
    /// Remote description applied or data channel open
    Connected,
    /// Negotiation failed; resources already released
    Error,
    /// Explicitly closed
    Closed,
}

impl ConnectionStatus {
    /// Check if the session can accept microphone/speaker toggles
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Check if the session reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Error | ConnectionStatus::Closed)
    }
}

/// Read-only view of a session for the call screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    /// The remote confirmed session creation
    pub session_active: bool,
    pub microphone_enabled: bool,
    pub speaker_on: bool,
}

impl SessionSnapshot {
    /// Connected and confirmed by the remote
    pub fn is_active(&self) -> bool {
        self.status.is_connected() && self.session_active
    }

    /// Label shown on the call screen
    pub fn status_text(&self) -> &'static str {
        match self.status {
            ConnectionStatus::Connecting => "接続中...",
            ConnectionStatus::Connected if self.session_active => "AIと通話中",
            ConnectionStatus::Connected => "接続済み",
            ConnectionStatus::Error => "接続エラー",
            ConnectionStatus::Idle | ConnectionStatus::Closed => "未接続",
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Idle,
            session_active: false,
            microphone_enabled: false,
            speaker_on: true,
        }
    }
}

/// Events published by a realtime call session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged {
        previous: ConnectionStatus,
        current: ConnectionStatus,
    },
    /// Remote sent `session.created`
    SessionActive,
    MicrophoneToggled { enabled: bool },
    SpeakerToggled { speaker_on: bool },
    /// Non-fatal problem, the call continues degraded
    Warning(CallError),
    /// Fatal setup error, the call attempt is over
    Failed(CallError),
    Closed,
}

impl SessionEvent {
    /// Title and message of the alert the UI should present, if any
    pub fn user_alert(&self) -> Option<(&'static str, &'static str)> {
        match self {
            SessionEvent::Failed(_) => Some(("接続エラー", "通話の開始に失敗しました")),
            SessionEvent::Warning(CallError::MicrophoneUnavailable { .. }) => {
                Some(("エラー", "マイクへのアクセスが許可されていません"))
            }
            _ => None,
        }
    }
}

/// A control event received on the data channel
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControlEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl ControlEvent {
    pub const SESSION_CREATED: &'static str = "session.created";

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn is_session_created(&self) -> bool {
        self.event_type == Self::SESSION_CREATED
    }
}
