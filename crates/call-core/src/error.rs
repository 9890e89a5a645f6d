//! Error types and handling for the call-core library
//!
//! This module defines every error that can surface from agent storage,
//! incoming-call scheduling and realtime call sessions.
//!
//! # Error Categories
//!
//! - **Permission Errors** - Notification permission refused, needs a system settings change
//! - **Bootstrap Errors** - The session proxy could not be reached or rejected the request
//! - **Negotiation Errors** - The realtime voice endpoint rejected the SDP offer
//! - **Media Errors** - Microphone unavailable, the call continues without local audio
//! - **Storage Errors** - Persisted read/write failed, callers keep their in-memory value
//! - **State Errors** - Operation not valid for the current session state
//!
//! None of these errors is retried automatically. A failed call attempt is
//! surfaced to the user, who closes the call screen and enters it again.
//!
//! # Basic Pattern
//!
//! ```rust,no_run
//! # use meetai_call_core::{CallError, RealtimeCallSession};
//! # async fn example(session: RealtimeCallSession) {
//! match session.connect().await {
//!     Ok(()) => println!("connected"),
//!     Err(e) if e.is_fatal() => {
//!         eprintln!("call failed ({}): {}", e.category(), e);
//!         session.close().await;
//!     }
//!     Err(e) => eprintln!("call degraded: {}", e),
//! }
//! # }
//! ```

use thiserror::Error;

/// Result type alias for call-core operations
pub type CallResult<T> = Result<T, CallError>;

/// Errors raised by call-core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Notification permission refused by the user
    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },

    /// Session bootstrap (ephemeral credential request) failed
    #[error("Session bootstrap failed: {reason}")]
    BootstrapFailure { reason: String },

    /// SDP offer/answer exchange with the realtime endpoint failed
    #[error("Negotiation failed: {reason}")]
    NegotiationFailure { reason: String },

    /// Local microphone could not be acquired
    #[error("Microphone unavailable: {reason}")]
    MicrophoneUnavailable { reason: String },

    /// Persisted key could not be read or written
    #[error("Storage failure on '{key}': {reason}")]
    StorageFailure { key: String, reason: String },

    /// Requested schedule rejected by caller-level validation
    #[error("Invalid schedule: {reason}")]
    InvalidSchedule { reason: String },

    #[error("Agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },

    #[error("Invalid session state: expected {expected}, got {actual}")]
    InvalidSessionState { expected: String, actual: String },

    #[error("Session closed")]
    SessionClosed,

    #[error("Negotiation already started for this session")]
    AlreadyNegotiating,

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Notification platform refused to schedule or cancel
    #[error("Notification failure: {reason}")]
    NotificationFailure { reason: String },
}

impl CallError {
    /// Create a permission denied error
    pub fn permission_denied(operation: impl Into<String>) -> Self {
        Self::PermissionDenied { operation: operation.into() }
    }

    /// Create a bootstrap failure error
    pub fn bootstrap_failure(reason: impl Into<String>) -> Self {
        Self::BootstrapFailure { reason: reason.into() }
    }

    /// Create a negotiation failure error
    pub fn negotiation_failure(reason: impl Into<String>) -> Self {
        Self::NegotiationFailure { reason: reason.into() }
    }

    /// Create a microphone unavailable error
    pub fn microphone_unavailable(reason: impl Into<String>) -> Self {
        Self::MicrophoneUnavailable { reason: reason.into() }
    }

    /// Create a storage failure error for a persisted key
    pub fn storage_failure(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StorageFailure { key: key.into(), reason: reason.into() }
    }

    /// Create an invalid schedule error
    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        Self::InvalidSchedule { reason: reason.into() }
    }

    /// Create a notification failure error
    pub fn notification_failure(reason: impl Into<String>) -> Self {
        Self::NotificationFailure { reason: reason.into() }
    }

    /// Whether this error ends the current call attempt
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CallError::BootstrapFailure { .. } | CallError::NegotiationFailure { .. }
        )
    }

    /// Whether the core may retry on its own. It never does.
    pub fn is_recoverable(&self) -> bool {
        false
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CallError::PermissionDenied { .. } => "permission",
            CallError::BootstrapFailure { .. } => "bootstrap",
            CallError::NegotiationFailure { .. } => "negotiation",
            CallError::MicrophoneUnavailable { .. } => "media",
            CallError::StorageFailure { .. } => "storage",
            CallError::InvalidSchedule { .. } | CallError::AgentNotFound { .. } => "schedule",

            CallError::InvalidSessionState { .. } |
            CallError::SessionClosed |
            CallError::AlreadyNegotiating => "session",

            CallError::InvalidConfiguration { .. } => "configuration",
            CallError::NotificationFailure { .. } => "notification",
        }
    }
}
