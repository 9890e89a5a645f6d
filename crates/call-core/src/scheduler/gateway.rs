//! Incoming-call notification gateway
//!
//! The platform notification service is reached through [`IncomingCallGateway`],
//! injected where it is needed instead of registered globally. Actions the user
//! takes on a delivered alert come back as structured [`NotificationEvent`]s;
//! the string identifiers the platform needs are rendered from them, never
//! parsed.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{AgentId, NotificationId};
use crate::config::NotificationChannel;
use crate::error::CallResult;

/// Title shown on the answer action
pub const ANSWER_ACTION_TITLE: &str = "📞 応答";
/// Title shown on the decline action
pub const DECLINE_ACTION_TITLE: &str = "❌ 拒否";
/// Body text of an incoming-call alert
pub const INCOMING_CALL_BODY: &str = "着信通知です - タップして応答";
/// Notification category of incoming-call alerts
pub const CALL_CATEGORY: &str = "call";

/// What the user chose on an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallActionKind {
    Answer,
    Decline,
}

impl CallActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallActionKind::Answer => "answer",
            CallActionKind::Decline => "decline",
        }
    }
}

/// An action button scoped to one agent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallAction {
    pub kind: CallActionKind,
    pub agent_id: AgentId,
}

impl CallAction {
    pub fn answer(agent_id: AgentId) -> Self {
        Self { kind: CallActionKind::Answer, agent_id }
    }

    pub fn decline(agent_id: AgentId) -> Self {
        Self { kind: CallActionKind::Decline, agent_id }
    }

    /// Platform action identifier, e.g. `answer_<agentId>`
    pub fn identifier(&self) -> String {
        format!("{}_{}", self.kind.as_str(), self.agent_id)
    }
}

impl fmt::Display for CallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

/// Full-screen presentation of an incoming call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FullScreenIntent {
    pub agent_id: AgentId,
}

impl FullScreenIntent {
    pub fn new(agent_id: AgentId) -> Self {
        Self { agent_id }
    }

    /// Platform presentation identifier, `incoming-call-notification_<agentId>`
    pub fn identifier(&self) -> String {
        format!("incoming-call-notification_{}", self.agent_id)
    }
}

/// A button on the alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub title: String,
    pub action: CallAction,
    /// Bring the app to the foreground when pressed
    pub launches_app: bool,
}

/// Everything the platform needs to post one incoming-call alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub trigger_at: DateTime<Utc>,
    pub channel: NotificationChannel,
    pub category: String,
    pub actions: Vec<NotificationAction>,
    pub full_screen: FullScreenIntent,
}

impl NotificationRequest {
    /// Alert for a call from `agent_name` at `trigger_at`
    pub fn incoming_call(
        agent_name: &str,
        agent_id: &AgentId,
        trigger_at: DateTime<Utc>,
        channel: NotificationChannel,
    ) -> Self {
        Self {
            title: format!("📞 {}", agent_name),
            body: INCOMING_CALL_BODY.to_string(),
            trigger_at,
            channel,
            category: CALL_CATEGORY.to_string(),
            actions: vec![
                NotificationAction {
                    title: ANSWER_ACTION_TITLE.to_string(),
                    action: CallAction::answer(agent_id.clone()),
                    launches_app: true,
                },
                NotificationAction {
                    title: DECLINE_ACTION_TITLE.to_string(),
                    action: CallAction::decline(agent_id.clone()),
                    launches_app: false,
                },
            ],
            full_screen: FullScreenIntent::new(agent_id.clone()),
        }
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.full_screen.agent_id
    }
}

/// Result of a permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Something happened on a delivered alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// An action button was pressed
    ActionPressed(CallAction),
    /// The alert was shown full screen, or its body was tapped
    FullScreenShown(FullScreenIntent),
}

impl NotificationEvent {
    pub fn agent_id(&self) -> &AgentId {
        match self {
            NotificationEvent::ActionPressed(action) => &action.agent_id,
            NotificationEvent::FullScreenShown(intent) => &intent.agent_id,
        }
    }
}

/// Where an event is being handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Live UI is available
    Foreground,
    /// No UI; only durable storage may be touched
    Background,
}

/// Receives alert events from the gateway
#[async_trait]
pub trait CallActionHandler: Send + Sync {
    /// Handle one event. Must not fail: there may be nobody to report to.
    async fn on_event(&self, event: NotificationEvent, context: ExecutionContext);
}

/// Platform notification service
#[async_trait]
pub trait IncomingCallGateway: Send + Sync {
    /// Prompt for notification permission; asking again after a grant is harmless
    async fn request_permission(&self) -> CallResult<PermissionStatus>;

    /// Register a time-triggered alert
    async fn schedule(&self, request: NotificationRequest) -> CallResult<NotificationId>;

    /// Cancel the pending trigger and any displayed alert; unknown ids are a no-op
    async fn cancel(&self, notification_id: &NotificationId) -> CallResult<()>;

    /// Route alert events to `handler`, replacing any previous handler
    fn set_action_handler(&self, handler: Arc<dyn CallActionHandler>);
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
