//! Agent records
//!
//! An agent is a named AI persona with a conversation prompt. Agents are
//! persisted as an ordered JSON list (see [`crate::store::AgentStore`]).
//!
//! The two scheduling fields travel together: after any completed operation
//! an agent either has both `notification_id` and `scheduled_time`, or
//! neither. The only way to set or clear them is through [`AgentParams::schedule`]
//! and [`AgentParams::clear_schedule`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default persona name used for newly created agents
pub const DEFAULT_AGENT_NAME: &str = "AIエージェント";

/// Default prompt used for newly created agents
pub const DEFAULT_AGENT_PROMPT: &str = "あなたはAIエージェントです。ユーザーの質問に答え、会話を続けてください。日本語で話してください。この文章を読んだら、「インストラクションを参照しました」と答えてください。";

/// Opaque unique agent identifier, generated once at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier the notification platform returns for a scheduled alert
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Editable agent parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentParams {
    pub name: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification_id: Option<NotificationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scheduled_time: Option<DateTime<Utc>>,
}

impl AgentParams {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            notification_id: None,
            scheduled_time: None,
        }
    }

    pub fn notification_id(&self) -> Option<&NotificationId> {
        self.notification_id.as_ref()
    }

    pub fn scheduled_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_time
    }

    /// The pending call, if one is scheduled
    pub fn scheduled_call(&self) -> Option<(&NotificationId, DateTime<Utc>)> {
        match (&self.notification_id, self.scheduled_time) {
            (Some(id), Some(at)) => Some((id, at)),
            _ => None,
        }
    }

    /// Whether a scheduled call is still in the future at `now`
    pub fn has_upcoming_call(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_call().map_or(false, |(_, at)| at > now)
    }

    pub fn schedule(&mut self, notification_id: NotificationId, at: DateTime<Utc>) {
        self.notification_id = Some(notification_id);
        self.scheduled_time = Some(at);
    }

    pub fn clear_schedule(&mut self) {
        self.notification_id = None;
        self.scheduled_time = None;
    }

    /// Repair a record persisted with only one of the two scheduling fields
    pub(crate) fn normalize(&mut self) -> bool {
        if self.notification_id.is_some() != self.scheduled_time.is_some() {
            self.clear_schedule();
            return true;
        }
        false
    }
}

impl Default for AgentParams {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_NAME, DEFAULT_AGENT_PROMPT)
    }
}

/// A persisted agent record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub params: AgentParams,
}

impl Agent {
    /// Create an agent with a freshly generated id
    pub fn new(params: AgentParams) -> Self {
        Self { id: AgentId::generate(), params }
    }
}
