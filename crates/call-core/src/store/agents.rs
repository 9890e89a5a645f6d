use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{read_json, write_json, KeyValueStore, AGENTS_KEY};
use crate::agent::{Agent, AgentId, AgentParams, NotificationId};
use crate::error::{CallError, CallResult};

/// Persisted, ordered list of agents.
///
/// Every mutation is a load-modify-save of the whole list. Mutations issued
/// through one `AgentStore` or its clones are applied in call order. Build a
/// single store per backend and clone it; separately constructed stores do
/// not share the write lock.
#[derive(Clone)]
pub struct AgentStore {
    backend: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl AgentStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load all agents; an absent key yields an empty list
    pub async fn load(&self) -> CallResult<Vec<Agent>> {
        let mut agents: Vec<Agent> = read_json(self.backend.as_ref(), AGENTS_KEY)
            .await?
            .unwrap_or_default();
        for agent in agents.iter_mut() {
            if agent.params.normalize() {
                tracing::warn!(agent_id = %agent.id, "dropped half-set schedule on stored agent");
            }
        }
        Ok(agents)
    }

    /// Replace the stored list
    pub async fn save(&self, agents: &[Agent]) -> CallResult<()> {
        write_json(self.backend.as_ref(), AGENTS_KEY, agents).await
    }

    pub async fn get(&self, id: &AgentId) -> CallResult<Option<Agent>> {
        Ok(self.load().await?.into_iter().find(|a| &a.id == id))
    }

    /// Append a new agent and return it
    pub async fn create(&self, params: AgentParams) -> CallResult<Agent> {
        let _guard = self.write_lock.lock().await;
        let mut agents = self.load().await?;
        let agent = Agent::new(params);
        agents.push(agent.clone());
        self.save(&agents).await?;
        tracing::info!(agent_id = %agent.id, name = %agent.params.name, "created agent");
        Ok(agent)
    }

    /// Delete an agent; returns whether it existed
    pub async fn delete(&self, id: &AgentId) -> CallResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut agents = self.load().await?;
        let before = agents.len();
        agents.retain(|a| &a.id != id);
        if agents.len() == before {
            return Ok(false);
        }
        self.save(&agents).await?;
        tracing::info!(agent_id = %id, "deleted agent");
        Ok(true)
    }

    /// Remove every agent
    pub async fn reset(&self) -> CallResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save(&[]).await
    }

    pub async fn rename(&self, id: &AgentId, name: impl Into<String>) -> CallResult<Agent> {
        let name = name.into();
        self.update(id, move |params| params.name = name).await
    }

    pub async fn set_prompt(&self, id: &AgentId, prompt: impl Into<String>) -> CallResult<Agent> {
        let prompt = prompt.into();
        self.update(id, move |params| params.prompt = prompt).await
    }

    /// Record a scheduled call; both fields are written in one save
    pub async fn mark_scheduled(
        &self,
        id: &AgentId,
        notification_id: NotificationId,
        at: DateTime<Utc>,
    ) -> CallResult<Agent> {
        self.update(id, move |params| params.schedule(notification_id, at)).await
    }

    /// Clear the scheduled call, returning the notification id that was set
    pub async fn clear_schedule(&self, id: &AgentId) -> CallResult<Option<NotificationId>> {
        let _guard = self.write_lock.lock().await;
        let mut agents = self.load().await?;
        let agent = agents
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| CallError::AgentNotFound { agent_id: id.to_string() })?;

        let previous = agent.params.notification_id().cloned();
        if previous.is_none() {
            return Ok(None);
        }
        agent.params.clear_schedule();
        self.save(&agents).await?;
        Ok(previous)
    }

    async fn update<F>(&self, id: &AgentId, apply: F) -> CallResult<Agent>
    where
        F: FnOnce(&mut AgentParams),
    {
        let _guard = self.write_lock.lock().await;
        let mut agents = self.load().await?;
        let agent = agents
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| CallError::AgentNotFound { agent_id: id.to_string() })?;
        apply(&mut agent.params);
        let updated = agent.clone();
        self.save(&agents).await?;
        Ok(updated)
    }
}
