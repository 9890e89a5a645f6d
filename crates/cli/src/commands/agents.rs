//! `meetai agents ...`

use chrono::{Local, Utc};
use clap::Subcommand;
use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use meetai_call_core::{Agent, AgentId, AgentParams};

use super::Context;

#[derive(Debug, Subcommand)]
pub enum AgentsCommand {
    /// List agents in display order
    List,
    /// Create an agent
    Create {
        /// Display name, defaults to the standard persona name
        #[arg(long)]
        name: Option<String>,
        /// Conversation prompt, defaults to the standard prompt
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Show one agent in full
    Show { id: String },
    /// Change an agent's name
    Rename { id: String, name: String },
    /// Replace an agent's prompt
    Prompt { id: String, prompt: String },
    /// Delete one agent
    Delete { id: String },
    /// Delete every agent
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Tabled)]
struct AgentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Next call")]
    next_call: String,
    #[tabled(rename = "Prompt")]
    prompt: String,
}

impl AgentRow {
    fn from_agent(agent: &Agent) -> Self {
        Self {
            id: agent.id.to_string(),
            name: agent.params.name.clone(),
            next_call: describe_schedule(agent),
            prompt: truncate(&agent.params.prompt, 40),
        }
    }
}

fn describe_schedule(agent: &Agent) -> String {
    match agent.params.scheduled_call() {
        Some((_, at)) if at > Utc::now() => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        Some(_) => "expired".to_string(),
        None => "-".to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}…", head)
}

pub async fn execute(command: AgentsCommand, ctx: &Context) -> anyhow::Result<()> {
    match command {
        AgentsCommand::List => {
            let agents = ctx.agents.load().await?;
            if agents.is_empty() {
                println!("No agents yet. Create one with `meetai agents create`.");
                return Ok(());
            }
            let rows: Vec<AgentRow> = agents.iter().map(AgentRow::from_agent).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        AgentsCommand::Create { name, prompt } => {
            let defaults = &ctx.config.default_agent;
            let params = AgentParams::new(
                name.unwrap_or_else(|| defaults.name.clone()),
                prompt.unwrap_or_else(|| defaults.prompt.clone()),
            );
            let agent = ctx.agents.create(params).await?;
            println!("{} {} ({})", "Created".green().bold(), agent.params.name, agent.id);
        }
        AgentsCommand::Show { id } => {
            let agent = ctx.require_agent(&id).await?;
            println!("{}  {}", "ID:".bold(), agent.id);
            println!("{}  {}", "Name:".bold(), agent.params.name);
            println!("{}  {}", "Next call:".bold(), describe_schedule(&agent));
            if let Some(notification_id) = agent.params.notification_id() {
                println!("{}  {}", "Notification:".bold(), notification_id);
            }
            println!("{}\n{}", "Prompt:".bold(), agent.params.prompt);
        }
        AgentsCommand::Rename { id, name } => {
            let agent = ctx.agents.rename(&AgentId::from(id), name).await?;
            println!("{} {}", "Renamed to".green(), agent.params.name);
        }
        AgentsCommand::Prompt { id, prompt } => {
            ctx.agents.set_prompt(&AgentId::from(id), prompt).await?;
            println!("{}", "Prompt updated".green());
        }
        AgentsCommand::Delete { id } => {
            if ctx.agents.delete(&AgentId::from(id.as_str())).await? {
                println!("{} {}", "Deleted".yellow(), id);
            } else {
                anyhow::bail!("no agent with id '{}'", id);
            }
        }
        AgentsCommand::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete every agent without --yes");
            }
            ctx.agents.reset().await?;
            println!("{}", "All agents deleted".yellow());
        }
    }
    Ok(())
}
