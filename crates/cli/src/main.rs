//! Meet with AI command-line tool
//!
//! Manages the agent list and server preference stored in the app's data
//! directory, checks the session proxy, and simulates scheduled incoming
//! calls end to end: `schedule`, `notify` (as the platform would deliver the
//! alert) and `resume` (as the app would on its next activation).

mod commands;
mod gateway;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::Level;

use commands::agents::AgentsCommand;
use commands::calls::EventArg;
use commands::settings::SettingsCommand;
use commands::Context;
use meetai_call_core::{setup_logging, LoggingConfig};

#[derive(Debug, Parser)]
#[command(name = "meetai", version, about = "Manage Meet with AI agents and calls")]
struct Cli {
    /// Data directory shared with the app
    #[arg(long, env = "MEETAI_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage agents
    #[command(subcommand)]
    Agents(AgentsCommand),
    /// Manage the session proxy preference
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Check that the session proxy answers
    Ping,
    /// Request realtime credentials for an agent
    Session { agent_id: String },
    /// Schedule an incoming call from an agent
    Schedule {
        agent_id: String,
        /// Minutes from now
        #[arg(long, conflicts_with = "at")]
        in_minutes: Option<i64>,
        /// Exact time (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Cancel an agent's scheduled call
    Cancel { agent_id: String },
    /// List alerts waiting to fire
    Pending,
    /// Simulate an interaction with a delivered alert
    Notify {
        agent_id: String,
        #[arg(value_enum)]
        event: EventArg,
        /// Handle as if the app were in the foreground
        #[arg(long)]
        foreground: bool,
    },
    /// Replay the call signal left by a background alert
    Resume,
}

impl Cli {
    async fn execute(self) -> anyhow::Result<()> {
        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => Context::default_data_dir()?,
        };
        tracing::debug!(data_dir = %data_dir.display(), "opening stores");
        let ctx = Context::open(&data_dir);

        match self.command {
            Command::Agents(command) => commands::agents::execute(command, &ctx).await,
            Command::Settings(command) => commands::settings::execute(command, &ctx).await,
            Command::Ping => commands::calls::ping(&ctx).await,
            Command::Session { agent_id } => commands::calls::session(&ctx, &agent_id).await,
            Command::Schedule {
                agent_id,
                in_minutes,
                at,
            } => commands::calls::schedule(&ctx, &agent_id, in_minutes, at).await,
            Command::Cancel { agent_id } => commands::calls::cancel(&ctx, &agent_id).await,
            Command::Pending => commands::calls::pending(&ctx).await,
            Command::Notify {
                agent_id,
                event,
                foreground,
            } => commands::calls::notify(&ctx, &agent_id, event, foreground).await,
            Command::Resume => commands::calls::resume(&ctx).await,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    if let Err(e) = setup_logging(LoggingConfig::new(level, "meetai")) {
        eprintln!("failed to set up logging: {}", e);
    }

    if let Err(e) = cli.execute().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
