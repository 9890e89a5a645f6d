//! `meetai settings ...`

use clap::{Subcommand, ValueEnum};
use colored::Colorize;

use meetai_call_core::{ServerMode, ServerSettings};

use super::Context;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Proxy on the local network
    Local,
    /// Hosted proxy
    Remote,
}

impl From<ModeArg> for ServerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => ServerMode::Local,
            ModeArg::Remote => ServerMode::Remote,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the stored server preference
    Show,
    /// Change the server preference
    Set {
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Base URL of the local proxy
        #[arg(long)]
        url: Option<String>,
    },
}

pub async fn execute(command: SettingsCommand, ctx: &Context) -> anyhow::Result<()> {
    match command {
        SettingsCommand::Show => {
            let settings = ctx.settings.load().await?;
            print_settings(&settings);
        }
        SettingsCommand::Set { mode, url } => {
            let mut settings = ctx.settings.load().await?;
            if let Some(mode) = mode {
                settings.mode = mode.into();
            }
            if let Some(url) = url {
                let url = url.trim().to_string();
                if url.is_empty() {
                    anyhow::bail!("local URL cannot be empty");
                }
                settings.local_url = url;
            }
            ctx.settings.save(&settings).await?;
            println!("{}", "Settings saved".green());
            print_settings(&settings);
        }
    }
    Ok(())
}

fn print_settings(settings: &ServerSettings) {
    println!("{}  {}", "Mode:".bold(), settings.mode.as_str());
    println!("{}  {}", "Local URL:".bold(), settings.local_url);
    println!("{}  {}", "Active server:".bold(), settings.effective_base_url().cyan());
}
