#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use anyhow::{Context, Result};
use clap::Parser;
use memory_agent::{agent, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Starter AI agent that remembers things about each user.
#[derive(Parser, Debug)]
#[command(name = "memory-agent")]
#[command(version)]
#[command(about = "Chat with an AI agent that has persistent per-user memory.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.memory-agent/config.toml, optional)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// User whose memory the agent reads and writes
    #[arg(long, short = 'u')]
    user: Option<String>,

    /// Send one message, print the reply and exit
    #[arg(long, short = 'm')]
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(user) = cli.user {
        config.agent.user_id = user;
    }
    config.validate()?;

    agent::run(config, cli.message).await
}
