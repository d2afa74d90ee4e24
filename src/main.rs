use anyhow::Context;
use clap::Parser;

mod api;
mod app;
mod auth;
mod config;
mod documents;
mod error;
mod navigation;
mod profile;
mod render;
mod session;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use crate::app::Command;
use crate::config::AppConfig;
use crate::state::AppState;

/// Contract review from the terminal.
#[derive(Debug, Parser)]
#[command(name = "contractcheck", version)]
struct Cli {
    /// API base URL, e.g. http://127.0.0.1:8000/api
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Probe the backend before running the command
    #[arg(long, global = true)]
    check_health: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "contractcheck=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("loading configuration")?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_url(url)?;
    }
    tracing::debug!(api_url = %config.api_url, session = %config.session_file.display(), "config loaded");

    let state = AppState::init(config).context("initialising client")?;

    if cli.check_health {
        if let Err(e) = api::health(&state.api).await {
            tracing::warn!(error = %e, "backend health check failed");
        }
    }

    app::run(&state, cli.command).await
}
