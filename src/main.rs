//! BI Portal server
//!
//! Serves the portal pages and JSON API on top of a hosted Supabase project.

use anyhow::Context;
use biportal::{
    config::{generate_default_config, Config},
    logging::init_tracing,
    serve, AppState, Backend, SessionStore, SupabaseClient,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "biportal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Power BI dashboard portal with role-based visibility")]
struct Args {
    /// Config file (default: platform config dir, /etc/biportal, ./config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print a commented default config file
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::InitConfig => {
            print!("{}", generate_default_config());
            Ok(())
        }
        Command::Serve { port } => {
            let path = args.config.or_else(Config::find_default);
            let mut config = Config::load_or_env(path.as_deref()).with_context(|| match &path {
                Some(path) => format!("Loading {}", path.display()),
                None => "Loading config from the environment".to_string(),
            })?;
            if let Some(port) = port {
                config.server.port = port;
            }
            run(config, path.as_deref()).await
        }
    }
}

async fn run(config: Config, source: Option<&Path>) -> anyhow::Result<()> {
    init_tracing(&config.logging);

    tracing::info!("BI Portal v{}", env!("CARGO_PKG_VERSION"));
    match source {
        Some(path) => tracing::info!("Loaded config from {}", path.display()),
        None => tracing::info!("Using default config with environment overrides"),
    }
    config.validate()?;

    tracing::info!(backend = %config.backend.url, "Using hosted backend");

    let backend = Arc::new(
        SupabaseClient::new(config.backend.clone()).context("Creating backend client")?,
    );

    // The server still starts; readiness reports the outage
    if let Err(e) = backend.health_check().await {
        tracing::warn!(error = %e, "Backend is not reachable yet");
    }

    let sessions = Arc::new(SessionStore::new(chrono::Duration::minutes(
        config.session.ttl_minutes,
    )));
    let purge_handle = Arc::clone(&sessions).start_background_purge(
        std::time::Duration::from_secs(config.session.purge_interval_secs),
    );

    let state = AppState::new(backend, sessions, config.server.clone());
    let result = serve(state, &config.server).await;

    purge_handle.abort();
    result?;

    tracing::info!("BI Portal shutdown complete");
    Ok(())
}
