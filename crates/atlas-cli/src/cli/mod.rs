//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(version)]
#[command(about = "Terminal client for the atlas places API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Store a refresh token and bootstrap the session
    Login {
        /// Long-lived refresh token issued by the API
        #[arg(long, value_name = "TOKEN")]
        refresh_token: String,
    },
    /// Authenticated GET against the API, through the response cache
    Fetch {
        /// Endpoint path, e.g. /places/recommended
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "query", value_name = "K=V")]
        query: Vec<String>,

        /// Cache TTL in seconds (0 bypasses the cache)
        #[arg(long, default_value_t = 60)]
        ttl: u64,
    },
    /// Drop the stored session
    Logout,
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        match cli.command {
            Commands::Login { refresh_token } => commands::auth::login(&refresh_token),
            Commands::Fetch { path, query, ttl } => commands::fetch::run(&path, &query, ttl).await,
            Commands::Logout => commands::auth::logout(),
        }
    })
}

/// Stderr logging filtered by ATLAS_LOG (falling back to RUST_LOG, then
/// warn).
fn init_logging() {
    let filter = EnvFilter::try_from_env("ATLAS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
