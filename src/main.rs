//! Jukebox daemon - main entry point
//!
//! Collaborative jukebox backend: a shared playback queue and playback state
//! mutated over HTTP by authenticated actors, with full-state snapshots
//! pushed to every connected client over SSE after each change.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebox::api;
use jukebox::config::{Config, ConfigOverrides};
use jukebox::coordinator::Coordinator;
use jukebox::db;

/// Command-line arguments for jukeboxd
#[derive(Parser, Debug)]
#[command(name = "jukeboxd")]
#[command(about = "Shared jukebox backend service")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "JUKEBOX_PORT")]
    port: Option<u16>,

    /// SQLite database path (overrides config file)
    #[arg(short, long, env = "JUKEBOX_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = Config::load(
        args.config.as_deref(),
        ConfigOverrides {
            database_path: args.database,
            port: args.port,
        },
    )
    .await
    .context("Failed to load configuration")?;

    info!("Starting jukebox backend on port {}", config.port);

    let db_pool = db::connect(&config.database_path)
        .await
        .context("Failed to open database")?;
    db::init::initialize_database(&db_pool, &config.auth)
        .await
        .context("Failed to initialize database")?;

    let coordinator = Arc::new(
        Coordinator::new(db_pool.clone(), config.rate_limit)
            .await
            .context("Failed to initialize coordinator")?,
    );

    let config = Arc::new(config);
    let ctx = api::AppContext {
        coordinator,
        db_pool,
        config: config.clone(),
    };

    api::run(&config, ctx).await.context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
