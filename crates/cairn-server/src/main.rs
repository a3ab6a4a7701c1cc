//! cairn-server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cairn_core::config::Config;
use cairn_core::store::InMemoryStore;
use cairn_server::{AppState, SqliteStore, router};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cairn-server", version, about = "Project and task tracking API server")]
struct Args {
    /// Path to the TOML configuration file. Missing file means defaults.
    #[arg(long, default_value = "cairn.toml")]
    config: PathBuf,

    /// Override the listen address from the config file.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Override the SQLite database path from the config file.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run against a volatile in-memory store instead of SQLite.
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = if args.config.exists() {
        Config::from_file(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else {
        info!(path = %args.config.display(), "no config file, using defaults");
        Config::default()
    };
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db) = args.db {
        config.database.path = db;
    }
    if config.uses_dev_secret() {
        warn!("auth.token_secret is the development default; tokens are forgeable");
    }

    let state = if args.in_memory {
        warn!("in-memory store selected; data is lost on shutdown");
        AppState::new(Arc::new(InMemoryStore::new()), &config)
    } else {
        let store = SqliteStore::open(&config.database.path)
            .with_context(|| format!("opening {}", config.database.path.display()))?;
        info!(path = %config.database.path.display(), "opened database");
        AppState::new(Arc::new(store), &config)
    };
    let recorder = state.recorder.clone();

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;
    info!(addr = %config.server.bind, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Let queued activity records reach the store before exiting.
    recorder.flush().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => warn!(%err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
