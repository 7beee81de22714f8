use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use viewtube_social::{
    SocialStore,
    api::{self, AppState},
    config::{DEFAULT_CONFIG_PATH, RuntimeOverrides, resolve_runtime_settings},
    security::ensure_not_root,
};

#[derive(Parser, Debug)]
#[command(
    name = "backend",
    about = "Serve the ViewTube social API (likes, comments, subscriptions, tweets)"
)]
struct BackendArgs {
    /// Env-style config file providing DATABASE_PATH, SOCIAL_HOST, SOCIAL_PORT and LOG_FILTER.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// SQLite database path; overrides DATABASE_PATH.
    #[arg(long)]
    db_path: Option<PathBuf>,
    /// Listen address; overrides SOCIAL_HOST.
    #[arg(long)]
    host: Option<String>,
    /// Listen port; overrides SOCIAL_PORT.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = BackendArgs::parse();
    ensure_not_root("backend")?;

    let settings = resolve_runtime_settings(
        &args.config,
        RuntimeOverrides {
            database_path: args.db_path,
            host: args.host,
            port: args.port,
        },
    )?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    let store = SocialStore::open(&settings.database_path).with_context(|| {
        format!(
            "opening social database at {}",
            settings.database_path.display()
        )
    })?;
    info!(db = %store.path().display(), "social store ready");

    let app = api::router(AppState::new(store));

    let listener = tokio::net::TcpListener::bind((settings.host.as_str(), settings.port))
        .await
        .with_context(|| format!("binding to {}:{}", settings.host, settings.port))?;
    let addr = listener.local_addr().context("reading bound address")?;
    info!(%addr, "social API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    info!("social API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl+C handler");
    }
}
