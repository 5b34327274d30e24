//! vpr-server - VoxPrivacyRecord recording backend
//!
//! Serves the participant API (login, next task, upload), the admin export
//! endpoints and the embedded browser recording UI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};
use vpr_common::config::load_toml_config;
use vpr_common::{Catalog, TaskSequencer};
use vpr_server::config::CliOverrides;
use vpr_server::{build_router, db, AppState, RecordingStore, ServerConfig};

/// Command-line arguments for vpr-server
#[derive(Parser, Debug)]
#[command(name = "vpr-server")]
#[command(about = "VoxPrivacyRecord speech recording backend")]
#[command(version)]
struct Args {
    /// Port to listen on [default: 8000]
    #[arg(short, long, env = "VPR_PORT")]
    port: Option<u16>,

    /// Bind address [default: 0.0.0.0]
    #[arg(long, env = "VPR_HOST")]
    host: Option<String>,

    /// Folder for the database and recordings (env: VPR_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Folder holding the prompt source files (env: VPR_SOURCE_DIR)
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "VPR_CONFIG")]
    config: Option<PathBuf>,

    /// `*` or comma-separated allowed origins
    #[arg(long, env = "VPR_CORS_ORIGINS")]
    cors_origins: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise start at info and switch to the configured level once loaded
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting VoxPrivacyRecord server (vpr-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml = load_toml_config(args.config.as_deref()).context("Failed to load config")?;
    if !rust_log_set {
        filter_handle
            .reload(EnvFilter::new(&toml.logging.level))
            .context("Failed to apply configured log level")?;
    }

    let cli = CliOverrides {
        host: args.host,
        port: args.port,
        data_dir: args.data_dir,
        source_dir: args.source_dir,
        cors_origins: args.cors_origins,
    };
    let config = ServerConfig::resolve(&cli, toml);

    info!("Data folder: {}", config.data_dir.display());
    info!("Prompt sources: {}", config.source_dir.display());
    info!("Log level: {}", config.log_level);

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Failed to create data folder {}", config.data_dir.display())
    })?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = match db::init_database(&db_path).await {
        Ok(pool) => {
            info!("Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let catalog = Catalog::load(config.source_dir()).context("Failed to load prompt catalog")?;
    let sequencer =
        TaskSequencer::new(catalog, config.quotas).context("Invalid quota configuration")?;
    info!("Quotas: {} completed items per user", config.quotas.total());

    let store = RecordingStore::new(config.recordings_dir())
        .context("Failed to create recordings folder")?;
    info!("Recordings: {}", store.root().display());

    let state = AppState::new(pool, sequencer, store);
    let app = build_router(state, &config.http);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("vpr-server listening on http://{}", addr);
    info!("Recording UI: http://{}/app", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
