use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelforge_core::{
    load_config_or_default, validate_config, BatchOrchestrator, Converter, FfmpegConverter,
    RetentionSweeper, StorageManager,
};
use reelforge_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("REELFORGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Storage root: {:?}", config.storage.root);
    info!(
        "Batch limits: {} files, concurrency {}",
        config.batch.max_files, config.batch.concurrency
    );

    // Prepare scratch storage
    let storage = StorageManager::new(config.storage.clone());
    storage
        .ensure_roots()
        .await
        .context("Failed to prepare storage directories")?;

    // Create converter; a missing engine is reported per job, not fatal here
    let converter = FfmpegConverter::new(config.converter.clone());
    match converter.validate().await {
        Ok(()) => info!("Using converter: {}", converter.name()),
        Err(e) => warn!("Converter not ready, conversions will fail: {}", e),
    }
    let converter: Arc<dyn Converter> = Arc::new(converter);

    // Create batch orchestrator
    let orchestrator = Arc::new(BatchOrchestrator::new(
        config.batch.clone(),
        Arc::clone(&converter),
        storage.clone(),
    ));

    // Start retention sweeper
    let shutdown = CancellationToken::new();
    let sweeper_handle = if config.sweeper.enabled {
        let sweeper =
            RetentionSweeper::from_config(config.storage.sweep_roots(), &config.sweeper);
        Some(sweeper.spawn(shutdown.clone()))
    } else {
        info!("Retention sweeper disabled in config");
        None
    };

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        orchestrator,
        converter.name(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop sweeper if running
    info!("Server shutting down...");
    shutdown.cancel();
    if let Some(handle) = sweeper_handle {
        let _ = handle.await;
        info!("Retention sweeper stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
