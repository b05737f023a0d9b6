mod app;
mod cache;
mod config;
mod handlers;
mod middleware;
mod state;
mod storage;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use listenfd::ListenFd;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_core::cache::CacheConnector;

use crate::{
    app::create_app,
    cache::{CacheClient, MemoryConnector, RedisConnector},
    config::{CacheBackend, Config, LogFormat},
    state::AppState,
};

/// Quill - A blog API with a read-through cache
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3000", env = "PORT")]
    port: u16,
}

fn init_tracing(format: LogFormat) {
    let json = format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Builds the cache client for the configured backend. Nothing is
/// connected yet.
fn build_cache(config: &Config) -> Result<CacheClient> {
    let connector: Arc<dyn CacheConnector> = match config.cache_backend {
        CacheBackend::Redis => Arc::new(RedisConnector::new(&config.redis_url)?),
        CacheBackend::Memory => Arc::new(MemoryConnector::new(config.cache_max_entries)),
        CacheBackend::Disabled => return Ok(CacheClient::disabled()),
    };
    Ok(CacheClient::new(connector, config.cache_settings()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(LogFormat::from_env());

    let config = Config::from_env();
    tracing::info!(
        backend = ?config.cache_backend,
        ttl_seconds = config.cache_ttl_seconds,
        "Starting quill"
    );

    // The cache is optional: a failed connect is logged and the client keeps
    // retrying in the background on demand.
    let cache = build_cache(&config)?;
    if !cache.connect().await {
        tracing::warn!("Cache unavailable at startup, serving without it");
    }

    let state = AppState::new(config, cache.clone());

    // Build the application router
    let app = create_app(state);

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        // If we are given a tcp listener on listen fd 0, use that one
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        // Otherwise fall back to CLI-specified host:port
        None => {
            let addr = format!("{}:{}", cli.host, cli.port);
            TcpListener::bind(&addr).await?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
