//! # Tickstream Server
//!
//! Main entry point for the Tickstream real-time quote server.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults
//! FINNHUB_API_KEY=... tickstream-server
//!
//! # Override the bind address
//! tickstream-server --host 127.0.0.1 --port 9090
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};

use tickstream_api::clients::FinnhubClient;
use tickstream_api::shutdown::{ShutdownController, setup_signal_handlers};
use tickstream_api::ws::{Coordinator, spawn_flush_scheduler, spawn_refresh_poller};
use tickstream_api::{ApiConfig, ApiServer, AppState};
use tickstream_core::{MemoryCache, QuoteSource};

/// Interval between cache expiry sweeps.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Tickstream real-time quote server
#[derive(Parser, Debug)]
#[command(name = "tickstream-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Override server host
    #[arg(long, env = "TICKSTREAM_HOST")]
    host: Option<String>,

    /// Override server port
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Upstream provider API key
    #[arg(long, env = "FINNHUB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn setup_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug);

    let config = load_config(&args);
    if config.provider.api_key.is_empty() {
        tracing::warn!("No provider API key configured; upstream fetches will fail");
    }

    run_server(config).await
}

/// Builds configuration from defaults, environment, and flags.
fn load_config(args: &Args) -> ApiConfig {
    let mut config = ApiConfig::default().with_env_overrides();

    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(api_key) = &args.api_key {
        config.provider.api_key.clone_from(api_key);
    }

    config
}

/// Wires components together and runs until a shutdown signal.
async fn run_server(config: ApiConfig) -> Result<()> {
    let shutdown = ShutdownController::new();

    // Cache and provider
    let cache = Arc::new(MemoryCache::new());
    let provider = Arc::new(FinnhubClient::new(config.provider.clone(), cache.clone())?);

    // Distribution core
    let (coordinator, coordinator_handle) = Coordinator::new(provider.clone() as Arc<dyn QuoteSource>);
    tokio::spawn(coordinator.run());
    let _flush_task = spawn_flush_scheduler(
        coordinator_handle.clone(),
        &config.websocket,
        shutdown.clone(),
    );
    let _poller_task = spawn_refresh_poller(
        coordinator_handle.clone(),
        provider.clone(),
        &config.websocket,
        shutdown.clone(),
    );

    // Periodic cache expiry sweep
    spawn_cache_sweeper(cache, shutdown.clone());

    // Signal handling
    tokio::spawn(setup_signal_handlers(shutdown.clone()));

    // On shutdown, close the distribution core first so websocket
    // sessions terminate and the HTTP server can drain
    {
        let shutdown = shutdown.clone();
        let coordinator = coordinator_handle.clone();
        tokio::spawn(async move {
            shutdown.wait_for_shutdown().await;
            coordinator.shutdown();
        });
    }

    let grace = config.websocket.shutdown_grace();
    let state = Arc::new(AppState::new(config, provider, coordinator_handle));
    let server = ApiServer::new(state);

    let signal = {
        let shutdown = shutdown.clone();
        async move { shutdown.wait_for_shutdown().await }
    };
    server.run_with_shutdown(signal).await?;

    shutdown.mark_complete();
    shutdown.wait_for_completion(grace).await;
    info!("Tickstream server stopped");

    Ok(())
}

/// Spawns the periodic cache expiry sweep.
fn spawn_cache_sweeper(cache: Arc<MemoryCache>, shutdown: ShutdownController) {
    tokio::spawn(async move {
        let mut signal = shutdown.subscribe();
        let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = signal.recv() => break,
                _ = interval.tick() => cache.purge_expired(),
            }
        }
    });
}
