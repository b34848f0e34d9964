//! Continuity API server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shotline_api::{create_router, metrics, ApiConfig, AppState};
use shotline_continuity::ContinuityStore;
use shotline_sync::{ContinuityPersistence, DebounceConfig, HttpContinuityClient, SyncWorker};

/// How long pending saves may take once the server has stopped.
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_LOG_FILTER: &str = "shotline_api=info,shotline_continuity=info,shotline_sync=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env();
    init_tracing(&config);

    info!("Starting shotline-api");
    info!("API config: host={}, port={}", config.host, config.port);

    let store = Arc::new(ContinuityStore::new());
    let mut state = AppState::new(config.clone(), Arc::clone(&store));

    let worker = match HttpContinuityClient::from_env() {
        Ok(client) => {
            info!(base_url = %client.config().base_url, "Continuity persistence enabled");
            let persistence: Arc<dyn ContinuityPersistence> = Arc::new(client);
            let (handle, task) = SyncWorker::new(
                store.clone(),
                Arc::clone(&persistence),
                DebounceConfig::from_env(),
            )
            .spawn();
            state = state.with_persistence(handle, persistence);
            Some(task)
        }
        Err(e) => {
            warn!(error = %e, "Continuity persistence disabled, edits stay in memory");
            None
        }
    };

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router held the last sync handle; the worker now flushes and exits.
    if let Some(task) = worker {
        match tokio::time::timeout(SHUTDOWN_FLUSH_TIMEOUT, task).await {
            Ok(Ok(())) => info!("Pending continuity saved"),
            Ok(Err(e)) => warn!(error = %e, "Sync worker failed during shutdown"),
            Err(_) => warn!("Timed out saving pending continuity"),
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing(config: &ApiConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if config.json_logs() {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
