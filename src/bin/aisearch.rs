//! aisearch service binary.
//!
//! Loads configuration, starts the page fetcher and serves the HTTP API
//! until SIGINT/SIGTERM. The first signal drains in-flight requests; a
//! second one exits immediately.

use std::sync::Arc;

use aisearch::config::ServiceConfig;
use aisearch::gate::AdmissionGate;
use aisearch::server::SearchServer;
use aisearch_pipeline::{FetcherHandle, Pipeline};
use tracing_subscriber::EnvFilter;

/// Exit status used when a second signal aborts the drain.
const FORCED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("{},hyper=warn,reqwest=warn", config.logging.level))
            }),
        )
        .init();

    tracing::info!(
        searxng = %config.pipeline.searxng_api_base,
        fetcher = ?config.fetcher.backend,
        "aisearch starting"
    );

    config.validate()?;

    let fetcher = config.build_fetcher()?;
    let handle = Arc::new(FetcherHandle::start(fetcher).await.map_err(|e| {
        tracing::error!(error = %e, "page fetcher failed to start");
        anyhow::anyhow!("page fetcher failed to start: {e}")
    })?);

    let pipeline = Arc::new(Pipeline::new(config.pipeline.clone(), Arc::clone(&handle))?);
    let gate = AdmissionGate::new();
    let mut server = SearchServer::start(&config.server, pipeline, gate).await?;

    shutdown_signal().await;
    tracing::info!("shutdown signal received, draining in-flight requests");

    tokio::select! {
        () = server.shutdown() => {}
        () = shutdown_signal() => {
            tracing::warn!("second shutdown signal received, exiting immediately");
            std::process::exit(FORCED_EXIT_CODE);
        }
    }

    handle.shutdown().await;
    tracing::info!("aisearch shut down cleanly");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
