//! Document Conversion Worker Service
//!
//! This worker consumes document-conversion jobs from a Redis queue,
//! retrieves the source document (URL or object storage), converts it, and
//! reports a per-job result with the requested output formats.
//!
//! ## Architecture
//!
//! - **Queue**: Redis list (`{QUEUE_NAME}:queue`)
//! - **Results**: Redis keys (`{QUEUE_NAME}:result:{job_id}`)
//! - **Pipeline**: fetch -> convert -> multi-format export per job, inside a
//!   scoped temporary workspace
//! - **Telemetry**: OpenTelemetry OTLP export
//!
//! ## Configuration
//!
//! Environment variables:
//! - `QUEUE_NAME`: Queue topic (default: convert-jobs)
//! - `WORKER_CONCURRENCY`: Number of concurrent jobs (default: 2)
//! - `REDIS_HOST` / `REDIS_PORT`: Queue backend (default: localhost:6379)
//! - `S3_ENDPOINT` / `S3_ACCESS_KEY` / `S3_SECRET_KEY` / `AWS_REGION` /
//!   `S3_BUCKET`: Object storage for bucket-sourced documents
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint
//! - `RUST_LOG`: Log level (default: info)

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use worker_convert::config::Config;
use worker_convert::converter::EngineRegistry;
use worker_convert::executor::JobExecutor;
use worker_convert::fetch::{RemoteFetcher, S3ObjectStore};
use worker_convert::queue::RedisQueue;
use worker_convert::scheduler::Scheduler;
use worker_convert::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize OpenTelemetry
    if let Err(e) = telemetry::init_telemetry() {
        warn!("Failed to initialize telemetry: {}", e);
    }

    info!("Starting document conversion worker service");

    let config = Config::from_env();
    info!(
        topic = %config.queue_topic,
        concurrency = config.concurrency,
        redis_url = %config.redis_url(),
        "Configuration loaded"
    );

    // Shared clients: created once here, released when the scheduler stops
    let client = redis::Client::open(config.redis_url().as_str())
        .context("Failed to create Redis client")?;
    let conn = redis::aio::ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis");

    let store = Arc::new(
        S3ObjectStore::new(&config.storage).context("Failed to configure object storage")?,
    );
    let fetcher = Arc::new(RemoteFetcher::new(reqwest::Client::new(), store));
    let executor = Arc::new(JobExecutor::new(
        fetcher,
        Arc::new(EngineRegistry::with_defaults()),
    ));
    let queue = RedisQueue::new(conn, &config.queue_topic);

    // Shutdown signals stop intake only; in-flight jobs drain naturally
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match wait_for_shutdown_signal().await {
                Ok(()) => info!("Received shutdown signal, draining"),
                Err(e) => error!("Failed to listen for shutdown signals: {}", e),
            }
            shutdown.cancel();
        }
    });

    info!("Worker service ready");
    Scheduler::new(queue, executor, config.concurrency, shutdown)
        .run()
        .await;

    info!("Worker service shutdown complete");
    Ok(())
}

/// Resolves when the process receives an interrupt or terminate signal.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to listen for SIGINT")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    Ok(())
}
