//! Environment-driven worker configuration.
//!
//! All options are read once at startup; the pipeline never re-reads the
//! environment. Defaults match a local docker-compose stack (Redis on
//! localhost, MinIO on port 9000).

use std::env;

/// Worker configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue topic the worker registers under (`QUEUE_NAME`).
    pub queue_topic: String,
    /// Maximum number of concurrently executing jobs (`WORKER_CONCURRENCY`).
    pub concurrency: usize,
    /// Redis host for the queue backend (`REDIS_HOST`).
    pub redis_host: String,
    /// Redis port for the queue backend (`REDIS_PORT`).
    pub redis_port: u16,
    /// Object storage connection settings.
    pub storage: StorageConfig,
}

/// S3-compatible object storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Endpoint URL (`S3_ENDPOINT`).
    pub endpoint: String,
    /// Access key (`S3_ACCESS_KEY`).
    pub access_key: String,
    /// Secret key (`S3_SECRET_KEY`).
    pub secret_key: String,
    /// Region name (`AWS_REGION`).
    pub region: String,
    /// Bucket holding source documents (`S3_BUCKET`).
    pub bucket: String,
}

impl Config {
    /// Reads the configuration from the environment, applying defaults for
    /// every missing variable.
    pub fn from_env() -> Self {
        Self {
            queue_topic: env_or("QUEUE_NAME", "convert-jobs"),
            concurrency: env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            redis_host: env_or("REDIS_HOST", "localhost"),
            redis_port: env::var("REDIS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6379),
            storage: StorageConfig {
                endpoint: env_or("S3_ENDPOINT", "http://localhost:9000"),
                access_key: env_or("S3_ACCESS_KEY", "minioadmin"),
                secret_key: env_or("S3_SECRET_KEY", "minioadmin"),
                region: env_or("AWS_REGION", "us-east-1"),
                bucket: env_or("S3_BUCKET", "parsly"),
            },
        }
    }

    /// Redis connection string for the queue backend.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_host, self.redis_port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
