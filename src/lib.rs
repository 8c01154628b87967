//! Document Conversion Worker Library
//!
//! Core components of the queue-driven document conversion worker. The
//! binary in `main.rs` wires these together; everything here is usable on
//! its own (the producer side reuses `job` and `queue`).
//!
//! ## Module Overview
//!
//! - `config`: environment-driven configuration, read once at startup
//! - `error`: typed error taxonomy for the job pipeline
//! - `job`: job payload, result contract, and format output model
//! - `fetch`: source retrieval (HTTP and object storage) behind trait seams
//! - `converter`: conversion engines and the unified document model
//! - `export`: per-format export with tagged success/failure entries
//! - `executor`: per-job workspace and pipeline orchestration
//! - `queue`: Redis-based queue adapter
//! - `scheduler`: bounded dispatch loop and cooperative drain
//! - `telemetry`: OpenTelemetry integration and structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use worker_convert::converter::EngineRegistry;
//! use worker_convert::job::{Job, JobPayload};
//!
//! let registry = EngineRegistry::with_defaults();
//!
//! let job = Job::new(JobPayload {
//!     source: Some("http://localhost/report.txt".to_string()),
//!     requested_formats: Some(vec!["markdown".to_string(), "html".to_string()]),
//!     ..Default::default()
//! });
//!
//! let engine = registry.resolve(job.data.engine());
//! let model = engine.convert(std::path::Path::new("/tmp/input")).unwrap();
//! assert!(!model.to_markdown().is_empty());
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod executor;
pub mod export;
pub mod fetch;
pub mod job;
pub mod queue;
pub mod scheduler;
pub mod telemetry;
