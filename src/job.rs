//! Job models and the result contract for the conversion queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Engine applied when a job names none.
pub const DEFAULT_ENGINE: &str = "standard";

/// Output format applied when a job requests none.
pub const DEFAULT_FORMAT: &str = "markdown";

/// One document-conversion request as delivered by the queue.
///
/// Immutable once read by the executor; the queue owns any retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub data: JobPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_formats: Option<Vec<String>>,
}

impl Job {
    /// Creates a job with a fresh id. Used by the enqueue side and tests;
    /// the worker itself only consumes jobs.
    pub fn new(data: JobPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data,
        }
    }
}

impl JobPayload {
    /// Engine identifier to resolve, defaulted.
    pub fn engine(&self) -> &str {
        self.conversion_engine.as_deref().unwrap_or(DEFAULT_ENGINE)
    }

    /// Requested format identifiers, defaulted to a single canonical format.
    pub fn formats(&self) -> Vec<String> {
        match self.requested_formats.as_deref() {
            Some(requested) if !requested.is_empty() => requested.to_vec(),
            _ => vec![DEFAULT_FORMAT.to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of exporting one requested format: either the produced content
/// (string or structured value) or an explicit failure marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatResult {
    Failure { error: String },
    Content(Value),
}

impl FormatResult {
    pub fn content(value: impl Into<Value>) -> Self {
        FormatResult::Content(value.into())
    }

    pub fn failure(error: impl Into<String>) -> Self {
        FormatResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FormatResult::Failure { .. })
    }
}

/// Mapping from format identifier to its export outcome. Keys are unique per
/// job; order is irrelevant.
pub type FormatOutput = BTreeMap<String, FormatResult>;

/// Terminal result reported back to the queue, exactly one per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<FormatOutput>,
    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn completed(
        job_id: impl Into<String>,
        formats: FormatOutput,
        page_count: usize,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Completed,
            formats: Some(formats),
            metadata: ResultMetadata {
                page_count: Some(page_count),
                processing_time_ms: Some(processing_time_ms),
                completed_at: Some(Utc::now()),
                error: None,
            },
        }
    }

    pub fn failed(
        job_id: impl Into<String>,
        error: impl fmt::Display,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Failed,
            formats: None,
            metadata: ResultMetadata {
                page_count: None,
                processing_time_ms: Some(processing_time_ms),
                completed_at: Some(Utc::now()),
                error: Some(error.to_string()),
            },
        }
    }
}
