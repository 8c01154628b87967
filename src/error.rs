//! Error taxonomy for the conversion pipeline.
//!
//! Every variant here is terminal for the job that raised it: the executor
//! folds these into a `failed` job result instead of letting them propagate
//! to the scheduler. Queue transport errors live outside this taxonomy and
//! are handled with `anyhow` at the call site.

use thiserror::Error;

/// Source retrieval failure (network or storage). Not retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("object \"{key}\" unavailable in bucket \"{bucket}\": {message}")]
    Storage {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("failed to write fetched input: {0}")]
    Io(#[from] std::io::Error),
}

/// The underlying conversion failed or produced no usable model.
#[derive(Debug, Error)]
#[error("conversion failed: {message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A single format's export failed. Recorded per format, never fatal
/// to the job.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported format \"{0}\"")]
    Unsupported(String),

    #[error("failed to render \"{format}\": {message}")]
    Render { format: String, message: String },
}

/// Terminal failure of one job, folded into a `failed` job result by the
/// executor. The display strings are the human-readable error messages the
/// job's consumer sees.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job payload is missing a source reference (expected source or storageKey)")]
    InvalidJob,

    #[error("failed to create job workspace: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("source retrieval failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
