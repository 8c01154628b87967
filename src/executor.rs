//! Single-job execution: fetch, convert, export, report-ready result.

use crate::converter::EngineRegistry;
use crate::error::JobError;
use crate::export;
use crate::fetch::{SourceFetcher, SourceRef};
use crate::job::{FormatOutput, Job, JobResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{info, warn};

/// Exclusively-owned temporary scope for one job's input file.
///
/// The backing directory is removed recursively when the workspace drops,
/// on success, failure, and panic alike. It is never shared between jobs.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::with_prefix("convert-job-")?,
        })
    }

    /// Path of the single input file inside this workspace.
    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Runs one job through the conversion pipeline.
///
/// The shared handles (fetcher, engines) are injected once at startup and
/// are safe for concurrent use; all per-job state lives in the workspace.
pub struct JobExecutor {
    fetcher: Arc<dyn SourceFetcher>,
    engines: Arc<EngineRegistry>,
}

impl JobExecutor {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, engines: Arc<EngineRegistry>) -> Self {
        Self { fetcher, engines }
    }

    /// Executes a job to a terminal [`JobResult`].
    ///
    /// Never returns an error: every failure in steps fetch through export is
    /// folded into a `failed` result, so a single job cannot take down the
    /// scheduler or block its siblings.
    pub async fn execute(&self, job: &Job) -> JobResult {
        let started = Instant::now();
        info!(job_id = %job.id, "Processing job");

        match self.run_pipeline(job).await {
            Ok((formats, page_count)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    job_id = %job.id,
                    duration_ms,
                    page_count,
                    "Job completed"
                );
                JobResult::completed(&job.id, formats, page_count, duration_ms)
            }
            Err(e) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                warn!(job_id = %job.id, error = %e, "Job failed");
                JobResult::failed(&job.id, &e, duration_ms)
            }
        }
    }

    async fn run_pipeline(&self, job: &Job) -> Result<(FormatOutput, usize), JobError> {
        let workspace = Workspace::create()?;

        let source = SourceRef::from_payload(&job.data).ok_or(JobError::InvalidJob)?;
        let input = workspace.input_path();
        self.fetcher.fetch(&source, &input).await?;

        let engine = self.engines.resolve(job.data.engine());
        let model = engine.convert(&input)?;

        let formats = export::export(&model, &job.data.formats());
        Ok((formats, model.page_count()))
        // workspace drops here, removing the directory on every path
    }
}
