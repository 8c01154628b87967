//! Redis-based job queue adapter.

use crate::job::{Job, JobResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, info};

/// Result TTL in seconds (24 hours).
const RESULT_TTL_SECONDS: u64 = 86400;

/// Blocking dequeue timeout in seconds.
const DEQUEUE_TIMEOUT_SECS: f64 = 5.0;

/// Delivers jobs to the scheduler. One implementation per queue backend;
/// tests substitute in-memory fakes.
#[async_trait]
pub trait JobSource {
    /// Waits for the next job, returning `None` when the poll times out
    /// with nothing available.
    async fn next_job(&mut self) -> Result<Option<Job>>;
}

/// Reports terminal job results back to the queue. Safe for concurrent use;
/// every executor task holds a clone of the implementing handle.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    async fn report(&self, result: &JobResult) -> Result<()>;
}

/// Redis-backed queue under a named topic.
///
/// Jobs are JSON entries in a list (`{topic}:queue`, FIFO via RPUSH/BLPOP);
/// results are written to `{topic}:result:{job_id}` for client polling and
/// expire after 24 hours. The connection manager is cheap to clone and safe
/// for concurrent use, so one queue value serves the whole worker.
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    queue_key: String,
    result_prefix: String,
}

impl RedisQueue {
    pub fn new(conn: ConnectionManager, topic: &str) -> Self {
        Self {
            conn,
            queue_key: format!("{topic}:queue"),
            result_prefix: format!("{topic}:result"),
        }
    }

    /// Enqueues a job for processing.
    ///
    /// The worker itself only consumes; this is the producer surface used by
    /// the API side and by tests.
    pub async fn enqueue(&mut self, job: &Job) -> Result<()> {
        let job_json = serde_json::to_string(job).context("Failed to serialize job")?;

        self.conn
            .rpush::<_, _, ()>(&self.queue_key, &job_json)
            .await
            .context("Failed to push job to queue")?;

        info!(job_id = %job.id, "Enqueued job");
        Ok(())
    }

    /// Fetches the reported result for a job, if one exists.
    pub async fn get_result(&mut self, job_id: &str) -> Result<Option<JobResult>> {
        let result_key = format!("{}:{}", self.result_prefix, job_id);

        let result_json: Option<String> = self
            .conn
            .get(&result_key)
            .await
            .context("Failed to get job result")?;

        match result_json {
            Some(json) => {
                let result: JobResult =
                    serde_json::from_str(&json).context("Failed to deserialize job result")?;
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// Returns the current queue depth.
    pub async fn queue_length(&mut self) -> Result<usize> {
        let len: usize = self
            .conn
            .llen(&self.queue_key)
            .await
            .context("Failed to get queue length")?;
        Ok(len)
    }
}

#[async_trait]
impl JobSource for RedisQueue {
    /// Dequeues the next job (BLPOP with a short timeout so the scheduler
    /// can observe shutdown between polls).
    async fn next_job(&mut self) -> Result<Option<Job>> {
        let result: Option<(String, String)> = self
            .conn
            .blpop(&self.queue_key, DEQUEUE_TIMEOUT_SECS)
            .await
            .context("Failed to pop job from queue")?;

        match result {
            Some((_key, job_json)) => {
                let job: Job =
                    serde_json::from_str(&job_json).context("Failed to deserialize job")?;
                debug!(job_id = %job.id, "Dequeued job");
                Ok(Some(job))
            }
            None => {
                // Timeout, no job available
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ResultReporter for RedisQueue {
    async fn report(&self, result: &JobResult) -> Result<()> {
        let result_key = format!("{}:{}", self.result_prefix, result.job_id);
        let result_json =
            serde_json::to_string(result).context("Failed to serialize job result")?;

        self.conn
            .clone()
            .set_ex::<_, _, ()>(&result_key, &result_json, RESULT_TTL_SECONDS)
            .await
            .context("Failed to report job result")?;

        debug!(
            job_id = %result.job_id,
            status = %result.status,
            "Reported job result"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobPayload, JobStatus};

    // Note: These tests require a running Redis instance.
    // Run with: docker run -d -p 6379:6379 redis:7-alpine
    // Skip in CI: cargo test --lib -- --skip queue::tests

    #[tokio::test]
    #[ignore]
    async fn test_enqueue_dequeue() {
        let client = redis::Client::open("redis://127.0.0.1/").unwrap();
        let conn = ConnectionManager::new(client).await.unwrap();
        let mut queue = RedisQueue::new(conn, "convert-test");

        let job = Job::new(JobPayload {
            source: Some("http://localhost/doc.txt".to_string()),
            ..Default::default()
        });

        queue.enqueue(&job).await.unwrap();

        let dequeued = queue.next_job().await.unwrap();
        assert!(dequeued.is_some());

        let dequeued_job = dequeued.unwrap();
        assert_eq!(dequeued_job.id, job.id);
        assert_eq!(dequeued_job.data.source, job.data.source);
    }

    #[tokio::test]
    #[ignore]
    async fn test_result_reporting() {
        let client = redis::Client::open("redis://127.0.0.1/").unwrap();
        let conn = ConnectionManager::new(client).await.unwrap();
        let mut queue = RedisQueue::new(conn, "convert-test");

        let result = JobResult::failed("job-result-test", "source retrieval failed", 5);
        queue.report(&result).await.unwrap();

        let fetched = queue.get_result("job-result-test").await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert!(fetched.metadata.error.unwrap().contains("retrieval"));
    }
}
