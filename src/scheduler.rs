//! Bounded job dispatch and cooperative shutdown.

use crate::executor::JobExecutor;
use crate::queue::{JobSource, ResultReporter};
use crate::telemetry;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Lifecycle states of the worker scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Starting => write!(f, "starting"),
            WorkerState::Running => write!(f, "running"),
            WorkerState::Draining => write!(f, "draining"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Pause after a queue transport error before polling again.
const DEQUEUE_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Pulls jobs from the queue and executes them with bounded concurrency.
///
/// The scheduler owns the shared handles for the lifetime of the process:
/// created once at startup, dropped once after the drain completes. The
/// shutdown token only stops intake; jobs already dispatched run to natural
/// completion and there is no mid-job cancellation.
pub struct Scheduler<Q> {
    queue: Q,
    executor: Arc<JobExecutor>,
    concurrency: usize,
    shutdown: CancellationToken,
}

impl<Q> Scheduler<Q>
where
    Q: JobSource + ResultReporter + Clone + Send + Sync + 'static,
{
    pub fn new(
        queue: Q,
        executor: Arc<JobExecutor>,
        concurrency: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            executor,
            concurrency,
            shutdown,
        }
    }

    /// Runs until the shutdown token fires, then drains in-flight jobs.
    pub async fn run(mut self) {
        let mut state = WorkerState::Starting;
        info!(
            state = %state,
            concurrency = self.concurrency,
            "Scheduler starting"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut inflight: JoinSet<()> = JoinSet::new();

        state = WorkerState::Running;
        info!(state = %state, "Scheduler accepting jobs");

        loop {
            // Intake is bounded before dequeuing so excess jobs wait in the
            // queue rather than in process memory. Shutdown is checked first
            // so no new job is dispatched once the token fires.
            let permit = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => {
                    permit.expect("job semaphore closed")
                }
            };

            let job = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    drop(permit);
                    break;
                }
                polled = self.queue.next_job() => match polled {
                    Ok(Some(job)) => job,
                    Ok(None) => {
                        drop(permit);
                        telemetry::record_worker_heartbeat(inflight.len());
                        continue;
                    }
                    Err(e) => {
                        drop(permit);
                        error!(error = %e, "Failed to poll job queue");
                        tokio::select! {
                            _ = self.shutdown.cancelled() => break,
                            _ = tokio::time::sleep(DEQUEUE_RETRY_DELAY) => {}
                        }
                        continue;
                    }
                }
            };

            let executor = self.executor.clone();
            let reporter = self.queue.clone();
            inflight.spawn(async move {
                let _permit = permit;
                let result = executor.execute(&job).await;
                telemetry::record_job_result(&result);
                if let Err(e) = reporter.report(&result).await {
                    error!(
                        job_id = %result.job_id,
                        error = %e,
                        "Failed to report job result"
                    );
                }
            });

            // Reap already-finished tasks so the set stays small.
            while inflight.try_join_next().is_some() {}
        }

        state = WorkerState::Draining;
        info!(
            state = %state,
            in_flight = inflight.len(),
            "Shutdown requested, waiting for in-flight jobs"
        );

        while inflight.join_next().await.is_some() {}

        state = WorkerState::Stopped;
        info!(state = %state, "Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::EngineRegistry;
    use crate::error::FetchError;
    use crate::fetch::{SourceFetcher, SourceRef};
    use crate::job::{Job, JobPayload, JobResult};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone)]
    struct FakeQueue {
        jobs: Arc<Mutex<VecDeque<Job>>>,
        results: Arc<Mutex<Vec<JobResult>>>,
    }

    impl FakeQueue {
        fn with_jobs(jobs: Vec<Job>) -> Self {
            Self {
                jobs: Arc::new(Mutex::new(jobs.into())),
                results: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn result_count(&self) -> usize {
            self.results.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl JobSource for FakeQueue {
        async fn next_job(&mut self) -> Result<Option<Job>> {
            let job = self.jobs.lock().unwrap().pop_front();
            if job.is_none() {
                // Mimic the blocking poll timeout
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(job)
        }
    }

    #[async_trait]
    impl ResultReporter for FakeQueue {
        async fn report(&self, result: &JobResult) -> Result<()> {
            self.results.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    /// Fetcher that tracks how many fetches run at once.
    struct GaugedFetcher {
        active: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl GaugedFetcher {
        fn new(delay: Duration) -> Self {
            Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl SourceFetcher for GaugedFetcher {
        async fn fetch(&self, _source: &SourceRef, dest: &Path) -> Result<(), FetchError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            tokio::fs::write(dest, b"# Doc\n\nbody").await?;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn url_job() -> Job {
        Job::new(JobPayload {
            source: Some("http://localhost/doc.txt".to_string()),
            ..Default::default()
        })
    }

    fn executor(fetcher: Arc<GaugedFetcher>) -> Arc<JobExecutor> {
        Arc::new(JobExecutor::new(
            fetcher,
            Arc::new(EngineRegistry::with_defaults()),
        ))
    }

    async fn wait_for_results(queue: &FakeQueue, expected: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while queue.result_count() < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for job results");
    }

    #[tokio::test]
    async fn concurrency_limit_is_never_exceeded() {
        let jobs: Vec<Job> = (0..6).map(|_| url_job()).collect();
        let queue = FakeQueue::with_jobs(jobs);
        let fetcher = Arc::new(GaugedFetcher::new(Duration::from_millis(30)));
        let shutdown = CancellationToken::new();

        let scheduler = Scheduler::new(queue.clone(), executor(fetcher.clone()), 2, shutdown.clone());
        let handle = tokio::spawn(scheduler.run());

        wait_for_results(&queue, 6).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(queue.result_count(), 6);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn drain_finishes_in_flight_jobs_and_stops_intake() {
        let queue = FakeQueue::with_jobs(vec![url_job(), url_job()]);
        let fetcher = Arc::new(GaugedFetcher::new(Duration::from_millis(50)));
        let shutdown = CancellationToken::new();

        let scheduler = Scheduler::new(queue.clone(), executor(fetcher.clone()), 2, shutdown.clone());
        let handle = tokio::spawn(scheduler.run());

        // Wait until both jobs are actually in flight
        tokio::time::timeout(Duration::from_secs(10), async {
            while fetcher.active.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("jobs never started");

        shutdown.cancel();
        // Jobs enqueued after shutdown must not be dispatched
        queue.jobs.lock().unwrap().push_back(url_job());
        queue.jobs.lock().unwrap().push_back(url_job());

        handle.await.unwrap();

        assert_eq!(queue.result_count(), 2);
        assert_eq!(queue.jobs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn every_job_reports_exactly_one_result() {
        let jobs: Vec<Job> = (0..4).map(|_| url_job()).collect();
        let ids: Vec<String> = jobs.iter().map(|j| j.id.clone()).collect();
        let queue = FakeQueue::with_jobs(jobs);
        let fetcher = Arc::new(GaugedFetcher::new(Duration::from_millis(5)));
        let shutdown = CancellationToken::new();

        let scheduler = Scheduler::new(queue.clone(), executor(fetcher), 3, shutdown.clone());
        let handle = tokio::spawn(scheduler.run());

        wait_for_results(&queue, 4).await;
        shutdown.cancel();
        handle.await.unwrap();

        let results = queue.results.lock().unwrap();
        let mut reported: Vec<&str> = results.iter().map(|r| r.job_id.as_str()).collect();
        reported.sort_unstable();
        let mut expected: Vec<&str> = ids.iter().map(String::as_str).collect();
        expected.sort_unstable();
        assert_eq!(reported, expected);
    }
}
