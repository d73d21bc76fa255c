use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

use crate::config::PoolConfig;
use crate::fetcher::{FetchError, Fetcher};
use crate::job::{Delivery, LinkJob};
use crate::job_metadata::MetadataUpdated;
use crate::persister::Persister;
use crate::publisher::Publisher;
use crate::queue::{JobQueue, QueueError};
use crate::utils::constants::{DEFAULT_WORKERS, MIN_POLL_TIMEOUT, TRANSPORT_BACKOFF};

/// What happened to a single job. Every outcome ends in an acknowledge and is
/// logged with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Metadata was persisted; `published` is false when the notification failed.
    Enriched { published: bool },
    FetchFailed(FetchError),
    PersistFailed(String),
}

/// A fixed set of workers pulling link jobs from one queue.
pub struct WorkerPool {
    config: PoolConfig,
    queue: Arc<dyn JobQueue>,
    fetcher: Arc<dyn Fetcher>,
    persister: Arc<dyn Persister>,
    publisher: Arc<dyn Publisher>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        fetcher: Arc<dyn Fetcher>,
        persister: Arc<dyn Persister>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config: PoolConfig::default(),
            queue,
            fetcher,
            persister,
            publisher,
        }
    }

    pub fn with_config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Spawns the workers and hands back the controller that owns them.
    pub fn start(mut self) -> PoolController {
        let worker_count = match self.config.workers {
            0 => DEFAULT_WORKERS,
            n => n,
        };
        self.config.poll_timeout = self.config.poll_timeout.max(MIN_POLL_TIMEOUT);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let pool = Arc::new(self);

        let handles: Vec<JoinHandle<()>> = (0..worker_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    pool: pool.clone(),
                    shutdown: shutdown_rx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        info!(
            workers = worker_count,
            poll_timeout_ms = pool.config.poll_timeout.as_millis() as u64,
            fetch_timeout_ms = pool.config.fetch_timeout.as_millis() as u64,
            "Worker pool started"
        );

        PoolController {
            worker_count,
            shutdown_tx,
            workers: Mutex::new(handles),
        }
    }

    /// Fetch, persist and publish one job. Does not acknowledge.
    pub async fn process(&self, job: &LinkJob) -> JobOutcome {
        let started = Instant::now();

        let fetched = match timeout(self.config.fetch_timeout, self.fetcher.fetch(job.url())).await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };
        let metadata = match fetched {
            Ok(metadata) => metadata,
            Err(error) => {
                warn!(url = job.url(), kind = error.kind(), %error, "Fetch failed, dropping job");
                return JobOutcome::FetchFailed(error);
            }
        };

        if let Err(error) = self.persister.save(job.link_id(), &metadata).await {
            error!(error = %format!("{error:#}"), "Failed to persist metadata, dropping job");
            return JobOutcome::PersistFailed(error.to_string());
        }

        let event = MetadataUpdated::new(job.content_id(), job.link_id(), metadata);
        let published = match self.publisher.publish(&event).await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "Failed to publish metadata event");
                false
            }
        };

        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            published, "Link metadata stored"
        );
        JobOutcome::Enriched { published }
    }

    async fn handle(&self, worker: usize, delivery: Delivery) {
        let span = info_span!(
            "job",
            worker,
            job_id = delivery.job.id(),
            link_id = delivery.job.link_id()
        );

        let outcome = AssertUnwindSafe(self.process(&delivery.job))
            .catch_unwind()
            .instrument(span.clone())
            .await;
        match outcome {
            Ok(outcome) => debug!(parent: &span, ?outcome, "Acknowledging job"),
            Err(_) => error!(parent: &span, "Job processing panicked, dropping job"),
        }

        if let Err(e) = self.queue.acknowledge(&delivery).await {
            error!(parent: &span, error = %e, "Failed to acknowledge job, left in-flight");
        }
    }
}

struct Worker {
    id: usize,
    pool: Arc<WorkerPool>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    /// A dropped controller counts as a shutdown request.
    fn stopping(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    async fn run(mut self) {
        debug!(worker = self.id, "Worker started");

        while !self.stopping() {
            // The dequeue is never cancelled: an abandoned move could leave a
            // job in-flight with no worker holding it.
            let delivery = match self.pool.queue.dequeue(self.pool.config.poll_timeout).await {
                Ok(Some(delivery)) => delivery,
                Ok(None) => {
                    trace!(worker = self.id, "No job within poll timeout");
                    continue;
                }
                Err(QueueError::Poisoned { source }) => {
                    warn!(worker = self.id, error = %source, "Discarded poison message");
                    continue;
                }
                Err(e) => {
                    error!(worker = self.id, error = %e, "Dequeue failed");
                    self.backoff().await;
                    continue;
                }
            };

            // Already moved to in-flight, so it is processed even if shutdown
            // was requested meanwhile.
            self.pool.handle(self.id, delivery).await;
        }

        debug!(worker = self.id, "Worker stopped");
    }

    async fn backoff(&mut self) {
        tokio::select! {
            _ = sleep(TRANSPORT_BACKOFF) => {}
            _ = self.shutdown.changed() => {}
        }
    }
}

/// Owns the lifecycle of a started pool.
pub struct PoolController {
    worker_count: usize,
    shutdown_tx: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PoolController {
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn is_stopping(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Signals shutdown and waits for every worker to exit. Safe to call
    /// more than once; later callers wait for the same drain.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);

        let mut workers = self.workers.lock().await;
        if workers.is_empty() {
            return;
        }

        info!(workers = workers.len(), "Stopping worker pool");
        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
            }
        }
        info!("Worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_metadata::MetadataRecord;
    use crate::memory_queue::MemoryQueue;
    use async_trait::async_trait;
    use std::time::Duration;

    struct SlowFetcher(Duration);

    #[async_trait]
    impl Fetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> Result<MetadataRecord, FetchError> {
            sleep(self.0).await;
            Ok(MetadataRecord::with_title("late"))
        }
    }

    struct FailingPersister;

    #[async_trait]
    impl Persister for FailingPersister {
        async fn save(&self, _link_id: &str, _m: &MetadataRecord) -> anyhow::Result<()> {
            anyhow::bail!("store offline")
        }
    }

    struct NullPublisher;

    #[async_trait]
    impl Publisher for NullPublisher {
        async fn publish(&self, _event: &MetadataUpdated) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn pool(fetcher: impl Fetcher + 'static) -> WorkerPool {
        WorkerPool::new(
            Arc::new(MemoryQueue::new()),
            Arc::new(fetcher),
            Arc::new(FailingPersister),
            Arc::new(NullPublisher),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_is_bounded_by_fetch_timeout() {
        let pool = pool(SlowFetcher(Duration::from_secs(120)))
            .with_config(PoolConfig::default().with_fetch_timeout(Duration::from_secs(30)));
        let job = LinkJob::new("c", "L1", "https://slow.test").unwrap();

        let outcome = pool.process(&job).await;
        assert_eq!(outcome, JobOutcome::FetchFailed(FetchError::Timeout));
    }

    #[tokio::test]
    async fn persist_failure_is_reported() {
        let pool = pool(SlowFetcher(Duration::ZERO));
        let job = LinkJob::new("c", "L1", "https://ok.test").unwrap();

        let outcome = pool.process(&job).await;
        assert!(matches!(outcome, JobOutcome::PersistFailed(msg) if msg.contains("offline")));
    }

    #[tokio::test]
    async fn zero_workers_uses_default_count() {
        let mut config = PoolConfig::default();
        config.workers = 0;
        let controller = pool(SlowFetcher(Duration::ZERO))
            .with_config(config.with_poll_timeout(Duration::from_millis(20)))
            .start();

        assert_eq!(controller.worker_count(), DEFAULT_WORKERS);
        controller.stop().await;
        assert!(controller.is_stopping());
    }
}
