// src/queue.rs
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::job::{Delivery, JobError, LinkJob};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(#[from] redis::RedisError),

    #[error("failed to serialize job: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The entry could not be decoded and has already been dropped from in-flight.
    #[error("discarded malformed queue entry: {source}")]
    Poisoned {
        #[source]
        source: JobError,
    },
}

/// A durable FIFO of link jobs with a pending list and an in-flight list.
///
/// Backends implement the raw list primitives; `enqueue`, `dequeue` and
/// `acknowledge` are built on top of them. Every primitive must be safe to
/// call concurrently from many workers, and `move_next` must move an entry
/// from pending to in-flight atomically.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Appends a raw payload to the tail of the pending list.
    async fn push(&self, payload: String) -> Result<(), QueueError>;

    /// Moves the head of pending to in-flight, waiting up to `timeout`.
    async fn move_next(&self, timeout: Duration) -> Result<Option<String>, QueueError>;

    /// Removes one occurrence of `payload` from in-flight. Missing entries are not an error.
    async fn remove_in_flight(&self, payload: &str) -> Result<(), QueueError>;

    async fn pending_depth(&self) -> Result<usize, QueueError>;

    async fn in_flight_depth(&self) -> Result<usize, QueueError>;

    /// Oldest-first view of at most `limit` in-flight payloads.
    async fn peek_in_flight(&self, limit: usize) -> Result<Vec<String>, QueueError>;

    async fn enqueue(&self, job: &LinkJob) -> Result<(), QueueError> {
        let payload = job.to_payload()?;
        self.push(payload).await?;
        debug!(job_id = job.id(), link_id = job.link_id(), "Enqueued link job");
        Ok(())
    }

    /// Returns `Ok(None)` when nothing arrived within `timeout`.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<Delivery>, QueueError> {
        let Some(payload) = self.move_next(timeout).await? else {
            return Ok(None);
        };

        match LinkJob::from_payload(&payload) {
            Ok(job) => Ok(Some(Delivery { job, payload })),
            Err(source) => {
                warn!(error = %source, %payload, "Dropping malformed queue entry");
                self.remove_in_flight(&payload).await?;
                Err(QueueError::Poisoned { source })
            }
        }
    }

    async fn acknowledge(&self, delivery: &Delivery) -> Result<(), QueueError> {
        self.remove_in_flight(&delivery.payload).await
    }
}
