// src/memory_queue.rs
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::queue::{JobQueue, QueueError};

#[derive(Default)]
struct Lists {
    pending: VecDeque<String>,
    in_flight: Vec<String>,
}

/// In-process queue backend with the same move/acknowledge semantics as
/// the Redis one. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryQueue {
    lists: Mutex<Lists>,
    available: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lists(&self) -> MutexGuard<'_, Lists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_move(&self) -> Option<String> {
        let mut lists = self.lists();
        let payload = lists.pending.pop_front()?;
        lists.in_flight.push(payload.clone());
        Some(payload)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn push(&self, payload: String) -> Result<(), QueueError> {
        self.lists().pending.push_back(payload);
        self.available.notify_one();
        Ok(())
    }

    async fn move_next(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register interest before checking so a push in between is not missed.
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.try_move() {
                return Ok(Some(payload));
            }
            if timeout_at(deadline, notified).await.is_err() {
                return Ok(self.try_move());
            }
        }
    }

    async fn remove_in_flight(&self, payload: &str) -> Result<(), QueueError> {
        let mut lists = self.lists();
        if let Some(pos) = lists.in_flight.iter().position(|p| p == payload) {
            lists.in_flight.remove(pos);
        }
        Ok(())
    }

    async fn pending_depth(&self) -> Result<usize, QueueError> {
        Ok(self.lists().pending.len())
    }

    async fn in_flight_depth(&self) -> Result<usize, QueueError> {
        Ok(self.lists().in_flight.len())
    }

    async fn peek_in_flight(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        Ok(self.lists().in_flight.iter().take(limit).cloned().collect())
    }
}
