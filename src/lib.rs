//! # unfurler
//!
//! Link-metadata enrichment queue. Producers enqueue one [`LinkJob`] per link
//! found in user content; a [`WorkerPool`] pulls jobs from a durable
//! [`JobQueue`], fetches metadata, persists it and notifies live sessions.
//!
//! Delivery is at-least-once up to the fetch: a job stays in the in-flight
//! list from dequeue until acknowledge. Every processed job is acknowledged,
//! whether its fetch, persist or publish step succeeded or not.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use unfurler::*;
//!
//! let queue: Arc<dyn JobQueue> = Arc::new(RedisQueue::connect("redis://127.0.0.1/", "unfurl").await?);
//! queue.enqueue(&LinkJob::new("post-42", "link-7", "https://example.com/a")?).await?;
//!
//! let controller = WorkerPool::new(queue, fetcher, persister, publisher)
//!     .with_config(PoolConfig::default().with_workers(4))
//!     .start();
//!
//! // ...
//! controller.stop().await;
//! ```

pub mod basic_auth;
pub mod config;
pub mod fetcher;
pub mod job;
pub mod job_metadata;
pub mod logging;
pub mod memory_queue;
pub mod persister;
pub mod publisher;
pub mod queue;
pub mod redis_pool;
pub mod routes;
pub mod runner;
pub mod services;
pub mod utils;

pub use config::{BasicAuthConfig, ConfigError, PoolConfig, Settings};
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use job::{Delivery, JobError, LinkJob};
pub use job_metadata::{MetadataRecord, MetadataUpdated};
pub use memory_queue::MemoryQueue;
pub use persister::{Persister, RedisPersister};
pub use publisher::{BroadcastPublisher, Publisher, RedisPublisher};
pub use queue::{JobQueue, QueueError};
pub use redis_pool::RedisQueue;
pub use runner::{JobOutcome, PoolController, WorkerPool};
