// src/publisher.rs
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::broadcast;
use tracing::trace;

use crate::job_metadata::MetadataUpdated;

/// Best-effort notification of live sessions. Callers log failures and move on.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &MetadataUpdated) -> anyhow::Result<()>;
}

/// Publishes events as JSON on a Redis pub/sub channel for the realtime layer.
pub struct RedisPublisher {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisPublisher {
    pub fn new(conn: MultiplexedConnection, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Publisher for RedisPublisher {
    async fn publish(&self, event: &MetadataUpdated) -> anyhow::Result<()> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        trace!(channel = %self.channel, receivers, "Published metadata event");
        Ok(())
    }
}

/// In-process fan-out over a broadcast channel.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<MetadataUpdated>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetadataUpdated> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl Publisher for BroadcastPublisher {
    async fn publish(&self, event: &MetadataUpdated) -> anyhow::Result<()> {
        // No live subscribers means nobody to notify, which is fine.
        if self.tx.send(event.clone()).is_err() {
            trace!(link_id = %event.link_id, "No subscribers for metadata event");
        }
        Ok(())
    }
}
