// src/redis_pool.rs
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, Client};
use tracing::{debug, trace};

use crate::queue::{JobQueue, QueueError};
use crate::utils::constants::{SUFFIX_IN_FLIGHT, SUFFIX_PENDING};

pub async fn get_redis_conn(client: &Client) -> redis::RedisResult<MultiplexedConnection> {
    // Client::open will auto-handle rediss:// if TLS feature is enabled
    client.get_multiplexed_async_connection().await
}

pub fn pending_key(prefix: &str) -> String {
    format!("{prefix}:{SUFFIX_PENDING}")
}

pub fn in_flight_key(prefix: &str) -> String {
    format!("{prefix}:{SUFFIX_IN_FLIGHT}")
}

/// Redis-backed queue: pending and in-flight are two lists, and a dequeue is
/// a single `BLMOVE` from one to the other.
pub struct RedisQueue {
    client: Client,
    conn: MultiplexedConnection,
    // Blocking moves hold a connection for up to the poll timeout, so they
    // never share the multiplexed connection used for everything else.
    blocking: Mutex<Vec<MultiplexedConnection>>,
    pending: String,
    in_flight: String,
}

impl RedisQueue {
    pub async fn connect(redis_url: &str, prefix: &str) -> Result<Self, QueueError> {
        let client = Client::open(redis_url)?;
        Self::new(client, prefix).await
    }

    pub async fn new(client: Client, prefix: &str) -> Result<Self, QueueError> {
        let conn = get_redis_conn(&client).await?;
        debug!(prefix, "Connected Redis queue");
        Ok(Self {
            client,
            conn,
            blocking: Mutex::new(Vec::new()),
            pending: pending_key(prefix),
            in_flight: in_flight_key(prefix),
        })
    }

    async fn checkout_blocking(&self) -> redis::RedisResult<MultiplexedConnection> {
        let idle = self
            .blocking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match idle {
            Some(conn) => Ok(conn),
            None => get_redis_conn(&self.client).await,
        }
    }

    fn checkin_blocking(&self, conn: MultiplexedConnection) {
        self.blocking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn push(&self, payload: String) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("RPUSH")
            .arg(&self.pending)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn move_next(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        // BLMOVE with a zero timeout blocks forever, so an empty wait uses LMOVE.
        if timeout.is_zero() {
            let mut conn = self.conn.clone();
            let payload: Option<String> = redis::cmd("LMOVE")
                .arg(&self.pending)
                .arg(&self.in_flight)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;
            return Ok(payload);
        }

        let mut conn = self.checkout_blocking().await?;
        let payload: Option<String> = redis::cmd("BLMOVE")
            .arg(&self.pending)
            .arg(&self.in_flight)
            .arg("LEFT")
            .arg("RIGHT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;
        self.checkin_blocking(conn);

        if payload.is_none() {
            trace!(queue = %self.pending, "BLMOVE timed out");
        }
        Ok(payload)
    }

    async fn remove_in_flight(&self, payload: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("LREM")
            .arg(&self.in_flight)
            .arg(1)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        if removed == 0 {
            debug!(queue = %self.in_flight, "Entry already absent from in-flight");
        }
        Ok(())
    }

    async fn pending_depth(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let len: usize = redis::cmd("LLEN")
            .arg(&self.pending)
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }

    async fn in_flight_depth(&self) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        let len: usize = redis::cmd("LLEN")
            .arg(&self.in_flight)
            .query_async(&mut conn)
            .await?;
        Ok(len)
    }

    async fn peek_in_flight(&self, limit: usize) -> Result<Vec<String>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let entries: Vec<String> = redis::cmd("LRANGE")
            .arg(&self.in_flight)
            .arg(0)
            .arg(lrange_stop(limit))
            .query_async(&mut conn)
            .await?;
        Ok(entries)
    }
}

/// Inclusive LRANGE stop index for the first `limit` entries. Limits past
/// `i64::MAX` saturate, so the range never wraps to a negative index.
fn lrange_stop(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX).saturating_sub(1)
}
