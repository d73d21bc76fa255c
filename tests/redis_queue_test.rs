//! Redis-backed queue tests.
//!
//! These need a live Redis server and are ignored by default:
//!
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 cargo test --test redis_queue_test -- --ignored
//! ```
//!
//! Each test uses its own key prefix so runs never share lists.

use std::time::{Duration, Instant};

use unfurler::{JobQueue, LinkJob, QueueError, RedisQueue};

async fn setup_queue(test: &str) -> RedisQueue {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let prefix = format!("unfurl-test:{test}:{}", nanoid::nanoid!(6));
    RedisQueue::connect(&redis_url, &prefix)
        .await
        .expect("Failed to connect to Redis")
}

fn job(link: &str) -> LinkJob {
    LinkJob::new("post-1", link, format!("https://example.com/{link}")).unwrap()
}

#[tokio::test]
#[ignore]
async fn fifo_admission_and_move_to_in_flight() {
    let queue = setup_queue("fifo").await;
    for link in ["J1", "J2", "J3"] {
        queue.enqueue(&job(link)).await.unwrap();
    }
    assert_eq!(queue.pending_depth().await.unwrap(), 3);

    let mut deliveries = Vec::new();
    for _ in 0..3 {
        deliveries.push(queue.dequeue(Duration::from_secs(1)).await.unwrap().unwrap());
    }
    let links: Vec<&str> = deliveries.iter().map(|d| d.job.link_id()).collect();
    assert_eq!(links, ["J1", "J2", "J3"]);
    assert_eq!(queue.pending_depth().await.unwrap(), 0);
    assert_eq!(queue.in_flight_depth().await.unwrap(), 3);

    for delivery in &deliveries {
        queue.acknowledge(delivery).await.unwrap();
    }
    assert_eq!(queue.in_flight_depth().await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn acknowledge_twice_is_a_no_op() {
    let queue = setup_queue("ack").await;
    queue.enqueue(&job("A")).await.unwrap();
    queue.enqueue(&job("B")).await.unwrap();
    let a = queue.dequeue(Duration::ZERO).await.unwrap().unwrap();
    let b = queue.dequeue(Duration::ZERO).await.unwrap().unwrap();

    queue.acknowledge(&a).await.unwrap();
    queue.acknowledge(&a).await.unwrap();
    assert_eq!(queue.peek_in_flight(10).await.unwrap(), vec![b.payload.clone()]);
    queue.acknowledge(&b).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn empty_dequeue_times_out_with_no_job() {
    let queue = setup_queue("empty").await;
    let started = Instant::now();
    assert!(queue.dequeue(Duration::from_millis(200)).await.unwrap().is_none());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
#[ignore]
async fn malformed_entry_is_removed_from_in_flight() {
    let queue = setup_queue("poison").await;
    queue.push("not json".to_string()).await.unwrap();

    let err = queue.dequeue(Duration::from_millis(200)).await.unwrap_err();
    assert!(matches!(err, QueueError::Poisoned { .. }));
    assert_eq!(queue.in_flight_depth().await.unwrap(), 0);
}
