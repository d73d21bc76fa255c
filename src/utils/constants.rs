use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);
pub const MIN_POLL_TIMEOUT: Duration = Duration::from_millis(10);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const TRANSPORT_BACKOFF: Duration = Duration::from_secs(1);

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_KEY_PREFIX: &str = "unfurl";
pub const DEFAULT_EVENTS_CHANNEL: &str = "unfurl:events";

pub const SUFFIX_PENDING: &str = "pending";
pub const SUFFIX_IN_FLIGHT: &str = "in_flight";
pub const SUFFIX_METADATA: &str = "metadata";

pub const JOB_ID_LEN: usize = 10;
pub const DEFAULT_LIMIT: usize = 20;

pub const METADATA_UPDATED_EVENT: &str = "metadata_updated";
