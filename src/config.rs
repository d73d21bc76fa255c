use std::time::Duration;

use thiserror::Error;

use crate::utils::constants::{
    DEFAULT_EVENTS_CHANNEL, DEFAULT_FETCH_TIMEOUT, DEFAULT_KEY_PREFIX, DEFAULT_POLL_TIMEOUT,
    DEFAULT_REDIS_URL, DEFAULT_WORKERS, MIN_POLL_TIMEOUT,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Immutable worker pool settings, fixed when the pool starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub poll_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl PoolConfig {
    /// A worker count of zero falls back to the default.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { DEFAULT_WORKERS } else { workers };
        self
    }

    /// Signed variant for user input: any non-positive count uses the default.
    pub fn with_requested_workers(self, requested: i64) -> Self {
        self.with_workers(usize::try_from(requested).unwrap_or(0))
    }

    /// Never below `MIN_POLL_TIMEOUT`. A zero timeout would turn every idle
    /// worker into a non-blocking poll loop.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout.max(MIN_POLL_TIMEOUT);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

impl BasicAuthConfig {
    /// Parses `user:password`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (username, password) = raw.split_once(':')?;
        if username.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Process-level settings loaded from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub redis_url: String,
    pub key_prefix: String,
    pub events_channel: String,
    pub pool: PoolConfig,
    pub basic_auth: Option<BasicAuthConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            events_channel: DEFAULT_EVENTS_CHANNEL.to_string(),
            pool: PoolConfig::default(),
            basic_auth: None,
        }
    }
}

impl Settings {
    /// | Variable | Default |
    /// |----------|---------|
    /// | `REDIS_URL` | `redis://127.0.0.1:6379` |
    /// | `UNFURL_KEY_PREFIX` | `unfurl` |
    /// | `UNFURL_EVENTS_CHANNEL` | `unfurl:events` |
    /// | `UNFURL_WORKERS` | `3`, also for values `<= 0` |
    /// | `UNFURL_POLL_TIMEOUT_SECS` | `5`, must be positive |
    /// | `UNFURL_FETCH_TIMEOUT_SECS` | `30` |
    /// | `UNFURL_BASIC_AUTH` | unset, `user:password` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut pool = defaults.pool.clone();
        if let Some(workers) = parse_var::<_, i64>(&lookup, "UNFURL_WORKERS")? {
            pool = pool.with_requested_workers(workers);
        }
        match parse_var::<_, u64>(&lookup, "UNFURL_POLL_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: "UNFURL_POLL_TIMEOUT_SECS",
                    value: "0".to_string(),
                })
            }
            Some(secs) => pool = pool.with_poll_timeout(Duration::from_secs(secs)),
            None => {}
        }
        if let Some(secs) = parse_var(&lookup, "UNFURL_FETCH_TIMEOUT_SECS")? {
            pool = pool.with_fetch_timeout(Duration::from_secs(secs));
        }

        let basic_auth = match lookup("UNFURL_BASIC_AUTH") {
            Some(raw) => Some(BasicAuthConfig::parse(&raw).ok_or(ConfigError::Invalid {
                key: "UNFURL_BASIC_AUTH",
                value: "<redacted>".to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            key_prefix: lookup("UNFURL_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            events_channel: lookup("UNFURL_EVENTS_CHANNEL").unwrap_or(defaults.events_channel),
            pool,
            basic_auth,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(s.pool, PoolConfig::default());
        assert_eq!(s.pool.workers, 3);
        assert_eq!(s.pool.poll_timeout, Duration::from_secs(5));
        assert_eq!(s.pool.fetch_timeout, Duration::from_secs(30));
        assert!(s.basic_auth.is_none());
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("UNFURL_WORKERS", "8"),
            ("UNFURL_POLL_TIMEOUT_SECS", "2"),
            ("UNFURL_KEY_PREFIX", "links"),
            ("UNFURL_BASIC_AUTH", "ops:s3cret:x"),
        ])
        .unwrap();
        assert_eq!(s.pool.workers, 8);
        assert_eq!(s.pool.poll_timeout, Duration::from_secs(2));
        assert_eq!(s.key_prefix, "links");
        let auth = s.basic_auth.unwrap();
        assert_eq!(auth.username, "ops");
        assert_eq!(auth.password, "s3cret:x");
    }

    #[test]
    fn zero_workers_falls_back_to_default() {
        let s = settings(&[("UNFURL_WORKERS", "0")]).unwrap();
        assert_eq!(s.pool.workers, 3);
    }

    #[test]
    fn negative_workers_fall_back_to_default() {
        let s = settings(&[("UNFURL_WORKERS", "-2")]).unwrap();
        assert_eq!(s.pool.workers, 3);
        assert_eq!(PoolConfig::default().with_requested_workers(i64::MIN).workers, 3);
        assert_eq!(PoolConfig::default().with_requested_workers(7).workers, 7);
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err = settings(&[("UNFURL_WORKERS", "three")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "UNFURL_WORKERS",
                value: "three".into()
            }
        );
    }

    #[test]
    fn rejects_zero_poll_timeout() {
        let err = settings(&[("UNFURL_POLL_TIMEOUT_SECS", "0")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "UNFURL_POLL_TIMEOUT_SECS",
                value: "0".into()
            }
        );
    }

    #[test]
    fn poll_timeout_has_a_floor() {
        let pool = PoolConfig::default().with_poll_timeout(Duration::ZERO);
        assert_eq!(pool.poll_timeout, MIN_POLL_TIMEOUT);

        let pool = PoolConfig::default().with_poll_timeout(Duration::from_secs(2));
        assert_eq!(pool.poll_timeout, Duration::from_secs(2));
    }
}
