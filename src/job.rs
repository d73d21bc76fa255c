// src/job.rs
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::constants::JOB_ID_LEN;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job url must not be empty")]
    EmptyUrl,

    #[error("failed to decode job payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One metadata-fetch request for a link embedded in user content.
///
/// Serialized as field-named JSON so producers can add optional fields
/// without breaking entries that are already queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkJob {
    #[serde(default)]
    id: String,
    content_id: String,
    link_id: String,
    url: String,
    created_at: DateTime<Utc>,
}

impl LinkJob {
    pub fn new(
        content_id: impl Into<String>,
        link_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, JobError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(JobError::EmptyUrl);
        }

        Ok(Self {
            id: nanoid!(JOB_ID_LEN),
            content_id: content_id.into(),
            link_id: link_id.into(),
            url,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a queue payload, rejecting entries that can never be processed.
    pub fn from_payload(payload: &str) -> Result<Self, JobError> {
        let job: LinkJob = serde_json::from_str(payload)?;
        if job.url.trim().is_empty() {
            return Err(JobError::EmptyUrl);
        }
        Ok(job)
    }
}

/// A job handed out by `dequeue`, together with the exact payload that sits
/// in the in-flight list. Acknowledge matches on the payload, not on a
/// re-encoding of `job`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub job: LinkJob,
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_url() {
        assert!(matches!(LinkJob::new("c1", "l1", "  "), Err(JobError::EmptyUrl)));
    }

    #[test]
    fn payload_round_trips_field_for_field() {
        let job = LinkJob::new("post-9", "L1", "https://example.com/a").unwrap();
        let payload = job.to_payload().unwrap();
        assert!(payload.contains("\"contentId\":\"post-9\""));
        assert!(payload.contains("\"linkId\":\"L1\""));
        assert_eq!(LinkJob::from_payload(&payload).unwrap(), job);
    }

    #[test]
    fn decode_ignores_unknown_fields_and_missing_id() {
        let payload = r#"{"contentId":"c","linkId":"l","url":"https://x.test",
            "createdAt":"2024-05-01T10:00:00Z","priority":7}"#;
        let job = LinkJob::from_payload(payload).unwrap();
        assert_eq!(job.id(), "");
        assert_eq!(job.url(), "https://x.test");
    }

    #[test]
    fn decode_rejects_empty_url_and_garbage() {
        let empty = r#"{"contentId":"c","linkId":"l","url":"","createdAt":"2024-05-01T10:00:00Z"}"#;
        assert!(matches!(LinkJob::from_payload(empty), Err(JobError::EmptyUrl)));
        assert!(matches!(LinkJob::from_payload("not json"), Err(JobError::Decode(_))));
    }

    #[test]
    fn ids_are_distinct_per_job() {
        let a = LinkJob::new("c", "l", "https://x.test").unwrap();
        let b = LinkJob::new("c", "l", "https://x.test").unwrap();
        assert_eq!(a.id().len(), JOB_ID_LEN);
        assert_ne!(a.id(), b.id());
    }
}
