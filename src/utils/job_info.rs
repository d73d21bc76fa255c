// src/utils/job_info.rs
use serde::Serialize;

use crate::job::LinkJob;

/// Flat, operator-facing view of one queue entry.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: String,
    pub content_id: String,
    pub link_id: String,
    pub url: String,
    pub created_at: String,
}

impl JobInfo {
    /// Entries that fail to decode are still listed, with the raw payload in `url`.
    pub fn from_payload(payload: &str) -> Self {
        match LinkJob::from_payload(payload) {
            Ok(job) => Self {
                id: job.id().to_string(),
                content_id: job.content_id().to_string(),
                link_id: job.link_id().to_string(),
                url: job.url().to_string(),
                created_at: job.created_at().to_rfc3339(),
            },
            Err(_) => Self {
                id: "malformed".to_string(),
                content_id: String::new(),
                link_id: String::new(),
                url: payload.to_string(),
                created_at: String::new(),
            },
        }
    }
}

pub fn to_csv(jobs: &[JobInfo]) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for job in jobs {
        wtr.serialize(job)?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("csv flush failed: {}", e.error()))
}
