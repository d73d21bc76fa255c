// src/persister.rs
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::job_metadata::MetadataRecord;
use crate::utils::constants::SUFFIX_METADATA;

/// System of record for fetched metadata. A later save for the same link
/// replaces the earlier one.
#[async_trait]
pub trait Persister: Send + Sync {
    async fn save(&self, link_id: &str, metadata: &MetadataRecord) -> anyhow::Result<()>;
}

pub fn metadata_key(prefix: &str, link_id: &str) -> String {
    format!("{prefix}:{SUFFIX_METADATA}:{link_id}")
}

/// Stores each record as a JSON string under `{prefix}:metadata:{link_id}`.
pub struct RedisPersister {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisPersister {
    pub fn new(conn: MultiplexedConnection, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    pub async fn load(&self, link_id: &str) -> anyhow::Result<Option<MetadataRecord>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(metadata_key(&self.prefix, link_id))
            .query_async(&mut conn)
            .await?;
        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }
}

#[async_trait]
impl Persister for RedisPersister {
    async fn save(&self, link_id: &str, metadata: &MetadataRecord) -> anyhow::Result<()> {
        let payload = serde_json::to_string(metadata)?;
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(metadata_key(&self.prefix, link_id))
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_key_format() {
        assert_eq!(metadata_key("unfurl", "L1"), "unfurl:metadata:L1");
    }
}
