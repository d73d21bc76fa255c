// src/job_metadata.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::constants::METADATA_UPDATED_EVENT;

/// Descriptive fields fetched for a link. Every field is optional; absent
/// fields are left out of the encoded form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Structured embed data (oEmbed and similar), passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
}

impl MetadataRecord {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.site_name.is_none()
            && self.canonical_url.is_none()
            && self.kind.is_none()
            && self.embed.is_none()
    }
}

/// Notification sent to live sessions once a record has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdated {
    pub event: String,
    pub content_id: String,
    pub link_id: String,
    pub metadata: MetadataRecord,
}

impl MetadataUpdated {
    pub fn new(
        content_id: impl Into<String>,
        link_id: impl Into<String>,
        metadata: MetadataRecord,
    ) -> Self {
        Self {
            event: METADATA_UPDATED_EVENT.to_string(),
            content_id: content_id.into(),
            link_id: link_id.into(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_not_encoded() {
        let json = serde_json::to_string(&MetadataRecord::with_title("A")).unwrap();
        assert_eq!(json, r#"{"title":"A"}"#);
    }

    #[test]
    fn event_payload_shape() {
        let event = MetadataUpdated::new("post-1", "L1", MetadataRecord::with_title("A"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "metadata_updated");
        assert_eq!(value["contentId"], "post-1");
        assert_eq!(value["linkId"], "L1");
        assert_eq!(value["metadata"]["title"], "A");
    }

    #[test]
    fn empty_record() {
        assert!(MetadataRecord::default().is_empty());
        assert!(!MetadataRecord::with_title("x").is_empty());
    }
}
