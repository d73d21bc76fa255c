// src/fetcher.rs
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::job_metadata::MetadataRecord;

/// Classified fetch failure. None of these are retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("unparsable response: {0}")]
    Unparsable(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Network(_) => "network",
            FetchError::Status(_) => "status",
            FetchError::Unparsable(_) => "unparsable",
        }
    }
}

/// Turns a URL into a metadata record. Implementations must be one-shot;
/// the pool bounds each call with its own timeout and drops the future
/// when it expires.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<MetadataRecord, FetchError>;
}

const USER_AGENT: &str = concat!("unfurler/", env!("CARGO_PKG_VERSION"));

/// Fetches a page over HTTP and reads its `<title>` and OpenGraph tags.
pub struct HttpFetcher {
    client: reqwest::Client,
    meta_tag: Regex,
    attr: Regex,
    title: Regex,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            meta_tag: Regex::new(r"(?is)<meta\s[^>]*>")?,
            attr: Regex::new(r#"(?is)([a-z:_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
            title: Regex::new(r"(?is)<title[^>]*>(.*?)</title>")?,
        })
    }

    pub fn parse_html(&self, html: &str) -> MetadataRecord {
        let mut record = MetadataRecord::default();
        let mut plain_description = None;

        for tag in self.meta_tag.find_iter(html) {
            let mut key = None;
            let mut content = None;
            for cap in self.attr.captures_iter(tag.as_str()) {
                let value = cap
                    .get(2)
                    .or_else(|| cap.get(3))
                    .map(|m| m.as_str().trim().to_string());
                match cap[1].to_ascii_lowercase().as_str() {
                    "property" | "name" => key = value.map(|v| v.to_ascii_lowercase()),
                    "content" => content = value,
                    _ => {}
                }
            }

            let (Some(key), Some(content)) = (key, content) else {
                continue;
            };
            if content.is_empty() {
                continue;
            }

            let slot = match key.as_str() {
                "og:title" | "twitter:title" => &mut record.title,
                "og:description" | "twitter:description" => &mut record.description,
                "og:image" | "twitter:image" => &mut record.image,
                "og:site_name" => &mut record.site_name,
                "og:url" => &mut record.canonical_url,
                "og:type" => &mut record.kind,
                "description" => &mut plain_description,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(content);
            }
        }

        if record.description.is_none() {
            record.description = plain_description;
        }
        if record.title.is_none() {
            record.title = self
                .title
                .captures(html)
                .map(|c| c[1].split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|t| !t.is_empty());
        }
        record
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<MetadataRecord, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.contains("html") {
            return Err(FetchError::Unparsable(format!(
                "content type {content_type:?} is not HTML"
            )));
        }

        let body = response.text().await.map_err(classify)?;
        let record = self.parse_html(&body);
        if record.is_empty() {
            return Err(FetchError::Unparsable("no metadata found".into()));
        }
        Ok(record)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() {
        FetchError::Unparsable(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn reads_opengraph_tags() {
        let html = r#"<html><head>
            <title>Fallback</title>
            <meta property="og:title" content="Hello World">
            <meta content='An example page' property='og:description' />
            <meta property="og:image" content="https://example.com/a.png">
            <meta property="og:site_name" content="Example">
            </head></html>"#;
        let record = fetcher().parse_html(html);
        assert_eq!(record.title.as_deref(), Some("Hello World"));
        assert_eq!(record.description.as_deref(), Some("An example page"));
        assert_eq!(record.image.as_deref(), Some("https://example.com/a.png"));
        assert_eq!(record.site_name.as_deref(), Some("Example"));
    }

    #[test]
    fn falls_back_to_title_and_description() {
        let html = "<HTML><TITLE>\n  Plain   page \n</TITLE>\
            <meta name=\"description\" content=\"Just text\"></HTML>";
        let record = fetcher().parse_html(html);
        assert_eq!(record.title.as_deref(), Some("Plain page"));
        assert_eq!(record.description.as_deref(), Some("Just text"));
    }

    #[test]
    fn bare_document_is_empty() {
        assert!(fetcher().parse_html("<html><body>hi</body></html>").is_empty());
    }

    #[test]
    fn error_kinds() {
        assert_eq!(FetchError::Timeout.kind(), "timeout");
        assert_eq!(FetchError::Status(404).to_string(), "unexpected HTTP status 404");
    }
}
