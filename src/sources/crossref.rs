//! Crossref Works API source
//!
//! - Endpoint: GET https://api.crossref.org/works
//! - No authentication; a `mailto` puts requests in the polite pool
//! - A bibliographic query that finds nothing is retried once as a plain query

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::text::clean_abstract;
use super::{build_client, fetch_json, PaperSource};
use crate::errors::{Result, SourceError};
use crate::types::{Author, RawRecord, SourceKind};

/// Default Crossref API endpoint
pub const CROSSREF_URL: &str = "https://api.crossref.org/works";

const SELECT_FIELDS: &str = "DOI,title,author,issued,published-print,container-title,abstract";

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    #[serde(default)]
    message: CrossrefMessage,
}

#[derive(Debug, Default, Deserialize)]
struct CrossrefMessage {
    #[serde(default)]
    items: Vec<CrossrefWork>,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
    #[serde(default)]
    author: Vec<CrossrefAuthor>,
    #[serde(default)]
    issued: Option<CrossrefDate>,
    #[serde(rename = "published-print", default)]
    published_print: Option<CrossrefDate>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
    /// Organisational authors carry only a name
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl CrossrefDate {
    fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

impl CrossrefWork {
    fn into_raw(self) -> RawRecord {
        let year = self
            .issued
            .as_ref()
            .and_then(CrossrefDate::year)
            .or_else(|| self.published_print.as_ref().and_then(CrossrefDate::year));

        let authors = self
            .author
            .into_iter()
            .filter_map(|a| match (a.family, a.name) {
                (Some(family), _) => Some(Author::new(family.trim(), a.given)),
                (None, Some(name)) => Some(Author::new(name.trim(), None)),
                (None, None) => None,
            })
            .collect();

        RawRecord {
            native_id: None,
            doi: self.doi,
            title: self.title.into_iter().next(),
            authors,
            year,
            venue: self.container_title.into_iter().next(),
            abstract_text: self.abstract_text.as_deref().map(clean_abstract),
        }
    }
}

/// Crossref search client
pub struct CrossrefSource {
    client: Client,
    base_url: String,
    mailto: Option<String>,
    timeout: Duration,
}

impl CrossrefSource {
    /// Create a client; `mailto` is sent both as a parameter and in the User-Agent
    pub fn new(mailto: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(CROSSREF_URL, mailto, timeout)
    }

    pub fn with_base_url(base_url: &str, mailto: Option<String>, timeout: Duration) -> Result<Self> {
        let user_agent = match &mailto {
            Some(email) => format!("litbuddy/{} (mailto:{})", crate::VERSION, email),
            None => format!("litbuddy/{}", crate::VERSION),
        };

        Ok(Self {
            client: build_client(&user_agent, timeout)?,
            base_url: base_url.to_string(),
            mailto,
            timeout,
        })
    }

    async fn query(
        &self,
        query_param: &str,
        topic: &str,
        limit: usize,
    ) -> std::result::Result<Vec<CrossrefWork>, SourceError> {
        let rows = limit.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            (query_param, topic),
            ("rows", rows.as_str()),
            ("select", SELECT_FIELDS),
        ];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.as_str()));
        }

        let request = self.client.get(&self.base_url).query(&params);
        let response: CrossrefResponse = fetch_json(SourceKind::Crossref, request, self.timeout).await?;
        Ok(response.message.items)
    }
}

#[async_trait]
impl PaperSource for CrossrefSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Crossref
    }

    async fn search(&self, topic: &str, limit: usize) -> std::result::Result<Vec<RawRecord>, SourceError> {
        let mut items = self.query("query.bibliographic", topic, limit).await?;
        if items.is_empty() {
            debug!("Crossref bibliographic query empty, retrying as plain query");
            items = self.query("query", topic, limit).await?;
        }

        Ok(items.into_iter().map(CrossrefWork::into_raw).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_work() {
        let json = serde_json::json!({
            "message": {
                "items": [{
                    "DOI": "10.1016/j.compedu.2023.104000",
                    "title": ["ChatGPT in assessment"],
                    "abstract": "<jats:p>Generative &amp; adaptive.</jats:p>",
                    "author": [
                        {"given": "Ana", "family": "Silva"},
                        {"name": "OECD"},
                        {"given": "Nobody"}
                    ],
                    "issued": {"date-parts": [[2023, 5]]},
                    "container-title": ["Computers & Education"]
                }]
            }
        });

        let response: CrossrefResponse = serde_json::from_value(json).unwrap();
        let raw = response.message.items.into_iter().next().unwrap().into_raw();

        assert_eq!(raw.doi.as_deref(), Some("10.1016/j.compedu.2023.104000"));
        assert_eq!(raw.title.as_deref(), Some("ChatGPT in assessment"));
        assert_eq!(raw.abstract_text.as_deref(), Some("Generative & adaptive."));
        assert_eq!(raw.year, Some(2023));
        assert_eq!(raw.authors.len(), 2);
        assert_eq!(raw.authors[1].family, "OECD");
        assert_eq!(raw.venue.as_deref(), Some("Computers & Education"));
    }

    #[test]
    fn test_year_falls_back_to_print_date() {
        let json = serde_json::json!({
            "title": ["x"],
            "issued": {"date-parts": [[null]]},
            "published-print": {"date-parts": [[2019, 1, 2]]}
        });
        let work: CrossrefWork = serde_json::from_value(json).unwrap();
        assert_eq!(work.into_raw().year, Some(2019));
    }

    #[test]
    fn test_empty_message_parses() {
        let response: CrossrefResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response.message.items.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_crossref_search_integration() {
        let source = CrossrefSource::new(None, Duration::from_secs(30)).unwrap();
        let records = source.search("transformer models", 3).await.unwrap();
        assert!(!records.is_empty());
    }
}
