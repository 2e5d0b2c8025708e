//! Elsevier Scopus Search API source

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::text::{clean_abstract, collapse_whitespace, unescape_html};
use super::{build_client, fetch_json, PaperSource};
use crate::errors::{Result, SourceError};
use crate::types::{Author, RawRecord, SourceKind};

/// Default Scopus search endpoint
pub const SCOPUS_URL: &str = "https://api.elsevier.com/content/search/scopus";

#[derive(Debug, Deserialize)]
struct ScopusResponse {
    #[serde(rename = "search-results", default)]
    search_results: ScopusResults,
}

#[derive(Debug, Default, Deserialize)]
struct ScopusResults {
    #[serde(default)]
    entry: Vec<ScopusEntry>,
}

#[derive(Debug, Deserialize)]
struct ScopusEntry {
    /// Present on the single placeholder entry of an empty result set
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "dc:identifier", default)]
    identifier: Option<String>,
    #[serde(rename = "dc:title", default)]
    title: Option<String>,
    #[serde(rename = "prism:doi", default)]
    doi: Option<String>,
    #[serde(rename = "dc:description", default)]
    description: Option<String>,
    #[serde(rename = "prism:coverDate", default)]
    cover_date: Option<String>,
    #[serde(rename = "dc:creator", default)]
    creator: Option<String>,
    #[serde(rename = "prism:publicationName", default)]
    publication_name: Option<String>,
}

impl ScopusEntry {
    fn into_raw(self) -> RawRecord {
        let year = self
            .cover_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());

        RawRecord {
            native_id: self
                .identifier
                .map(|id| id.trim_start_matches("SCOPUS_ID:").to_string()),
            doi: self.doi,
            title: self.title.as_deref().map(|t| collapse_whitespace(&unescape_html(t))),
            authors: self.creator.as_deref().and_then(Author::parse).into_iter().collect(),
            year,
            venue: self.publication_name,
            abstract_text: self.description.as_deref().map(clean_abstract),
        }
    }
}

/// Scopus search client
pub struct ScopusSource {
    client: Client,
    base_url: String,
    api_key: String,
    insttoken: Option<String>,
    timeout: Duration,
}

impl ScopusSource {
    pub fn new(api_key: String, insttoken: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(SCOPUS_URL, api_key, insttoken, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: String,
        insttoken: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(&format!("litbuddy/{}", crate::VERSION), timeout)?,
            base_url: base_url.to_string(),
            api_key,
            insttoken,
            timeout,
        })
    }
}

#[async_trait]
impl PaperSource for ScopusSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Scopus
    }

    async fn search(&self, topic: &str, limit: usize) -> std::result::Result<Vec<RawRecord>, SourceError> {
        let mut request = self
            .client
            .get(&self.base_url)
            .header("X-ELS-APIKey", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("query", topic), ("count", limit.to_string().as_str())]);
        if let Some(token) = &self.insttoken {
            request = request.header("X-ELS-Insttoken", token);
        }

        let response: ScopusResponse = fetch_json(SourceKind::Scopus, request, self.timeout).await?;
        Ok(response
            .search_results
            .entry
            .into_iter()
            .filter(|e| e.error.is_none())
            .map(ScopusEntry::into_raw)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        let json = serde_json::json!({
            "search-results": {
                "entry": [{
                    "dc:identifier": "SCOPUS_ID:85100000000",
                    "dc:title": "Automated essay scoring with LLMs",
                    "prism:doi": "10.1000/aes",
                    "dc:description": "We study &lt;b&gt;scoring&lt;/b&gt;.",
                    "prism:coverDate": "2024-02-01",
                    "dc:creator": "Nguyen, T.",
                    "prism:publicationName": "Assessing Writing"
                }]
            }
        });

        let response: ScopusResponse = serde_json::from_value(json).unwrap();
        let raw = response.search_results.entry.into_iter().next().unwrap().into_raw();

        assert_eq!(raw.native_id.as_deref(), Some("85100000000"));
        assert_eq!(raw.year, Some(2024));
        assert_eq!(raw.authors, vec![Author::new("Nguyen", Some("T.".to_string()))]);
        assert_eq!(raw.abstract_text.as_deref(), Some("We study scoring."));
        assert_eq!(raw.venue.as_deref(), Some("Assessing Writing"));
    }

    #[test]
    fn test_empty_result_placeholder_is_skipped() {
        let json = serde_json::json!({
            "search-results": {"entry": [{"@_fa": "true", "error": "Result set was empty"}]}
        });
        let response: ScopusResponse = serde_json::from_value(json).unwrap();
        let kept: Vec<_> = response
            .search_results
            .entry
            .into_iter()
            .filter(|e| e.error.is_none())
            .collect();
        assert!(kept.is_empty());
    }

    #[test]
    fn test_short_cover_date_has_no_year() {
        let entry: ScopusEntry = serde_json::from_value(serde_json::json!({
            "dc:title": "x",
            "prism:coverDate": "20"
        }))
        .unwrap();
        assert_eq!(entry.into_raw().year, None);
    }
}
