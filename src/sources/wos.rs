//! Clarivate Web of Science Expanded API source
//!
//! WoS JSON is converted from XML: a repeated element with a single
//! occurrence arrives as an object instead of a one-element array, and
//! numbers sometimes arrive as strings. The parser walks `serde_json::Value`
//! and accepts both shapes.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::text::{clean_abstract, collapse_whitespace, unescape_html};
use super::{build_client, fetch_json, PaperSource};
use crate::errors::{Result, SourceError};
use crate::types::{Author, RawRecord, SourceKind};

/// Default Web of Science endpoint
pub const WOS_URL: &str = "https://api.clarivate.com/api/wos";

/// Object-or-array as a list
fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(as_text).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}

fn pointer_text(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(as_text)
}

/// Pick the "item" title, falling back to the first one present
fn parse_title(summary: &Value, title_type: &str) -> Option<String> {
    let titles = summary.pointer("/titles/title").map(as_list).unwrap_or_default();
    titles
        .iter()
        .find(|t| t.get("type").and_then(Value::as_str) == Some(title_type))
        .and_then(|t| t.get("content").and_then(as_text))
        .or_else(|| {
            if title_type == "item" {
                titles
                    .iter()
                    .find_map(|t| t.get("content").and_then(as_text))
            } else {
                None
            }
        })
}

fn parse_doi(record: &Value) -> Option<String> {
    let identifiers = record
        .pointer("/dynamic_data/cluster_related/identifiers/identifier")
        .map(as_list)
        .unwrap_or_default();

    identifiers.iter().find_map(|id| {
        let kind = id.get("type").and_then(Value::as_str)?.to_lowercase();
        if kind == "doi" || kind == "xref_doi" {
            id.get("value").and_then(as_text)
        } else {
            None
        }
    })
}

fn parse_authors(summary: &Value) -> Vec<Author> {
    summary
        .pointer("/names/name")
        .map(as_list)
        .unwrap_or_default()
        .into_iter()
        .filter(|n| n.get("role").and_then(Value::as_str).map_or(true, |r| r == "author"))
        .filter_map(|n| {
            let last = n.get("last_name").and_then(as_text);
            let first = n.get("first_name").and_then(as_text);
            match last {
                Some(last) if !last.trim().is_empty() => Some(Author::new(last.trim(), first)),
                _ => n
                    .get("display_name")
                    .or_else(|| n.get("full_name"))
                    .and_then(as_text)
                    .and_then(|name| Author::parse(&name)),
            }
        })
        .collect()
}

fn parse_abstract(record: &Value) -> Option<String> {
    let abstracts = record
        .pointer("/static_data/fullrecord_metadata/abstracts/abstract")
        .map(as_list)
        .unwrap_or_default();

    abstracts
        .iter()
        .find_map(|a| a.pointer("/abstract_text/p").and_then(as_text))
        .map(|p| clean_abstract(&p))
}

fn parse_record(record: &Value) -> RawRecord {
    let summary = record.pointer("/static_data/summary").unwrap_or(&Value::Null);

    RawRecord {
        native_id: record.get("UID").and_then(as_text),
        doi: parse_doi(record),
        title: parse_title(summary, "item").map(|t| collapse_whitespace(&unescape_html(&t))),
        authors: parse_authors(summary),
        year: pointer_text(summary, "/pub_info/pubyear").and_then(|y| y.trim().parse().ok()),
        venue: parse_title(summary, "source"),
        abstract_text: parse_abstract(record),
    }
}

fn parse_response(body: &Value) -> Vec<RawRecord> {
    body.pointer("/Data/Records/records/REC")
        .map(as_list)
        .unwrap_or_default()
        .into_iter()
        .map(parse_record)
        .collect()
}

/// Web of Science search client
pub struct WosSource {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl WosSource {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Self::with_base_url(WOS_URL, api_key, timeout)
    }

    pub fn with_base_url(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(&format!("litbuddy/{}", crate::VERSION), timeout)?,
            base_url: base_url.to_string(),
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl PaperSource for WosSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Wos
    }

    async fn search(&self, topic: &str, limit: usize) -> std::result::Result<Vec<RawRecord>, SourceError> {
        // WoS caps a page at 100 records
        let count = limit.clamp(1, 100).to_string();
        let query = format!("TS=({})", topic);
        let request = self
            .client
            .get(&self.base_url)
            .header("X-ApiKey", &self.api_key)
            .query(&[
                ("databaseId", "WOK"),
                ("usrQuery", query.as_str()),
                ("count", count.as_str()),
                ("firstRecord", "1"),
            ]);

        let body: Value = fetch_json(SourceKind::Wos, request, self.timeout).await?;
        Ok(parse_response(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "Data": {"Records": {"records": {"REC": [{
                "UID": "WOS:000900000000001",
                "static_data": {
                    "summary": {
                        "titles": {"title": [
                            {"type": "source", "content": "COMPUTERS & EDUCATION"},
                            {"type": "item", "content": "Feedback from  large language models"}
                        ]},
                        "pub_info": {"pubyear": 2022},
                        "names": {"name": [
                            {"role": "author", "last_name": "Garcia", "first_name": "Luis"},
                            {"role": "book_editor", "last_name": "Editor"},
                            {"role": "author", "display_name": "Okafor, Chidi"}
                        ]}
                    },
                    "fullrecord_metadata": {"abstracts": {"abstract": {
                        "abstract_text": {"p": ["First paragraph.", "Second &amp; last."]}
                    }}}
                },
                "dynamic_data": {"cluster_related": {"identifiers": {"identifier":
                    {"type": "doi", "value": "10.1234/WOS.1"}
                }}}
            }]}}}
        })
    }

    #[test]
    fn test_parse_record() {
        let records = parse_response(&sample());
        assert_eq!(records.len(), 1);

        let raw = &records[0];
        assert_eq!(raw.native_id.as_deref(), Some("WOS:000900000000001"));
        assert_eq!(raw.title.as_deref(), Some("Feedback from large language models"));
        assert_eq!(raw.venue.as_deref(), Some("COMPUTERS & EDUCATION"));
        assert_eq!(raw.doi.as_deref(), Some("10.1234/WOS.1"));
        assert_eq!(raw.year, Some(2022));
        assert_eq!(
            raw.authors,
            vec![
                Author::new("Garcia", Some("Luis".to_string())),
                Author::new("Okafor", Some("Chidi".to_string())),
            ]
        );
        assert_eq!(raw.abstract_text.as_deref(), Some("First paragraph. Second & last."));
    }

    #[test]
    fn test_single_record_object() {
        let body = json!({"Data": {"Records": {"records": {"REC": {
            "UID": "WOS:1",
            "static_data": {"summary": {"pub_info": {"pubyear": "2019"}}}
        }}}}});
        let records = parse_response(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year, Some(2019));
        assert!(records[0].title.is_none());
    }

    #[test]
    fn test_empty_records_string() {
        let body = json!({"Data": {"Records": {"records": ""}}});
        assert!(parse_response(&body).is_empty());
    }
}
