//! Request, result and diagnostics types for a single review run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{PipelineError, Result};
use crate::types::paper::{PaperRecord, SourceKind};

/// Language used when a request does not name one
pub const DEFAULT_LANGUAGE: &str = "English";

/// Citation rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationStyle {
    Raw,
    Bibtex,
    Apa7,
}

impl CitationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationStyle::Raw => "raw",
            CitationStyle::Bibtex => "bibtex",
            CitationStyle::Apa7 => "apa7",
        }
    }
}

impl Default for CitationStyle {
    fn default() -> Self {
        CitationStyle::Apa7
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CitationStyle {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(CitationStyle::Raw),
            "bibtex" | "bib" => Ok(CitationStyle::Bibtex),
            "apa7" | "apa" => Ok(CitationStyle::Apa7),
            other => Err(PipelineError::Config(format!(
                "Unsupported citation style: {}",
                other
            ))),
        }
    }
}

/// A review request; immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    topic: String,
    citation_format: CitationStyle,
    language: String,
}

impl ReviewRequest {
    /// Build a request in the default language
    pub fn new(topic: impl Into<String>, citation_format: CitationStyle) -> Result<Self> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "Topic must not be empty".to_string(),
            ));
        }

        Ok(Self {
            topic,
            citation_format,
            language: DEFAULT_LANGUAGE.to_string(),
        })
    }

    /// Replace the target language; blank input keeps the current one
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into().trim().to_string();
        if !language.is_empty() {
            self.language = language;
        }
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn citation_format(&self) -> CitationStyle {
        self.citation_format
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

/// A paper with its citation key and position in merged retrieval order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitedPaper {
    pub key: String,
    pub ordinal: usize,
    pub paper: PaperRecord,
}

/// One selected context entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPaper {
    pub cited: CitedPaper,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Top-k papers, descending by score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedContext {
    pub entries: Vec<RankedPaper>,
}

impl RankedContext {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.cited.key.as_str()).collect()
    }

    pub fn find(&self, key: &str) -> Option<&CitedPaper> {
        self.entries
            .iter()
            .map(|e| &e.cited)
            .find(|c| c.key == key)
    }
}

/// A rendered reference-list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub key: String,
    /// Identity of the cited paper
    pub paper_id: String,
    pub style: CitationStyle,
    pub rendered: String,
}

/// A source that was skipped for this request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: SourceKind,
    pub reason: String,
}

/// Key and score of a context entry, for grounding audits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub key: String,
    pub paper_id: String,
    pub score: f32,
}

/// Everything absorbed instead of failing the request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Records each source returned after validation
    pub per_source: BTreeMap<SourceKind, usize>,
    pub source_failures: Vec<SourceFailure>,
    /// Raw records refused for lacking both DOI and title
    pub rejected_records: usize,
    /// Records folded into an earlier duplicate
    pub duplicates_merged: usize,
    /// Papers left out of indexing for lacking an abstract
    pub missing_abstracts: usize,
    /// Ids of papers whose embedding failed
    pub embedding_failures: Vec<String>,
    /// Marker tokens in the text that match no context key
    pub unknown_markers: Vec<String>,
    pub citation_issues: Vec<String>,
    pub context: Vec<ContextSummary>,
}

impl Diagnostics {
    pub fn total_retrieved(&self) -> usize {
        self.per_source.values().sum()
    }
}

/// Output of one successful review run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub run_id: Uuid,
    pub topic: String,
    pub language: String,
    pub citation_format: CitationStyle,
    /// Generated text with inline citation markers
    pub text: String,
    /// One entry per distinct cited paper, in order of first appearance
    pub citations: Vec<Citation>,
    pub diagnostics: Diagnostics,
    pub generated_at: DateTime<Utc>,
}
