//! Paper metadata normalized across bibliographic sources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bibliographic source a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceKind {
    Crossref,
    Scopus,
    Wos,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Crossref => "CROSSREF",
            SourceKind::Scopus => "SCOPUS",
            SourceKind::Wos => "WOS",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One author, in publication order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Surname, or the full name of an organisational author
    pub family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
}

impl Author {
    pub fn new(family: impl Into<String>, given: Option<String>) -> Self {
        Self {
            family: family.into(),
            given: given.filter(|g| !g.trim().is_empty()),
        }
    }

    /// Parse a display name: "Surname, Given" or "Given Surname"
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return None;
        }

        if let Some((family, given)) = name.split_once(',') {
            let family = family.trim();
            if family.is_empty() {
                return None;
            }
            return Some(Self::new(family, Some(given.trim().to_string())));
        }

        match name.rsplit_once(' ') {
            Some((given, family)) => Some(Self::new(family, Some(given.to_string()))),
            None => Some(Self::new(name, None)),
        }
    }

    /// "Given Family", or just the family name
    pub fn display_name(&self) -> String {
        match &self.given {
            Some(given) => format!("{} {}", given, self.family),
            None => self.family.clone(),
        }
    }
}

/// Source-shaped record before validation and identity assignment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Identifier native to the source (Scopus id, WoS UID)
    pub native_id: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub abstract_text: Option<String>,
}

/// Why a raw record was refused at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingDoiAndTitle,
}

/// Normalized paper metadata, unique by `id` within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Stable identity: `doi:...`, `<source>:<native id>` or `title:...|year`
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub authors: Vec<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    pub source: SourceKind,
}

impl PaperRecord {
    /// Validate a raw record and derive its identity
    pub fn from_raw(raw: RawRecord, source: SourceKind) -> Result<Self, RejectReason> {
        let doi = raw.doi.as_deref().and_then(normalize_doi);
        let title = non_blank(raw.title);

        if doi.is_none() && title.is_none() {
            return Err(RejectReason::MissingDoiAndTitle);
        }

        let native_id = non_blank(raw.native_id);
        let id = match (&doi, &native_id, &title) {
            (Some(doi), _, _) => format!("doi:{}", doi),
            (None, Some(native), _) => format!("{}:{}", source.as_str().to_lowercase(), native),
            (None, None, Some(title)) => title_identity(title, raw.year),
            (None, None, None) => return Err(RejectReason::MissingDoiAndTitle),
        };

        Ok(Self {
            id,
            doi,
            title,
            authors: raw
                .authors
                .into_iter()
                .filter(|a| !a.family.trim().is_empty())
                .collect(),
            year: raw.year,
            venue: non_blank(raw.venue),
            abstract_text: non_blank(raw.abstract_text),
            source,
        })
    }

    /// Key used to detect the same publication across sources
    pub fn dedup_key(&self) -> String {
        self.doi_key()
            .or_else(|| self.title_key())
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn doi_key(&self) -> Option<String> {
        self.doi.as_ref().map(|doi| format!("doi:{}", doi))
    }

    /// Normalized title plus year
    pub fn title_key(&self) -> Option<String> {
        self.title.as_ref().map(|title| title_identity(title, self.year))
    }

    pub fn has_abstract(&self) -> bool {
        self.abstract_text
            .as_deref()
            .map(|a| !a.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn first_author(&self) -> Option<&Author> {
        self.authors.first()
    }

    /// Fill fields this record lacks from a duplicate of lower priority
    pub fn merge_missing(&mut self, other: &PaperRecord) {
        if self.doi.is_none() {
            if let Some(doi) = &other.doi {
                self.doi = Some(doi.clone());
                self.id = format!("doi:{}", doi);
            }
        }
        if self.title.is_none() {
            self.title = other.title.clone();
        }
        if self.authors.is_empty() {
            self.authors = other.authors.clone();
        }
        if self.year.is_none() {
            self.year = other.year;
        }
        if self.venue.is_none() {
            self.venue = other.venue.clone();
        }
        if !self.has_abstract() && other.has_abstract() {
            self.abstract_text = other.abstract_text.clone();
        }
    }
}

/// Lowercase a DOI and strip resolver prefixes; `None` if nothing remains
pub fn normalize_doi(raw: &str) -> Option<String> {
    let mut doi = raw.trim().to_lowercase();
    for prefix in ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"] {
        if let Some(rest) = doi.strip_prefix(prefix) {
            doi = rest.trim().to_string();
        }
    }
    if doi.is_empty() {
        None
    } else {
        Some(doi)
    }
}

/// Lowercased alphanumeric words of a title, single-space separated
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_identity(title: &str, year: Option<i32>) -> String {
    match year {
        Some(year) => format!("title:{}|{}", normalize_title(title), year),
        None => format!("title:{}|", normalize_title(title)),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(doi: Option<&str>, title: Option<&str>) -> RawRecord {
        RawRecord {
            doi: doi.map(str::to_string),
            title: title.map(str::to_string),
            year: Some(2023),
            ..Default::default()
        }
    }

    #[test]
    fn test_doi_identity_is_normalized() {
        let paper = PaperRecord::from_raw(
            raw(Some("https://doi.org/10.1000/ABC"), Some("Title")),
            SourceKind::Crossref,
        )
        .unwrap();
        assert_eq!(paper.id, "doi:10.1000/abc");
        assert_eq!(paper.doi.as_deref(), Some("10.1000/abc"));
    }

    #[test]
    fn test_rejects_missing_doi_and_title() {
        let result = PaperRecord::from_raw(raw(None, Some("   ")), SourceKind::Scopus);
        assert_eq!(result, Err(RejectReason::MissingDoiAndTitle));
    }

    #[test]
    fn test_native_id_identity() {
        let mut record = raw(None, Some("A Study"));
        record.native_id = Some("WOS:000123".to_string());
        let paper = PaperRecord::from_raw(record, SourceKind::Wos).unwrap();
        assert_eq!(paper.id, "wos:WOS:000123");
        assert_eq!(paper.dedup_key(), "title:a study|2023");
    }

    #[test]
    fn test_title_identity_fallback() {
        let paper =
            PaperRecord::from_raw(raw(None, Some("Deep  Learning: A Survey!")), SourceKind::Scopus)
                .unwrap();
        assert_eq!(paper.id, "title:deep learning a survey|2023");
    }

    #[test]
    fn test_author_parse_forms() {
        assert_eq!(
            Author::parse("Smith, John A."),
            Some(Author::new("Smith", Some("John A.".to_string())))
        );
        assert_eq!(
            Author::parse("Ada  Lovelace"),
            Some(Author::new("Lovelace", Some("Ada".to_string())))
        );
        assert_eq!(Author::parse("UNESCO"), Some(Author::new("UNESCO", None)));
        assert_eq!(Author::parse("   "), None);
    }

    #[test]
    fn test_merge_missing_keeps_existing_fields() {
        let mut first = PaperRecord::from_raw(raw(Some("10.1/x"), Some("First")), SourceKind::Crossref).unwrap();
        let mut second_raw = raw(Some("10.1/x"), Some("Second"));
        second_raw.abstract_text = Some("Abstract text".to_string());
        second_raw.venue = Some("Journal".to_string());
        let second = PaperRecord::from_raw(second_raw, SourceKind::Scopus).unwrap();

        first.merge_missing(&second);
        assert_eq!(first.title.as_deref(), Some("First"));
        assert_eq!(first.abstract_text.as_deref(), Some("Abstract text"));
        assert_eq!(first.venue.as_deref(), Some("Journal"));
        assert_eq!(first.source, SourceKind::Crossref);
    }

    #[test]
    fn test_merge_adopts_doi_identity() {
        let mut first = PaperRecord::from_raw(raw(None, Some("Shared")), SourceKind::Scopus).unwrap();
        let second = PaperRecord::from_raw(raw(Some("10.9/shared"), Some("Shared")), SourceKind::Wos).unwrap();
        assert_eq!(first.title_key(), second.title_key());

        first.merge_missing(&second);
        assert_eq!(first.id, "doi:10.9/shared");
        assert_eq!(first.dedup_key(), "doi:10.9/shared");
    }
}
