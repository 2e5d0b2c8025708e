//! Citation formatting
//!
//! Pure functions from a paper (and its key) to a rendered reference.
//!
//! Components:
//! - Keys: deterministic `<Surname><Year>[suffix]` keys, collision-free per run
//! - Styles: RAW, BibTeX and APA 7 renderers

pub mod keys;
pub mod styles;

pub use keys::{assign_keys, base_key, cite_all, looks_like_key};
pub use styles::Rendered;

use crate::types::{Citation, CitationStyle, CitedPaper};

/// Render a keyed paper; issues are returned for the caller to record
pub fn format(cited: &CitedPaper, style: CitationStyle) -> (Citation, Vec<String>) {
    let rendered = styles::render(&cited.paper, &cited.key, style);
    let citation = Citation {
        key: cited.key.clone(),
        paper_id: cited.paper.id.clone(),
        style,
        rendered: rendered.text,
    };
    (citation, rendered.issues)
}
