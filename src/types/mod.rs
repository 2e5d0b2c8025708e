//! Type definitions module
//!
//! Paper metadata, requests, results and run diagnostics.

pub mod paper;
pub mod review;

// Re-export commonly used types
pub use paper::{normalize_doi, normalize_title, Author, PaperRecord, RawRecord, RejectReason, SourceKind};
pub use review::{
    Citation, CitationStyle, CitedPaper, ContextSummary, Diagnostics, RankedContext, RankedPaper,
    ReviewRequest, ReviewResult, SourceFailure, DEFAULT_LANGUAGE,
};
