//! litbuddy - grounded literature reviews
//!
//! Retrieves paper metadata from bibliographic sources, embeds abstracts,
//! selects the papers closest to a topic, and asks a language model for a
//! review that cites only those papers.
//!
//! # Architecture
//!
//! - **sources**: Crossref, Scopus and Web of Science adapters
//! - **backends**: Ollama and OpenAI-compatible embedding/generation
//! - **citations**: citation keys plus RAW, BibTeX and APA 7 rendering
//! - **rag**: retrieval, indexing, selection, synthesis and orchestration
//! - **output** / **cli**: Markdown rendering and the command-line adapter

pub mod backends;
pub mod citations;
pub mod cli;
pub mod config;
pub mod errors;
pub mod output;
pub mod rag;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use errors::{ErrorResponse, PipelineError, Result};
pub use rag::ReviewPipeline;
pub use types::{CitationStyle, ReviewRequest, ReviewResult};

/// Crate version, sent in the sources' User-Agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
