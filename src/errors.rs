//! Error types for litbuddy
//!
//! Per-item failures (one source, one paper's embedding, one citation render)
//! are absorbed and recorded in diagnostics. Everything in [`PipelineError`]
//! aborts the request.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::types::SourceKind;

/// Fatal error for a review request
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Topic was empty or otherwise unusable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every registered source came back empty or failed
    #[error("No papers found for topic '{topic}' across {sources_tried} source(s)")]
    NoResultsFound { topic: String, sources_tried: usize },

    /// Retrieved papers exist but none carried an abstract to ground on
    #[error("No retrieved paper has an abstract; {papers} paper(s) cannot ground a review")]
    EmptyContext { papers: usize },

    /// Embedding backend outage, timeout, or topic embedding failure
    #[error("Embedding failure: {0}")]
    EmbeddingFailure(#[source] BackendError),

    /// Generation backend failure
    #[error("Generation failure: {0}")]
    GenerationFailure(#[source] BackendError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stage machine transition errors
    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl PipelineError {
    /// Stable machine-readable failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "invalid_request",
            PipelineError::NoResultsFound { .. } => "no_results_found",
            PipelineError::EmptyContext { .. } => "empty_context",
            PipelineError::EmbeddingFailure(_) => "embedding_failure",
            PipelineError::GenerationFailure(_) => "generation_failure",
            PipelineError::Config(_) => "config",
            PipelineError::InvalidTransition { .. } => "internal",
        }
    }

    /// Structured body for API-style adapters
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

/// Serialized shape of a fatal error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

/// Failure of a single bibliographic source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{source_kind} request failed: {message}")]
    Http {
        source_kind: SourceKind,
        message: String,
    },

    #[error("{source_kind} returned HTTP {status}")]
    Status { source_kind: SourceKind, status: u16 },

    #[error("{source_kind} response could not be parsed: {message}")]
    Parse {
        source_kind: SourceKind,
        message: String,
    },

    #[error("{source_kind} timed out after {}ms", .after.as_millis())]
    Timeout {
        source_kind: SourceKind,
        after: Duration,
    },
}

/// Failure of an embedding or generation backend call
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} API error: HTTP {status}: {body}")]
    Api {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl BackendError {
    /// Timeouts are never retried or absorbed
    pub fn is_timeout(&self) -> bool {
        match self {
            BackendError::Timeout(_) => true,
            BackendError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Failures that affect every call to the backend, not one input:
    /// timeouts, transport errors, auth, rate limits and server errors
    pub fn is_outage(&self) -> bool {
        match self {
            BackendError::Timeout(_) | BackendError::Http(_) => true,
            BackendError::Api { status, .. } => matches!(status, 401 | 403 | 429) || *status >= 500,
            BackendError::InvalidResponse(_) => false,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
