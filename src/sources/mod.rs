//! Bibliographic source adapters
//!
//! Every source implements [`PaperSource`]. Sources are registered once, in
//! priority order, when the pipeline is built; retrieval logic never branches
//! on which sources exist.

pub mod crossref;
pub mod scopus;
pub mod text;
pub mod wos;

pub use crossref::CrossrefSource;
pub use scopus::ScopusSource;
pub use wos::WosSource;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SourcesConfig;
use crate::errors::{PipelineError, Result, SourceError};
use crate::types::{RawRecord, SourceKind};

/// Uniform search capability over one bibliographic service
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Which service this is
    fn kind(&self) -> SourceKind;

    /// Search for up to `limit` records matching `topic`
    async fn search(&self, topic: &str, limit: usize) -> std::result::Result<Vec<RawRecord>, SourceError>;
}

/// Sources in priority order
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn PaperSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crossref always; Scopus and Web of Science when a key is configured
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut registry = Self::new();

        registry.register(Arc::new(CrossrefSource::new(config.crossref_mailto.clone(), timeout)?));

        if let Some(api_key) = config.scopus_api_key.clone() {
            registry.register(Arc::new(ScopusSource::new(
                api_key,
                config.scopus_insttoken.clone(),
                timeout,
            )?));
        }

        if let Some(api_key) = config.wos_api_key.clone() {
            registry.register(Arc::new(WosSource::new(api_key, timeout)?));
        }

        Ok(registry)
    }

    /// Append a source at the lowest priority
    pub fn register(&mut self, source: Arc<dyn PaperSource>) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[Arc<dyn PaperSource>] {
        &self.sources
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// HTTP client shared by the source adapters
pub(crate) fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Send a request and decode a JSON body, mapping failures to [`SourceError`]
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    kind: SourceKind,
    request: RequestBuilder,
    timeout: Duration,
) -> std::result::Result<T, SourceError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            SourceError::Timeout {
                source_kind: kind,
                after: timeout,
            }
        } else {
            SourceError::Http {
                source_kind: kind,
                message: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SourceError::Status {
            source_kind: kind,
            status: response.status().as_u16(),
        });
    }

    response.json::<T>().await.map_err(|e| SourceError::Parse {
        source_kind: kind,
        message: e.to_string(),
    })
}
