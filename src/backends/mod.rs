//! Embedding and generation backends
//!
//! The pipeline only sees the [`Embedder`] and [`Generator`] capabilities.
//! Which service sits behind them, and which model, is run configuration.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{BackendConfig, BackendProvider};
use crate::errors::{BackendError, PipelineError, Result};

/// Text embedding capability
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend and model identity, e.g. `ollama/nomic-embed-text`
    fn model_id(&self) -> String;

    /// One vector per input text, in input order
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, BackendError>;
}

/// Single-shot text generation capability
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_id(&self) -> String;

    async fn generate(&self, prompt: &Prompt) -> std::result::Result<String, BackendError>;
}

/// System instructions plus the user turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Embedder and generator sharing one configured service
#[derive(Clone)]
pub struct Backends {
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
}

impl Backends {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config.provider {
            BackendProvider::Ollama => {
                let backend = Arc::new(OllamaBackend::from_config(config)?);
                Ok(Self {
                    embedder: backend.clone(),
                    generator: backend,
                })
            }
            BackendProvider::OpenAi => {
                let api_key = config.api_key.clone().ok_or_else(|| {
                    PipelineError::Config("backend.api_key is required for the openai provider".to_string())
                })?;
                let backend = Arc::new(OpenAiBackend::from_config(config, api_key)?);
                Ok(Self {
                    embedder: backend.clone(),
                    generator: backend,
                })
            }
        }
    }
}

/// Turn a non-success response into [`BackendError::Api`]
pub(crate) async fn check_status(
    backend: &str,
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(BackendError::Api {
        backend: backend.to_string(),
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_from_default_config() {
        let backends = Backends::from_config(&BackendConfig::default()).unwrap();
        assert_eq!(backends.embedder.model_id(), "ollama/nomic-embed-text");
        assert_eq!(backends.generator.model_id(), "ollama/qwen2.5:7b-instruct");
    }

    #[test]
    fn test_openai_requires_key() {
        let config = BackendConfig {
            provider: BackendProvider::OpenAi,
            ..Default::default()
        };
        assert!(Backends::from_config(&config).is_err());
    }
}
