//! Ollama API client
//!
//! - Embeddings: POST /api/embed with a batch of inputs
//! - Generation: POST /api/generate, non-streaming, one call per review

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{check_status, Embedder, Generator, Prompt};
use crate::config::BackendConfig;
use crate::errors::{BackendError, PipelineError, Result};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Ollama embedding + generation client
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    embedding_model: String,
    generation_model: String,
    temperature: f32,
    embedding_timeout: Duration,
    generation_timeout: Duration,
}

impl OllamaBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        // Per-request timeouts are set on each call
        let client = Client::builder()
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            temperature: config.temperature,
            embedding_timeout: config.embedding_timeout(),
            generation_timeout: config.generation_timeout(),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);

        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl Embedder for OllamaBackend {
    fn model_id(&self) -> String {
        format!("ollama/{}", self.embedding_model)
    }

    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.embedding_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.embedding_timeout))?;

        let body: EmbedResponse = check_status("Ollama", response).await?.json().await?;
        Ok(body.embeddings)
    }
}

#[async_trait]
impl Generator for OllamaBackend {
    fn model_id(&self) -> String {
        format!("ollama/{}", self.generation_model)
    }

    async fn generate(&self, prompt: &Prompt) -> std::result::Result<String, BackendError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.generation_model,
            prompt: &prompt.user,
            system: &prompt.system,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.generation_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.generation_timeout))?;

        let body: GenerateResponse = check_status("Ollama", response).await?.json().await?;
        if body.response.trim().is_empty() {
            return Err(BackendError::InvalidResponse(
                "Ollama returned an empty response".to_string(),
            ));
        }
        Ok(body.response)
    }
}

pub(crate) fn map_send_error(err: reqwest::Error, timeout: Duration) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let backend = OllamaBackend::from_config(&BackendConfig::default()).unwrap();
        assert_eq!(backend.base_url(), DEFAULT_OLLAMA_URL);
        assert_eq!(Embedder::model_id(&backend), "ollama/nomic-embed-text");
    }

    #[test]
    fn test_client_with_config() {
        let config = BackendConfig {
            base_url: Some("http://localhost:8080/".to_string()),
            generation_model: "llama3.1:8b".to_string(),
            ..Default::default()
        };
        let backend = OllamaBackend::from_config(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8080");
        assert_eq!(Generator::model_id(&backend), "ollama/llama3.1:8b");
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "m",
            prompt: "user",
            system: "sys",
            stream: false,
            options: GenerateOptions { temperature: 0.5 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["system"], "sys");
        assert_eq!(json["options"]["temperature"], 0.5);
    }

    #[tokio::test]
    async fn test_embed_empty_batch_skips_network() {
        let backend = OllamaBackend::from_config(&BackendConfig::default()).unwrap();
        let vectors = backend.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_health_check_integration() {
        let backend = OllamaBackend::from_config(&BackendConfig::default()).unwrap();
        assert!(backend.health_check().await);
    }
}
