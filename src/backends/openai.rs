//! OpenAI-compatible API client (embeddings + chat completions)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ollama::map_send_error;
use super::{check_status, Embedder, Generator, Prompt};
use crate::config::BackendConfig;
use crate::errors::{BackendError, PipelineError, Result};

/// Default OpenAI API base
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
    temperature: f32,
    embedding_timeout: Duration,
    generation_timeout: Duration,
}

impl OpenAiBackend {
    pub fn from_config(config: &BackendConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            temperature: config.temperature,
            embedding_timeout: config.embedding_timeout(),
            generation_timeout: config.generation_timeout(),
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// Restore input order; the API tags each vector with its input index
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
    data.sort_by_key(|d| d.index);
    if data.len() != expected || data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(BackendError::InvalidResponse(format!(
            "expected {} embeddings with contiguous indices, got {}",
            expected,
            data.len()
        )));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiBackend {
    fn model_id(&self) -> String {
        format!("openai/{}", self.embedding_model)
    }

    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.embedding_timeout)
            .json(&EmbeddingsRequest {
                model: &self.embedding_model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| map_send_error(e, self.embedding_timeout))?;

        let body: EmbeddingsResponse = check_status("OpenAI", response).await?.json().await?;
        order_embeddings(body.data, texts.len())
    }
}

#[async_trait]
impl Generator for OpenAiBackend {
    fn model_id(&self) -> String {
        format!("openai/{}", self.generation_model)
    }

    async fn generate(&self, prompt: &Prompt) -> std::result::Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.generation_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.generation_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.generation_timeout))?;

        let body: ChatResponse = check_status("OpenAI", response).await?.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| BackendError::InvalidResponse("OpenAI returned no content".to_string()))
    }
}
