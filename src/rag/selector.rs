//! Topic embedding and top-k context selection
use std::time::Duration;
use tracing::info;

use crate::backends::Embedder;
use crate::errors::{BackendError, PipelineError, Result};
use crate::rag::index::EmbeddingIndex;
use crate::types::RankedContext;

/// Picks the papers a review is grounded on
#[derive(Debug, Clone, Copy)]
pub struct ContextSelector {
    top_k: usize,
    timeout: Duration,
}

impl ContextSelector {
    pub fn new(top_k: usize, timeout: Duration) -> Self {
        Self { top_k, timeout }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Rank indexed papers against the topic
    pub async fn select(&self, embedder: &dyn Embedder, topic: &str, index: &EmbeddingIndex) -> Result<RankedContext> {
        if index.is_empty() {
            return Err(PipelineError::EmptyContext {
                papers: index.considered(),
            });
        }

        let model_id = embedder.model_id();
        if model_id != index.model_id() {
            return Err(PipelineError::Config(format!(
                "topic embedder {} does not match index model {}",
                model_id,
                index.model_id()
            )));
        }

        let query = self.embed_topic(embedder, topic).await?;
        if query.len() != index.dimension() {
            return Err(PipelineError::Config(format!(
                "topic embedding has dimension {}, index has {}",
                query.len(),
                index.dimension()
            )));
        }

        let entries = index.search(&query, self.top_k);
        info!(selected = entries.len(), top_k = self.top_k, "context selected");
        Ok(RankedContext { entries })
    }

    async fn embed_topic(&self, embedder: &dyn Embedder, topic: &str) -> Result<Vec<f32>> {
        let texts = [topic.to_string()];
        let mut vectors = tokio::time::timeout(self.timeout, embedder.embed(&texts))
            .await
            .map_err(|_| PipelineError::EmbeddingFailure(BackendError::Timeout(self.timeout)))?
            .map_err(PipelineError::EmbeddingFailure)?;

        match vectors.pop() {
            Some(vector) if vectors.is_empty() && !vector.is_empty() => Ok(vector),
            _ => Err(PipelineError::EmbeddingFailure(BackendError::InvalidResponse(
                "topic embedding response did not contain exactly one vector".to_string(),
            ))),
        }
    }
}
