//! End-to-end review pipeline: retrieve -> index -> select -> synthesize
use chrono::Utc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backends::Backends;
use crate::citations;
use crate::config::Config;
use crate::errors::Result;
use crate::rag::index::{EmbeddingIndex, IndexParams};
use crate::rag::retrieval::{RetrievalEngine, SearchParams};
use crate::rag::selector::ContextSelector;
use crate::rag::stage::{StageEvent, StageTracker};
use crate::rag::synthesizer::ReviewSynthesizer;
use crate::sources::SourceRegistry;
use crate::types::{ContextSummary, Diagnostics, ReviewRequest, ReviewResult};

/// Review orchestrator
///
/// Holds only immutable configuration and backend handles, so one instance
/// can serve concurrent requests.
pub struct ReviewPipeline {
    retrieval_engine: RetrievalEngine,
    backends: Backends,
    index_params: IndexParams,
    selector: ContextSelector,
    synthesizer: ReviewSynthesizer,
}

impl ReviewPipeline {
    /// Assemble from explicit sources and backends
    pub fn new(config: &Config, registry: SourceRegistry, backends: Backends) -> Result<Self> {
        config.validate()?;

        let search = SearchParams {
            limit: config.sources.per_source_limit,
            timeout: Duration::from_secs(config.sources.timeout_secs),
        };
        let index_params = IndexParams {
            batch_size: config.pipeline.embed_batch_size,
            concurrency: config.pipeline.embed_concurrency,
            max_words: config.pipeline.max_embedding_words,
            timeout: config.backend.embedding_timeout(),
        };

        Ok(Self {
            retrieval_engine: RetrievalEngine::with_params(registry, search),
            backends,
            index_params,
            selector: ContextSelector::new(config.pipeline.top_k, config.backend.embedding_timeout()),
            synthesizer: ReviewSynthesizer::new(config.backend.generation_timeout()),
        })
    }

    /// Register sources and backends from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let registry = SourceRegistry::from_config(&config.sources)?;
        let backends = Backends::from_config(&config.backend)?;
        Self::new(config, registry, backends)
    }

    pub fn sources(&self) -> &SourceRegistry {
        self.retrieval_engine.registry()
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Run one review request
    pub async fn run(&self, request: &ReviewRequest) -> Result<ReviewResult> {
        let mut tracker = StageTracker::new();
        self.run_tracked(request, &mut tracker).await
    }

    /// Run one request, recording the stages it passes through
    pub async fn run_tracked(&self, request: &ReviewRequest, tracker: &mut StageTracker) -> Result<ReviewResult> {
        let outcome = self.execute(request, tracker).await;
        if let Err(e) = &outcome {
            warn!(stage = ?tracker.current(), kind = e.kind(), error = %e, "review failed");
            tracker.fail();
        }
        outcome
    }

    async fn execute(&self, request: &ReviewRequest, tracker: &mut StageTracker) -> Result<ReviewResult> {
        let topic = request.topic();
        info!(topic, style = %request.citation_format(), language = request.language(), "review requested");

        let retrieved = self.retrieval_engine.retrieve(topic).await?;
        let mut diagnostics = Diagnostics {
            per_source: retrieved.per_source,
            source_failures: retrieved.failures,
            rejected_records: retrieved.rejected,
            duplicates_merged: retrieved.duplicates_merged,
            ..Default::default()
        };

        // Keys are assigned once, over the whole merged set
        let cited = citations::cite_all(retrieved.papers);
        diagnostics.missing_abstracts = cited.iter().filter(|c| !c.paper.has_abstract()).count();
        if diagnostics.missing_abstracts > 0 {
            info!(count = diagnostics.missing_abstracts, "papers without abstract excluded from indexing");
        }
        tracker.advance(StageEvent::PapersRetrieved)?;

        let embedder = self.backends.embedder.as_ref();
        let index = EmbeddingIndex::build(embedder, &cited, &self.index_params).await?;
        diagnostics.embedding_failures = index.failed().to_vec();
        tracker.advance(StageEvent::IndexBuilt)?;

        let context = self.selector.select(embedder, topic, &index).await?;
        diagnostics.context = context
            .entries
            .iter()
            .map(|entry| ContextSummary {
                key: entry.cited.key.clone(),
                paper_id: entry.cited.paper.id.clone(),
                score: entry.score,
            })
            .collect();
        tracker.advance(StageEvent::ContextSelected)?;

        let synthesis = self
            .synthesizer
            .synthesize(
                self.backends.generator.as_ref(),
                topic,
                &context,
                request.language(),
                request.citation_format(),
            )
            .await?;
        diagnostics.unknown_markers = synthesis.unknown_markers;
        diagnostics.citation_issues = synthesis.citation_issues;
        tracker.advance(StageEvent::ReviewGenerated)?;

        info!(
            references = synthesis.citations.len(),
            unknown_markers = diagnostics.unknown_markers.len(),
            "review complete"
        );

        Ok(ReviewResult {
            run_id: Uuid::new_v4(),
            topic: topic.to_string(),
            language: request.language().to_string(),
            citation_format: request.citation_format(),
            text: synthesis.text,
            citations: synthesis.citations,
            diagnostics,
            generated_at: Utc::now(),
        })
    }
}
