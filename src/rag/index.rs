//! In-memory embedding index over paper abstracts
//!
//! Built fresh for every request and searched with an exact full scan.
//! Batches run concurrently, bounded by a semaphore. A batch rejected for
//! its input is retried one paper at a time so a single bad input only
//! costs that paper. An outage (timeout, transport, auth, rate limit or
//! server error) aborts the build without further calls.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::backends::Embedder;
use crate::errors::{BackendError, PipelineError, Result};
use crate::sources::text::truncate_words;
use crate::types::{CitedPaper, RankedPaper};

/// Batching and input limits for index builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexParams {
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_words: usize,
    /// Upper bound on a single embedding call
    pub timeout: Duration,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: 4,
            max_words: 8192,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One indexed paper and its vector
#[derive(Debug, Clone)]
pub struct IndexedPaper {
    pub cited: CitedPaper,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    model_id: String,
    dimension: usize,
    entries: Vec<IndexedPaper>,
    /// Papers offered to the build, with or without abstract
    considered: usize,
    /// Ids of papers whose embedding failed
    failed: Vec<String>,
}

/// Text embedded for a paper: title, blank line, abstract
pub fn embedding_text(cited: &CitedPaper, max_words: usize) -> String {
    let paper = &cited.paper;
    let text = match (&paper.title, &paper.abstract_text) {
        (Some(title), Some(abstract_text)) => format!("{}\n\n{}", title, abstract_text),
        (None, Some(abstract_text)) => abstract_text.clone(),
        (Some(title), None) => title.clone(),
        (None, None) => String::new(),
    };
    truncate_paragraphs(&text, max_words)
}

/// Word-limit a text while keeping its paragraph breaks
fn truncate_paragraphs(text: &str, max_words: usize) -> String {
    let mut remaining = max_words;
    let mut parts = Vec::new();
    for paragraph in text.split("\n\n") {
        if remaining == 0 {
            break;
        }
        let truncated = truncate_words(paragraph, remaining);
        remaining -= truncated.split_whitespace().count();
        if !truncated.is_empty() {
            parts.push(truncated);
        }
    }
    parts.join("\n\n")
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

fn usable(vector: &[f32]) -> bool {
    !vector.is_empty() && vector.iter().all(|v| v.is_finite())
}

impl EmbeddingIndex {
    /// Embed every paper that has an abstract
    pub async fn build(embedder: &dyn Embedder, papers: &[CitedPaper], params: &IndexParams) -> Result<Self> {
        let eligible: Vec<&CitedPaper> = papers.iter().filter(|c| c.paper.has_abstract()).collect();
        let model_id = embedder.model_id();
        info!(model = %model_id, eligible = eligible.len(), total = papers.len(), "building embedding index");

        let batch_size = params.batch_size.max(1);
        let semaphore = Arc::new(Semaphore::new(params.concurrency.max(1)));

        let batches = eligible.chunks(batch_size).map(|batch| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
                let texts: Vec<String> = batch.iter().map(|c| embedding_text(c, params.max_words)).collect();
                embed_batch(embedder, &texts, params.timeout).await
            }
        });

        let mut vectors = Vec::with_capacity(eligible.len());
        for outcome in join_all(batches).await {
            vectors.extend(outcome.map_err(PipelineError::EmbeddingFailure)?);
        }

        // First usable vector fixes the dimension
        let dimension = vectors.iter().flatten().map(Vec::len).next().unwrap_or(0);
        let mut entries = Vec::new();
        let mut failed = Vec::new();

        for (cited, vector) in eligible.into_iter().zip(vectors) {
            match vector {
                Some(vector) if vector.len() == dimension => entries.push(IndexedPaper {
                    cited: cited.clone(),
                    vector,
                }),
                Some(vector) => {
                    warn!(paper = %cited.paper.id, got = vector.len(), expected = dimension, "embedding dimension mismatch; dropping paper");
                    failed.push(cited.paper.id.clone());
                }
                None => {
                    warn!(paper = %cited.paper.id, "embedding failed; dropping paper");
                    failed.push(cited.paper.id.clone());
                }
            }
        }

        if entries.is_empty() && !failed.is_empty() {
            return Err(PipelineError::EmbeddingFailure(BackendError::InvalidResponse(format!(
                "none of {} paper(s) could be embedded",
                failed.len()
            ))));
        }

        info!(indexed = entries.len(), failed = failed.len(), dimension, "embedding index ready");
        Ok(Self {
            model_id,
            dimension,
            entries,
            considered: papers.len(),
            failed,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexedPaper] {
        &self.entries
    }

    pub fn considered(&self) -> usize {
        self.considered
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// Exact top-k by cosine similarity; ties go to the earlier paper
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RankedPaper> {
        let mut scored: Vec<(&IndexedPaper, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry, cosine_similarity(query, &entry.vector)))
            .collect();

        scored.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| a.cited.ordinal.cmp(&b.cited.ordinal))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(entry, score)| RankedPaper {
                cited: entry.cited.clone(),
                score,
            })
            .collect()
    }
}

/// One vector (or `None`) per text. Only an outage is an error.
async fn embed_batch(
    embedder: &dyn Embedder,
    texts: &[String],
    timeout: Duration,
) -> std::result::Result<Vec<Option<Vec<f32>>>, BackendError> {
    match call(embedder, texts, timeout).await {
        Ok(vectors) if vectors.len() == texts.len() && consistent(&vectors) => {
            return Ok(vectors.into_iter().map(Some).collect());
        }
        Ok(vectors) => {
            warn!(expected = texts.len(), got = vectors.len(), "malformed embedding batch; retrying per paper");
        }
        Err(e) if e.is_outage() => return Err(e),
        Err(e) => {
            warn!(error = %e, size = texts.len(), "embedding batch rejected; retrying per paper");
        }
    }

    let mut vectors = Vec::with_capacity(texts.len());
    for text in texts {
        let single = std::slice::from_ref(text);
        match call(embedder, single, timeout).await {
            Ok(mut result) if result.len() == 1 && usable(&result[0]) => vectors.push(result.pop()),
            Ok(_) => vectors.push(None),
            Err(e) if e.is_outage() => return Err(e),
            Err(e) => {
                debug!(error = %e, "single embedding failed");
                vectors.push(None);
            }
        }
    }
    Ok(vectors)
}

async fn call(
    embedder: &dyn Embedder,
    texts: &[String],
    timeout: Duration,
) -> std::result::Result<Vec<Vec<f32>>, BackendError> {
    tokio::time::timeout(timeout, embedder.embed(texts))
        .await
        .map_err(|_| BackendError::Timeout(timeout))?
}

fn consistent(vectors: &[Vec<f32>]) -> bool {
    match vectors.first() {
        Some(first) => vectors.iter().all(|v| v.len() == first.len() && usable(v)),
        None => true,
    }
}
