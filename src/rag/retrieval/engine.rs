//! Concurrent metadata retrieval across registered sources
use futures_util::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{PipelineError, Result, SourceError};
use crate::sources::SourceRegistry;
use crate::types::{PaperRecord, RawRecord, SourceFailure, SourceKind};

/// Retrieval parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Records requested from each source
    pub limit: usize,
    /// Upper bound on one source's search
    pub timeout: Duration,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Merged records plus what happened along the way
#[derive(Debug, Clone, Default)]
pub struct Retrieved {
    /// Deduplicated, in source-priority order
    pub papers: Vec<PaperRecord>,
    /// Valid records returned by each source, before merging
    pub per_source: BTreeMap<SourceKind, usize>,
    pub failures: Vec<SourceFailure>,
    pub rejected: usize,
    pub duplicates_merged: usize,
}

/// Queries every registered source and merges the results
pub struct RetrievalEngine {
    registry: SourceRegistry,
    default_params: SearchParams,
}

impl RetrievalEngine {
    /// Create new retrieval engine
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry,
            default_params: SearchParams::default(),
        }
    }

    /// Create with custom default parameters
    pub fn with_params(registry: SourceRegistry, params: SearchParams) -> Self {
        Self {
            registry,
            default_params: params,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Retrieve with the default parameters
    pub async fn retrieve(&self, topic: &str) -> Result<Retrieved> {
        self.retrieve_with_params(topic, &self.default_params).await
    }

    /// Search all sources concurrently; fails only when nothing came back
    pub async fn retrieve_with_params(&self, topic: &str, params: &SearchParams) -> Result<Retrieved> {
        let searches = self.registry.sources().iter().map(|source| {
            let kind = source.kind();
            async move {
                let outcome = match tokio::time::timeout(params.timeout, source.search(topic, params.limit)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout {
                        source_kind: kind,
                        after: params.timeout,
                    }),
                };
                (kind, outcome)
            }
        });

        let mut retrieved = Retrieved::default();
        let mut batches = Vec::new();

        // join_all keeps registration order, which is priority order
        for (kind, outcome) in join_all(searches).await {
            match outcome {
                Ok(records) if records.is_empty() => {
                    info!(source = %kind, "source returned no records");
                    retrieved.failures.push(SourceFailure {
                        source: kind,
                        reason: "returned no records".to_string(),
                    });
                }
                Ok(records) => {
                    let (papers, rejected) = normalize(records, kind);
                    info!(source = %kind, records = papers.len(), rejected, "source search complete");
                    retrieved.rejected += rejected;
                    if papers.is_empty() {
                        retrieved.failures.push(SourceFailure {
                            source: kind,
                            reason: "returned no usable records".to_string(),
                        });
                        continue;
                    }
                    retrieved.per_source.insert(kind, papers.len());
                    batches.push(papers);
                }
                Err(e) => {
                    warn!(source = %kind, error = %e, "source failed; skipping");
                    retrieved.failures.push(SourceFailure {
                        source: kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let (papers, merged) = merge_records(batches);
        retrieved.papers = papers;
        retrieved.duplicates_merged = merged;

        if retrieved.papers.is_empty() {
            return Err(PipelineError::NoResultsFound {
                topic: topic.to_string(),
                sources_tried: self.registry.len(),
            });
        }

        info!(
            papers = retrieved.papers.len(),
            duplicates_merged = merged,
            failed_sources = retrieved.failures.len(),
            "retrieval complete"
        );
        Ok(retrieved)
    }
}

/// Validate raw records; returns accepted papers and the rejected count
fn normalize(records: Vec<RawRecord>, kind: SourceKind) -> (Vec<PaperRecord>, usize) {
    let mut rejected = 0;
    let papers = records
        .into_iter()
        .filter_map(|raw| match PaperRecord::from_raw(raw, kind) {
            Ok(paper) => Some(paper),
            Err(reason) => {
                debug!(source = %kind, ?reason, "rejected record");
                rejected += 1;
                None
            }
        })
        .collect();
    (papers, rejected)
}

/// Merge per-source batches given in priority order.
///
/// A record is a duplicate when its DOI matches an earlier record, or when
/// its normalized title and year match an earlier record and at most one of
/// the two carries a DOI. The earlier record wins and fills its gaps from
/// the later one.
pub fn merge_records(batches: Vec<Vec<PaperRecord>>) -> (Vec<PaperRecord>, usize) {
    let mut merged: Vec<PaperRecord> = Vec::new();
    let mut by_doi: HashMap<String, usize> = HashMap::new();
    let mut by_title: HashMap<String, usize> = HashMap::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut duplicates = 0;

    for paper in batches.into_iter().flatten() {
        let existing = paper
            .doi_key()
            .and_then(|key| by_doi.get(&key).copied())
            .or_else(|| {
                paper
                    .title_key()
                    .and_then(|key| by_title.get(&key).copied())
                    .filter(|&i| merged[i].doi.is_none() || paper.doi.is_none())
            })
            .or_else(|| by_id.get(&paper.id).copied());

        let index = match existing {
            Some(i) => {
                debug!(kept = %merged[i].id, dropped = %paper.id, "merged duplicate");
                merged[i].merge_missing(&paper);
                duplicates += 1;
                i
            }
            None => {
                merged.push(paper);
                merged.len() - 1
            }
        };

        let record = &merged[index];
        if let Some(key) = record.doi_key() {
            by_doi.entry(key).or_insert(index);
        }
        if let Some(key) = record.title_key() {
            by_title.entry(key).or_insert(index);
        }
        by_id.entry(record.id.clone()).or_insert(index);
    }

    (merged, duplicates)
}
