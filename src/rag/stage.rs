//! Review pipeline stage machine
//!
//! Valid transitions:
//! 1. Retrieving   → Indexing     (on: PapersRetrieved)
//! 2. Indexing     → Selecting    (on: IndexBuilt)
//! 3. Selecting    → Synthesizing (on: ContextSelected)
//! 4. Synthesizing → Done         (on: ReviewGenerated)
//! 5. any non-terminal → Failed   (on: Fail)
//!
//! Done and Failed are terminal; leaving them is an error.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Retrieving,
    Indexing,
    Selecting,
    Synthesizing,
    Done,
    Failed,
}

/// Events that advance a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    PapersRetrieved,
    IndexBuilt,
    ContextSelected,
    ReviewGenerated,
    Fail,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    pub fn transition(&self, event: StageEvent) -> Result<PipelineStage> {
        use PipelineStage::*;
        use StageEvent::*;

        let next = match (self, event) {
            (Retrieving, PapersRetrieved) => Indexing,
            (Indexing, IndexBuilt) => Selecting,
            (Selecting, ContextSelected) => Synthesizing,
            (Synthesizing, ReviewGenerated) => Done,
            (from, Fail) if !from.is_terminal() => Failed,
            (from, event) => {
                return Err(PipelineError::InvalidTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                });
            }
        };

        Ok(next)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineStage::Retrieving => "Retrieving papers",
            PipelineStage::Indexing => "Embedding abstracts",
            PipelineStage::Selecting => "Selecting context",
            PipelineStage::Synthesizing => "Writing review",
            PipelineStage::Done => "Completed",
            PipelineStage::Failed => "Failed",
        }
    }
}

/// Current stage plus every stage visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTracker {
    current: PipelineStage,
    history: Vec<PipelineStage>,
}

impl StageTracker {
    pub fn new() -> Self {
        info!(stage = ?PipelineStage::Retrieving, "pipeline started");
        Self {
            current: PipelineStage::Retrieving,
            history: vec![PipelineStage::Retrieving],
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    pub fn advance(&mut self, event: StageEvent) -> Result<PipelineStage> {
        let next = self.current.transition(event)?;
        info!(from = ?self.current, to = ?next, "stage transition");
        self.current = next;
        self.history.push(next);
        Ok(next)
    }

    /// Move to Failed unless already terminal
    pub fn fail(&mut self) {
        if self.current.is_terminal() {
            return;
        }
        if let Err(e) = self.advance(StageEvent::Fail) {
            warn!(error = %e, "could not record pipeline failure");
        }
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
