// Retrieval-augmented review generation
//
// Components:
// - Retrieval Engine: concurrent search + merge across bibliographic sources
// - Index: per-request embedding index over abstracts, exact cosine search
// - Selector: topic embedding and top-k context selection
// - Context Builder: grounded prompt assembly
// - Synthesizer: single generation call and marker validation
// - Pipeline: stage-tracked orchestration

pub mod context;
pub mod index;
pub mod markers;
pub mod pipeline;
pub mod retrieval;
pub mod selector;
pub mod stage;
pub mod synthesizer;

// Re-export key types
pub use context::ContextBuilder;
pub use index::{EmbeddingIndex, IndexParams};
pub use pipeline::ReviewPipeline;
pub use retrieval::RetrievalEngine;
pub use selector::ContextSelector;
pub use stage::{PipelineStage, StageEvent, StageTracker};
pub use synthesizer::{ReviewSynthesizer, Synthesis};
