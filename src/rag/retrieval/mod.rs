// Metadata retrieval over the source registry
pub mod engine;

pub use engine::{merge_records, Retrieved, RetrievalEngine, SearchParams};
