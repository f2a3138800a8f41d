pub mod chunk;
pub mod context_bundle;

pub use chunk::{sort_by_relevance, Chunk, ChunkId, ScoredChunk};
pub use context_bundle::{
    ContextDepth, SelectionError, SelectionMethod, SelectionOptions, SelectionResult,
    SelectionStats,
};
