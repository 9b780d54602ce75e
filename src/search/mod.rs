//! Search orchestration: exact lookup, scored retrieval, oracle-guided semantic fallback,
//! and the end-to-end query pipeline.

mod cache;
mod engine;
mod variants;

pub use cache::{CacheKey, CachePolicy, SearchCache};
pub use engine::{BatchOutcome, EntityFailure, EntityMatches, SearchError, SearchOrchestrator};
pub use variants::exact_variants;
