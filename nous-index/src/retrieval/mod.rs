//! Ranking stored documents against a free-text query.

use crate::storage::{Metadata, StoreStats};
use serde::Serialize;

pub mod scorer;
pub mod semantic_index;

pub use scorer::{EmbeddingScorer, KeywordScorer, Scorer};
pub use semantic_index::SemanticIndex;

/// How an index ranks documents. Fixed for the lifetime of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Case-insensitive substring occurrence counts
    Keyword,
    /// Cosine similarity of sentence embeddings
    Embedding,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Keyword => write!(f, "keyword"),
            SearchMode::Embedding => write!(f, "embedding"),
        }
    }
}

/// One ranked search result. A copy; holds no reference into storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f32,
    pub text: String,
    pub meta: Metadata,
}

/// Snapshot of an index's mode and contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub mode: SearchMode,
    pub model_id: Option<String>,
    #[serde(flatten)]
    pub storage: StoreStats,
}
