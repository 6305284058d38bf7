//! Scoring strategies behind [`SemanticIndex`](super::SemanticIndex).
//!
//! The strategy is chosen once, when the index is built:
//!
//! - [`KeywordScorer`] when no embedding model could be loaded. A document
//!   scores the number of case-insensitive, non-overlapping occurrences of
//!   the query inside its text. This is plain substring counting: "cat"
//!   also matches inside "category". The query is not trimmed, so " dog"
//!   does not match a text that starts with "dog".
//! - [`EmbeddingScorer`] when a model is available. Documents are scored by
//!   the dot product of unit vectors, i.e. cosine similarity. Rows written
//!   without an embedding, or by a different model, are never scored.

use super::SearchMode;
use crate::error::Result;
use crate::storage::{DocumentStore, Embedding, StoredDocument};
use async_trait::async_trait;
use half::f16;
use nous_embed::{EmbedError, EmbeddingProvider};
use std::sync::Arc;
use tracing::{debug, warn};

/// A candidate document paired with its relevance score.
pub type Scored = (StoredDocument, f32);

#[async_trait]
pub trait Scorer: Send + Sync {
    fn mode(&self) -> SearchMode;

    /// Identifier recorded next to embeddings written in this mode
    fn model_id(&self) -> Option<String>;

    /// Embeddings to persist for `texts`, one entry per text
    async fn embed_for_storage(&self, texts: &[String]) -> Result<Vec<Option<Embedding>>>;

    /// Rows this scorer is able to rank
    async fn load_candidates(&self, store: &dyn DocumentStore) -> Result<Vec<StoredDocument>>;

    /// Score candidates against a non-empty query, dropping unusable ones.
    /// Output order follows input order; ranking happens in the caller.
    async fn score(&self, query: &str, candidates: Vec<StoredDocument>) -> Result<Vec<Scored>>;
}

/// Substring-count scoring used when no embedding model is available
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl KeywordScorer {
    /// Occurrences of `needle` in `haystack`, both already lower-cased
    pub fn occurrences(haystack: &str, needle: &str) -> usize {
        if needle.is_empty() {
            return 0;
        }
        haystack.matches(needle).count()
    }
}

#[async_trait]
impl Scorer for KeywordScorer {
    fn mode(&self) -> SearchMode {
        SearchMode::Keyword
    }

    fn model_id(&self) -> Option<String> {
        None
    }

    async fn embed_for_storage(&self, texts: &[String]) -> Result<Vec<Option<Embedding>>> {
        Ok(vec![None; texts.len()])
    }

    async fn load_candidates(&self, store: &dyn DocumentStore) -> Result<Vec<StoredDocument>> {
        store.load_texts().await
    }

    async fn score(&self, query: &str, candidates: Vec<StoredDocument>) -> Result<Vec<Scored>> {
        let needle = query.to_lowercase();
        Ok(candidates
            .into_iter()
            .filter_map(|doc| {
                let count = Self::occurrences(&doc.text.to_lowercase(), &needle);
                (count > 0).then_some((doc, count as f32))
            })
            .collect())
    }
}

/// Cosine-similarity scoring over stored unit vectors
#[derive(Clone)]
pub struct EmbeddingScorer {
    provider: Arc<dyn EmbeddingProvider>,
    model_id: String,
}

impl std::fmt::Debug for EmbeddingScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingScorer")
            .field("model_id", &self.model_id)
            .finish()
    }
}

impl EmbeddingScorer {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let model_id = provider.model_id();
        Self { provider, model_id }
    }

    /// Whether a stored vector was produced by this scorer's model
    fn is_compatible(&self, doc: &StoredDocument, query: &[f16]) -> bool {
        match (&doc.embedding, doc.model_id.as_deref()) {
            (Some(embedding), Some(model_id)) => {
                model_id == self.model_id && embedding.len() == query.len()
            }
            _ => false,
        }
    }
}

/// Dot product accumulated in f32
pub fn dot(a: &[f16], b: &[f16]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum()
}

#[async_trait]
impl Scorer for EmbeddingScorer {
    fn mode(&self) -> SearchMode {
        SearchMode::Embedding
    }

    fn model_id(&self) -> Option<String> {
        Some(self.model_id.clone())
    }

    async fn embed_for_storage(&self, texts: &[String]) -> Result<Vec<Option<Embedding>>> {
        let result = self.provider.embed_texts(texts).await?;

        // Every row written in this mode must carry a usable vector
        if result.embeddings.len() != texts.len() {
            return Err(EmbedError::embedding_gen(format!(
                "{} returned {} embeddings for {} texts",
                self.model_id,
                result.embeddings.len(),
                texts.len()
            ))
            .into());
        }
        let dimension = self.provider.embedding_dimension();
        if let Some(bad) = result.embeddings.iter().find(|e| e.len() != dimension) {
            return Err(EmbedError::embedding_gen(format!(
                "{} returned a vector of dimension {}, expected {}",
                self.model_id,
                bad.len(),
                dimension
            ))
            .into());
        }

        Ok(result.embeddings.into_iter().map(Some).collect())
    }

    async fn load_candidates(&self, store: &dyn DocumentStore) -> Result<Vec<StoredDocument>> {
        store.load_with_embeddings().await
    }

    async fn score(&self, query: &str, candidates: Vec<StoredDocument>) -> Result<Vec<Scored>> {
        let query_vector = self.provider.embed_text(query).await?;

        let total = candidates.len();
        let scored: Vec<Scored> = candidates
            .into_iter()
            .filter(|doc| self.is_compatible(doc, &query_vector))
            .map(|doc| {
                let score = doc
                    .embedding
                    .as_deref()
                    .map(|embedding| dot(&query_vector, embedding))
                    .unwrap_or(0.0);
                (doc, score)
            })
            .collect();

        let skipped = total - scored.len();
        if skipped > 0 {
            warn!(
                "Skipped {} documents embedded by a model other than {}",
                skipped, self.model_id
            );
        }
        debug!("Scored {} documents by embedding similarity", scored.len());
        Ok(scored)
    }
}
