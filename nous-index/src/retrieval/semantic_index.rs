//! The document index: upserts with optional embedding, ranked search.
//!
//! ## Usage
//!
//! ```no_run
//! use nous_index::{IndexConfig, SemanticIndex};
//! use serde_json::json;
//!
//! # async fn example() -> nous_index::Result<()> {
//! let index = SemanticIndex::open(&IndexConfig::new("data/semantic_index.db")).await?;
//! index
//!     .upsert("psycho_sleep", "Keep a regular wake time.", &json!({"type": "psychoeducation"}))
//!     .await?;
//!
//! for hit in index.search("trouble sleeping", 5).await? {
//!     println!("{:.3} {}", hit.score, hit.doc_id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Ranking
//!
//! Scores are sorted descending with a stable sort over insertion order, so
//! equal scores keep the order rows were first written. That tie order is
//! an implementation detail, not a guarantee. Every search scans the whole
//! table; the index suits small to medium corpora.

use super::scorer::{EmbeddingScorer, KeywordScorer, Scored, Scorer};
use super::{IndexStats, SearchHit, SearchMode};
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::storage::sqlite_store::SqliteStore;
use crate::storage::{DocumentRecord, DocumentStore, Metadata, StoredDocument};
use nous_embed::{EmbeddingProvider, FastEmbedProvider};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Document store plus the scoring strategy selected at construction.
#[derive(Clone)]
pub struct SemanticIndex {
    store: Arc<dyn DocumentStore>,
    scorer: Arc<dyn Scorer>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("mode", &self.scorer.mode())
            .field("model_id", &self.scorer.model_id())
            .finish()
    }
}

impl SemanticIndex {
    /// Opens the store and tries once to load the configured embedding model.
    ///
    /// If the model cannot be loaded the index runs in keyword mode for its
    /// whole lifetime. Storage failures are returned as errors.
    pub async fn open(config: &IndexConfig) -> Result<Self> {
        let provider: Option<Arc<dyn EmbeddingProvider>> = if config.embeddings_enabled {
            match FastEmbedProvider::create(config.embed_config()).await {
                Ok(provider) => Some(Arc::new(provider)),
                Err(e) => {
                    warn!(
                        "Embedding model {} unavailable, falling back to keyword search: {}",
                        config.model_name, e
                    );
                    None
                }
            }
        } else {
            info!("Embeddings disabled by configuration");
            None
        };

        Self::with_provider(&config.storage_path, provider).await
    }

    /// Opens the store at `path` with an explicitly chosen embedding capability
    pub async fn with_provider(
        path: &Path,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        let store = SqliteStore::open(path).await?;
        Ok(Self::from_parts(Arc::new(store), provider))
    }

    /// Assemble an index from an existing store
    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        let scorer: Arc<dyn Scorer> = match provider {
            Some(provider) => Arc::new(EmbeddingScorer::new(provider)),
            None => Arc::new(KeywordScorer),
        };
        info!(
            "Semantic index ready in {} mode{}",
            scorer.mode(),
            scorer
                .model_id()
                .map(|id| format!(" ({id})"))
                .unwrap_or_default()
        );
        Self { store, scorer }
    }

    pub fn mode(&self) -> SearchMode {
        self.scorer.mode()
    }

    /// Model id written next to new embeddings, `None` in keyword mode
    pub fn model_id(&self) -> Option<String> {
        self.scorer.model_id()
    }

    /// Insert or fully replace a document.
    ///
    /// `meta` must serialize to a JSON object; serialization failures are
    /// returned unchanged.
    pub async fn upsert<M>(&self, doc_id: &str, text: &str, meta: &M) -> Result<()>
    where
        M: Serialize + ?Sized,
    {
        let meta = to_metadata(doc_id, meta)?;
        let embedding = self
            .scorer
            .embed_for_storage(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .flatten();

        let record = self.record(doc_id.to_string(), text.to_string(), meta, embedding);
        self.store.upsert(record).await
    }

    /// Upsert many documents in one transaction and return how many were processed.
    ///
    /// Items are applied in order, so a later duplicate `doc_id` wins. Either
    /// the whole batch is written or none of it is.
    pub async fn bulk_upsert<I, D, T, M>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = (D, T, M)>,
        D: Into<String>,
        T: Into<String>,
        M: Serialize,
    {
        let mut ids = Vec::new();
        let mut texts = Vec::new();
        let mut metas = Vec::new();
        for (doc_id, text, meta) in items {
            let doc_id = doc_id.into();
            metas.push(to_metadata(&doc_id, &meta)?);
            ids.push(doc_id);
            texts.push(text.into());
        }

        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.scorer.embed_for_storage(&texts).await?
        };

        let records: Vec<DocumentRecord> = ids
            .into_iter()
            .zip(texts)
            .zip(metas)
            .zip(embeddings)
            .map(|(((doc_id, text), meta), embedding)| self.record(doc_id, text, meta, embedding))
            .collect();

        if records.is_empty() {
            return Ok(0);
        }
        self.store.upsert_batch(records).await
    }

    /// Return up to `top_k` documents ranked by relevance to `query`.
    ///
    /// A blank query returns no results without touching storage. Otherwise
    /// the query is scored as given, surrounding whitespace included.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.scorer.load_candidates(self.store.as_ref()).await?;
        let scored = self.scorer.score(query, candidates).await?;
        let hits = rank(scored, top_k);

        debug!(
            "Search '{}' in {} mode returned {} hits",
            query,
            self.mode(),
            hits.len()
        );
        Ok(hits)
    }

    /// Fetch one stored document by id
    pub async fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>> {
        self.store.get(doc_id).await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            mode: self.mode(),
            model_id: self.model_id(),
            storage: self.store.stats().await?,
        })
    }

    fn record(
        &self,
        doc_id: String,
        text: String,
        meta: Metadata,
        embedding: Option<Vec<half::f16>>,
    ) -> DocumentRecord {
        let model_id = embedding.as_ref().and_then(|_| self.scorer.model_id());
        DocumentRecord {
            doc_id,
            text,
            meta,
            embedding,
            model_id,
        }
    }
}

/// Stable sort by descending score, truncated to `top_k`
fn rank(mut scored: Vec<Scored>, top_k: usize) -> Vec<SearchHit> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);
    scored
        .into_iter()
        .map(|(doc, score)| SearchHit {
            doc_id: doc.doc_id,
            score,
            text: doc.text,
            meta: doc.meta,
        })
        .collect()
}

fn to_metadata<M: Serialize + ?Sized>(doc_id: &str, meta: &M) -> Result<Metadata> {
    match serde_json::to_value(meta)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(IndexError::InvalidMetadata {
            doc_id: doc_id.to_string(),
            message: format!("expected a JSON object, got {other}"),
        }),
    }
}
