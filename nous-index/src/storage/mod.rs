//! Storage abstraction for indexed documents.
//!
//! The retrieval layer talks to storage only through [`DocumentStore`], so
//! the SQLite backend can be swapped (or replaced by a test double) without
//! touching scoring code.
//!
//! ```text
//! SemanticIndex ── DocumentStore ── SqliteStore (one file, one `documents` table)
//! ```

use crate::error::Result;
use async_trait::async_trait;
use half::f16;
use serde::Serialize;
use std::collections::BTreeMap;

pub mod sqlite_store;

/// Arbitrary JSON object attached to a document.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Unit-length embedding vector as stored on disk.
pub type Embedding = Vec<f16>;

/// A full row as written by an upsert. Every column is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub doc_id: String,
    pub text: String,
    pub meta: Metadata,
    pub embedding: Option<Embedding>,
    /// Identifies the model that produced `embedding`
    pub model_id: Option<String>,
}

/// A row read back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub doc_id: String,
    pub text: String,
    pub meta: Metadata,
    pub embedding: Option<Embedding>,
    pub model_id: Option<String>,
    /// Unix timestamp of the last write
    pub updated_at: i64,
}

/// Row counts for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_documents: usize,
    pub documents_with_embeddings: usize,
    /// Embedded documents per model id
    pub embeddings_by_model: BTreeMap<String, usize>,
}

/// Persistent document storage keyed by `doc_id`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document or replace the existing row with the same id
    async fn upsert(&self, record: DocumentRecord) -> Result<()>;

    /// Upsert many documents in one transaction, in input order; returns the number written
    async fn upsert_batch(&self, records: Vec<DocumentRecord>) -> Result<usize>;

    /// Fetch a single document
    async fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>>;

    /// Every stored document, in insertion order
    async fn load_all(&self) -> Result<Vec<StoredDocument>>;

    /// Every stored document without its embedding column, in insertion order
    async fn load_texts(&self) -> Result<Vec<StoredDocument>>;

    /// Documents that carry an embedding, in insertion order
    async fn load_with_embeddings(&self) -> Result<Vec<StoredDocument>>;

    async fn stats(&self) -> Result<StoreStats>;
}
