//! Error types for the document index

use nous_embed::EmbedError;
use std::path::PathBuf;

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors surfaced by the store and the retrieval engine.
///
/// Storage and serialization failures propagate to the caller unchanged.
/// Missing embedding support is not an error: the index selects keyword
/// mode instead.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// SQLite failures, including schema creation and busy timeouts
    #[error("Storage error: {source}")]
    Storage {
        #[from]
        source: sqlx::Error,
    },

    /// Could not create the directory holding the database file
    #[error("Cannot create storage directory {path}: {source}")]
    StorageDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO errors reading configuration or content files
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Metadata or content failed to (de)serialize as JSON
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Metadata must be a JSON object
    #[error("Invalid metadata for document {doc_id}: {message}")]
    InvalidMetadata { doc_id: String, message: String },

    /// A stored embedding blob is not a whole number of f16 values
    #[error("Corrupt embedding for document {doc_id}: {len} bytes")]
    CorruptEmbedding { doc_id: String, len: usize },

    /// Failures from the embedding provider during upsert or search
    #[error("Embedding error: {source}")]
    Embedding {
        #[from]
        source: EmbedError,
    },

    /// Malformed TOML configuration
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: toml::de::Error,
    },
}
