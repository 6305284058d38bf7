//! nous-index: semantic document index for the NOUS assistant
//!
//! Stores documents (id, text, JSON metadata, optional embedding) in a single
//! SQLite file and ranks them against free-text queries. When a sentence
//! embedding model is available documents are ranked by cosine similarity;
//! otherwise the index falls back to counting keyword occurrences. The choice
//! is made once, when the index is opened.
//!
//! ## Key Modules
//!
//! - **[`storage`]**: `DocumentStore` trait and its SQLite implementation
//! - **[`retrieval`]**: `SemanticIndex` and the keyword/embedding scorers
//! - **[`content`]**: psychoeducation articles served on top of the index
//! - **[`config`]**: TOML-loadable index settings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nous_index::{IndexConfig, SemanticIndex};
//! use serde_json::json;
//!
//! # async fn example() -> nous_index::Result<()> {
//! let index = SemanticIndex::open(&IndexConfig::new("data/semantic_index.db")).await?;
//!
//! let count = index
//!     .bulk_upsert(vec![
//!         ("a", "Paced breathing lengthens the exhale", json!({"topic": "dbt"})),
//!         ("b", "Values are chosen directions", json!({"topic": "act"})),
//!     ])
//!     .await?;
//! assert_eq!(count, 2);
//!
//! let hits = index.search("breathing", 10).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ContentService ─→ SemanticIndex ─→ Scorer (Keyword | Embedding)
//!                        │                        │
//!                        └─→ DocumentStore ←──────┘
//!                              (SQLite)
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod retrieval;
pub mod storage;

pub use config::{DEFAULT_TOP_K, IndexConfig};
pub use error::{IndexError, Result};
pub use retrieval::{IndexStats, SearchHit, SearchMode, SemanticIndex};
pub use storage::Metadata;
