//! # nous-embed
//!
//! Text embeddings for the NOUS document index. Runs sentence-transformer
//! ONNX models locally through FastEmbed and hands back unit-length f16
//! vectors ready to be stored next to the documents they describe.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nous_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // all-MiniLM-L6-v2 unless another model is named
//! let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
//!
//! let texts = vec!["Noticing a thought is not obeying it".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//! println!("{} embeddings of dimension {}", result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - [`FastEmbedProvider`]: pretrained models, weights downloaded on first use
//!   and cached process-wide.
//! - [`HashingProvider`]: weight-free lexical hashing, deterministic.
//!
//! Every provider reports a [`model_id`](EmbeddingProvider::model_id); vectors
//! with different ids must not be compared.

pub mod config;
pub mod error;
pub mod hashing;
pub mod provider;

pub use config::{DEFAULT_MODEL_NAME, EmbedConfig, EmbedConfigBuilder};
pub use error::{EmbedError, Result};
pub use hashing::HashingProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, FastEmbedProvider};
