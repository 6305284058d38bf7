//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use derive_builder::Builder;
use fastembed::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when no name is configured.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Models fastembed ships ONNX weights for, by their sentence-transformers name.
const KNOWN_MODELS: &[(&str, EmbeddingModel)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15),
    (
        "paraphrase-multilingual-MiniLM-L12-v2",
        EmbeddingModel::ParaphraseMLMiniLML12V2,
    ),
];

/// Configuration for embedding models
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
#[builder(setter(into))]
pub struct EmbedConfig {
    /// Name of the pretrained model, e.g. "all-MiniLM-L6-v2"
    #[builder(default = "DEFAULT_MODEL_NAME.to_string()")]
    pub model_name: String,
    /// Where fastembed keeps downloaded weights; fastembed's default when unset
    #[builder(default)]
    pub cache_dir: Option<PathBuf>,
    /// Maximum number of texts handed to the model at once
    #[builder(default = "16")]
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    #[builder(default = "true")]
    pub normalize: bool,
    /// Show a progress bar while downloading weights
    #[builder(default = "false")]
    pub show_download_progress: bool,
}

impl EmbedConfig {
    /// Create a new embedding configuration using the builder
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Configuration for a named model with every other setting at its default
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Set the weights cache directory (builder style)
    pub fn with_cache_dir<P: AsRef<Path>>(self, cache_dir: P) -> Self {
        Self {
            cache_dir: Some(cache_dir.as_ref().to_path_buf()),
            ..self
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Resolve the configured name to a fastembed model.
    ///
    /// Matching ignores ASCII case and an optional `sentence-transformers/`
    /// or `BAAI/` organisation prefix.
    pub fn fastembed_model(&self) -> Result<EmbeddingModel> {
        let name = self.model_name.trim();
        let bare = name
            .strip_prefix("sentence-transformers/")
            .or_else(|| name.strip_prefix("BAAI/"))
            .unwrap_or(name);

        KNOWN_MODELS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(bare))
            .map(|(_, model)| model.clone())
            .ok_or_else(|| EmbedError::UnknownModel {
                name: self.model_name.clone(),
            })
    }

    /// Names accepted by [`EmbedConfig::fastembed_model`]
    pub fn known_models() -> impl Iterator<Item = &'static str> {
        KNOWN_MODELS.iter().map(|(name, _)| *name)
    }

    /// Validate settings that fastembed would otherwise reject late
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        self.fastembed_model()?;
        tracing::debug!("Model configuration valid for: {}", self.model_name);
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            cache_dir: None,
            batch_size: 16,
            normalize: true,
            show_download_progress: false,
        }
    }
}
