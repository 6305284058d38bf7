//! Index configuration, loadable from TOML.
//!
//! ```toml
//! storage_path = "data/semantic_index.db"
//! model_name = "all-MiniLM-L6-v2"
//! model_cache_dir = "data/models"
//! embeddings_enabled = true
//! default_top_k = 10
//! ```

use crate::error::Result;
use nous_embed::{DEFAULT_MODEL_NAME, EmbedConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of hits returned when the caller does not say otherwise
pub const DEFAULT_TOP_K: usize = 10;

/// Settings for a [`SemanticIndex`](crate::SemanticIndex)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// SQLite file backing the document store
    pub storage_path: PathBuf,
    /// Pretrained sentence-embedding model
    pub model_name: String,
    /// Directory for downloaded model weights
    pub model_cache_dir: Option<PathBuf>,
    /// When false the index never tries to load a model and stays in keyword mode
    pub embeddings_enabled: bool,
    pub default_top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data").join("semantic_index.db"),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_cache_dir: None,
            embeddings_enabled: true,
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

impl IndexConfig {
    /// Configuration for a store at `storage_path` using the default model
    pub fn new<P: AsRef<Path>>(storage_path: P) -> Self {
        Self {
            storage_path: storage_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_model_name(self, model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..self
        }
    }

    pub fn with_model_cache_dir<P: AsRef<Path>>(self, dir: P) -> Self {
        Self {
            model_cache_dir: Some(dir.as_ref().to_path_buf()),
            ..self
        }
    }

    pub fn with_embeddings(self, embeddings_enabled: bool) -> Self {
        Self {
            embeddings_enabled,
            ..self
        }
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    /// Embedding settings derived from this configuration
    pub fn embed_config(&self) -> EmbedConfig {
        let config = EmbedConfig::new(self.model_name.clone());
        match &self.model_cache_dir {
            Some(dir) => config.with_cache_dir(dir),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = IndexConfig::new("/tmp/nous/index.db");
        assert_eq!(config.storage_path, PathBuf::from("/tmp/nous/index.db"));
        assert_eq!(config.model_name, "all-MiniLM-L6-v2");
        assert!(config.embeddings_enabled);
        assert_eq!(config.default_top_k, 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<()> {
        let config = IndexConfig::from_toml_str(
            r#"
            storage_path = "var/content.db"
            embeddings_enabled = false
            "#,
        )?;
        assert_eq!(config.storage_path, PathBuf::from("var/content.db"));
        assert!(!config.embeddings_enabled);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
        assert_eq!(config.model_cache_dir, None);
        Ok(())
    }

    #[test]
    fn test_toml_file_round_trip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nous.toml");
        let config = IndexConfig::new(dir.path().join("index.db"))
            .with_model_name("bge-small-en-v1.5")
            .with_model_cache_dir(dir.path().join("models"));
        std::fs::write(&path, toml::to_string(&config)?)?;

        assert_eq!(IndexConfig::from_toml_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_invalid_toml() {
        let err = IndexConfig::from_toml_str("default_top_k = \"many\"").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_embed_config() {
        let config = IndexConfig::new("index.db")
            .with_model_name("all-MiniLM-L12-v2")
            .with_model_cache_dir("models");
        let embed = config.embed_config();
        assert_eq!(embed.model_name, "all-MiniLM-L12-v2");
        assert_eq!(embed.cache_dir, Some(PathBuf::from("models")));
    }
}
