//! Feature-hashing embedding provider.
//!
//! Projects lower-cased word tokens into a fixed number of buckets with FNV
//! hashing and normalizes the result. It needs no model weights, so it is
//! useful offline and as a deterministic stand-in for tests. Similarity is
//! purely lexical: texts sharing words score high, paraphrases do not.

use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, normalize};
use async_trait::async_trait;
use fnv::FnvHasher;
use half::f16;
use std::hash::Hasher;

/// Deterministic bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
    model_name: String,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::invalid_config(
                "hashing dimension must be at least 1",
            ));
        }
        Ok(Self {
            dimension,
            model_name: format!("hashing-{dimension}"),
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f16> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty());

        for token in tokens {
            let mut hasher = FnvHasher::default();
            hasher.write(token.to_lowercase().as_bytes());
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            // Top bit picks the sign so unrelated tokens tend to cancel
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        normalize(&mut vector);
        vector.into_iter().map(f16::from_f32).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|text| self.embed_one(text)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
