//! End-to-end behavior of `SemanticIndex` against a real SQLite file.
//!
//! Embedding-mode tests use the feature-hashing provider so they run without
//! downloading model weights.

use anyhow::Result;
use async_trait::async_trait;
use nous_embed::{EmbeddingProvider, EmbeddingResult, HashingProvider};
use nous_index::{IndexConfig, IndexError, SearchMode, SemanticIndex};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// How a misbehaving provider mangles its output
#[derive(Clone, Copy)]
enum Defect {
    DropsLastVector,
    TruncatesVectors,
}

/// Wraps a working provider and returns malformed results
struct FaultyProvider {
    inner: HashingProvider,
    defect: Defect,
}

#[async_trait]
impl EmbeddingProvider for FaultyProvider {
    async fn embed_texts(&self, texts: &[String]) -> nous_embed::Result<EmbeddingResult> {
        let mut embeddings = self.inner.embed_texts(texts).await?.embeddings;
        match self.defect {
            Defect::DropsLastVector => {
                embeddings.pop();
            }
            Defect::TruncatesVectors => {
                for embedding in &mut embeddings {
                    embedding.truncate(embedding.len() / 2);
                }
            }
        }
        Ok(EmbeddingResult::new(embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.inner.embedding_dimension()
    }

    fn provider_name(&self) -> &str {
        "faulty"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

async fn keyword_index(path: &Path) -> Result<SemanticIndex> {
    Ok(SemanticIndex::with_provider(path, None).await?)
}

async fn hashing_index(path: &Path, dimension: usize) -> Result<SemanticIndex> {
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingProvider::new(dimension)?);
    Ok(SemanticIndex::with_provider(path, Some(provider)).await?)
}

#[tokio::test]
async fn test_disabled_embeddings_open_in_keyword_mode() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = IndexConfig::new(temp_dir.path().join("data").join("index.db")).with_embeddings(false);

    let index = SemanticIndex::open(&config).await?;
    assert_eq!(index.mode(), SearchMode::Keyword);
    assert_eq!(index.model_id(), None);
    assert!(config.storage_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_upsert_overwrites_whole_document() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = keyword_index(&temp_dir.path().join("index.db")).await?;

    index
        .upsert("note", "original wording", &json!({"type": "journal", "mood": 3}))
        .await?;
    index
        .upsert("note", "rewritten wording", &json!({"type": "journal"}))
        .await?;

    let stats = index.stats().await?;
    assert_eq!(stats.storage.total_documents, 1);

    let stored = index.get("note").await?.expect("document exists");
    assert_eq!(stored.text, "rewritten wording");
    assert_eq!(stored.meta.get("mood"), None);

    assert!(index.search("original", 10).await?.is_empty());
    assert_eq!(index.search("rewritten", 10).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_bulk_upsert_counts_items_and_last_duplicate_wins() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = keyword_index(&temp_dir.path().join("index.db")).await?;

    let count = index
        .bulk_upsert(vec![
            ("a", "first a", json!({})),
            ("b", "only b", json!({})),
            ("a", "second a", json!({"rev": 2})),
        ])
        .await?;
    assert_eq!(count, 3);
    assert_eq!(index.stats().await?.storage.total_documents, 2);

    let a = index.get("a").await?.expect("a exists");
    assert_eq!(a.text, "second a");
    assert_eq!(a.meta.get("rev"), Some(&json!(2)));

    let empty: Vec<(String, String, serde_json::Value)> = Vec::new();
    assert_eq!(index.bulk_upsert(empty).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_bulk_upsert_with_bad_metadata_writes_nothing() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = keyword_index(&temp_dir.path().join("index.db")).await?;

    let result = index
        .bulk_upsert(vec![
            ("good", "fine", json!({"ok": true})),
            ("bad", "not fine", json!("just a string")),
        ])
        .await;
    assert!(result.is_err());
    assert_eq!(index.stats().await?.storage.total_documents, 0);
    Ok(())
}

#[tokio::test]
async fn test_blank_query_returns_nothing_in_both_modes() -> Result<()> {
    let temp_dir = tempdir()?;
    let keyword = keyword_index(&temp_dir.path().join("keyword.db")).await?;
    let embedding = hashing_index(&temp_dir.path().join("embedding.db"), 64).await?;

    for index in [&keyword, &embedding] {
        index.upsert("doc", "some text", &json!({})).await?;
        assert!(index.search("", 10).await?.is_empty());
        assert!(index.search("   \t", 10).await?.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_keyword_ranking_by_occurrence_count() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = keyword_index(&temp_dir.path().join("index.db")).await?;

    index
        .bulk_upsert(vec![
            ("d1", "cat cat dog", json!({})),
            ("d2", "dog", json!({})),
            ("d3", "bird", json!({})),
        ])
        .await?;

    let hits = index.search("dog", 10).await?;
    let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["d1", "d2"]);
    assert_eq!(hits[0].score, 1.0);

    let hits = index.search("CAT", 10).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, "d1");
    assert_eq!(hits[0].score, 2.0);
    Ok(())
}

#[tokio::test]
async fn test_top_k_bounds_results() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = keyword_index(&temp_dir.path().join("index.db")).await?;

    let items: Vec<(String, String, serde_json::Value)> = (0..8)
        .map(|i| (format!("doc{i}"), "breathing ".repeat(i + 1), json!({"i": i})))
        .collect();
    index.bulk_upsert(items).await?;

    let hits = index.search("breathing", 3).await?;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].doc_id, "doc7");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

    assert!(index.search("breathing", 0).await?.is_empty());
    assert_eq!(index.search("breathing", 100).await?.len(), 8);
    Ok(())
}

#[tokio::test]
async fn test_metadata_round_trips_through_search() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = keyword_index(&temp_dir.path().join("index.db")).await?;

    let meta = json!({
        "type": "psychoeducation",
        "title": "Opposite Action",
        "tags": ["dbt", "emotion regulation"],
        "nested": {"level": 2, "reviewed": true}
    });
    index.upsert("psycho_oa", "Act opposite to the urge", &meta).await?;

    let hits = index.search("urge", 1).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(serde_json::Value::Object(hits[0].meta.clone()), meta);
    assert_eq!(hits[0].text, "Act opposite to the urge");
    Ok(())
}

#[tokio::test]
async fn test_embedding_search_prefers_matching_document() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = hashing_index(&temp_dir.path().join("index.db"), 256).await?;
    assert_eq!(index.mode(), SearchMode::Embedding);
    assert_eq!(index.model_id().as_deref(), Some("hashing:hashing-256:256"));

    index
        .bulk_upsert(vec![
            ("sleep", "keep a consistent wake time", json!({})),
            ("breath", "paced breathing slows the heart", json!({})),
            ("values", "values are chosen directions", json!({})),
        ])
        .await?;

    let hits = index.search("paced breathing slows the heart", 3).await?;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].doc_id, "breath");
    assert!((hits[0].score - 1.0).abs() < 0.01, "self-similarity is ~1");
    assert!(hits.iter().all(|h| h.score <= 1.01 && h.score >= -1.01));
    Ok(())
}

#[tokio::test]
async fn test_embedding_search_skips_documents_without_vectors() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("index.db");

    // Written while no model was available
    let keyword = keyword_index(&path).await?;
    keyword.upsert("plain", "grounding exercise", &json!({})).await?;

    let embedding = hashing_index(&path, 64).await?;
    embedding
        .upsert("vector", "grounding exercise", &json!({}))
        .await?;

    let hits = embedding.search("grounding exercise", 10).await?;
    let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["vector"]);

    // Keyword mode still sees both
    assert_eq!(keyword.search("grounding", 10).await?.len(), 2);

    let stats = embedding.stats().await?;
    assert_eq!(stats.storage.total_documents, 2);
    assert_eq!(stats.storage.documents_with_embeddings, 1);
    Ok(())
}

#[tokio::test]
async fn test_embedding_search_skips_other_models() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("index.db");

    let small = hashing_index(&path, 32).await?;
    small.upsert("old", "wise mind", &json!({})).await?;

    let large = hashing_index(&path, 128).await?;
    large.upsert("new", "wise mind", &json!({})).await?;

    let hits = large.search("wise mind", 10).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, "new");

    let stats = large.stats().await?;
    assert_eq!(stats.storage.embeddings_by_model.len(), 2);
    assert_eq!(
        stats.storage.embeddings_by_model.get("hashing:hashing-32:32"),
        Some(&1)
    );
    Ok(())
}

#[tokio::test]
async fn test_reopen_preserves_documents() -> Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("index.db");

    {
        let index = keyword_index(&path).await?;
        index
            .bulk_upsert(vec![
                ("a", "thought record", json!({"n": 1})),
                ("b", "behavioral activation", json!({"n": 2})),
            ])
            .await?;
    }

    let reopened = keyword_index(&path).await?;
    assert_eq!(reopened.stats().await?.storage.total_documents, 2);
    let hits = reopened.search("thought", 10).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].meta.get("n"), Some(&json!(1)));
    Ok(())
}

#[tokio::test]
async fn test_missing_vectors_fail_the_write() -> Result<()> {
    let temp_dir = tempdir()?;

    for defect in [Defect::DropsLastVector, Defect::TruncatesVectors] {
        let path = temp_dir.path().join(match defect {
            Defect::DropsLastVector => "short.db",
            Defect::TruncatesVectors => "narrow.db",
        });
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(FaultyProvider {
            inner: HashingProvider::new(32)?,
            defect,
        });
        let index = SemanticIndex::with_provider(&path, Some(provider)).await?;

        let result = index
            .bulk_upsert(vec![
                ("a", "opposite action", json!({})),
                ("b", "wise mind", json!({})),
            ])
            .await;
        assert!(matches!(result, Err(IndexError::Embedding { .. })));

        let result = index.upsert("c", "values", &json!({})).await;
        assert!(matches!(result, Err(IndexError::Embedding { .. })));

        assert_eq!(index.stats().await?.storage.total_documents, 0);
        assert_eq!(index.get("a").await?, None);
        assert_eq!(index.get("b").await?, None);
    }
    Ok(())
}

#[tokio::test]
async fn test_query_whitespace_is_part_of_the_query() -> Result<()> {
    let temp_dir = tempdir()?;
    let index = keyword_index(&temp_dir.path().join("index.db")).await?;

    index
        .bulk_upsert(vec![
            ("bare", "dog", json!({})),
            ("phrase", "hot dog stand", json!({})),
        ])
        .await?;

    let hits = index.search(" dog", 10).await?;
    let ids: Vec<&str> = hits.iter().map(|h| h.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["phrase"]);

    assert_eq!(index.search("dog", 10).await?.len(), 2);
    Ok(())
}

