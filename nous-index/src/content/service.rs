//! Psychoeducation retrieval for the CBT/DBT/ACT chat flows.
//!
//! Articles are indexed under `psycho_<id>` with metadata
//! `{"type": "psychoeducation", "title": ...}`. Searches go through the
//! [`SemanticIndex`]; if the index fails for any reason the service answers
//! from its in-memory library instead, so callers never see an error.
//!
//! The application owns one `ContentService` and hands it to whichever
//! component needs content; there is no global instance.

use super::library::{Article, ContentLibrary};
use crate::error::Result;
use crate::retrieval::{SearchHit, SemanticIndex};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

/// Namespace for article ids inside the shared document index
pub const DOC_PREFIX: &str = "psycho_";

/// Metadata `type` tag for indexed articles
pub const CONTENT_TYPE: &str = "psychoeducation";

/// A search result in the shape the chat flows consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentHit {
    /// Article id without the namespace prefix
    pub id: String,
    pub title: String,
    pub content: String,
    /// Relevance from the index; `None` for fallback matches
    pub score: Option<f32>,
}

pub struct ContentService {
    index: SemanticIndex,
    library: ContentLibrary,
}

impl ContentService {
    /// Index every article in `library`.
    ///
    /// A failed load is logged and otherwise ignored: searches will then be
    /// served by the fallback scan.
    pub async fn new(index: SemanticIndex, library: ContentLibrary) -> Self {
        let service = Self { index, library };
        match service.load_library().await {
            Ok(count) => info!("Indexed {} psychoeducation articles", count),
            Err(e) => warn!("Failed to index psychoeducation content: {}", e),
        }
        service
    }

    async fn load_library(&self) -> Result<usize> {
        let items = self.library.articles().iter().map(|article| {
            (
                format!("{DOC_PREFIX}{}", article.id),
                format!("{}\n\n{}", article.title, article.body),
                json!({"type": CONTENT_TYPE, "title": article.title}),
            )
        });
        self.index.bulk_upsert(items).await
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    pub fn library(&self) -> &ContentLibrary {
        &self.library
    }

    /// Up to `top_k` articles relevant to `query`. Never fails.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<ContentHit> {
        match self.index.search(query, top_k).await {
            Ok(hits) => hits
                .into_iter()
                .filter_map(|hit| self.to_content_hit(hit))
                .collect(),
            Err(e) => {
                warn!("Content search failed, using keyword fallback: {}", e);
                self.fallback_search(query, top_k)
            }
        }
    }

    /// Case-insensitive substring scan over titles and bodies, in library order
    pub fn fallback_search(&self, query: &str, top_k: usize) -> Vec<ContentHit> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.library
            .articles()
            .iter()
            .filter(|article| {
                article.title.to_lowercase().contains(&needle)
                    || article.body.to_lowercase().contains(&needle)
            })
            .take(top_k)
            .map(|article| ContentHit {
                id: article.id.clone(),
                title: article.title.clone(),
                content: article.body.clone(),
                score: None,
            })
            .collect()
    }

    /// Reshape an index hit; other documents sharing the index are dropped
    fn to_content_hit(&self, hit: SearchHit) -> Option<ContentHit> {
        let id = hit.doc_id.strip_prefix(DOC_PREFIX)?.to_string();
        let article: Option<&Article> = self.library.get(&id);

        let title = hit
            .meta
            .get("title")
            .and_then(|title| title.as_str())
            .map(str::to_string)
            .or_else(|| article.map(|a| a.title.clone()))
            .unwrap_or_default();
        let content = article.map(|a| a.body.clone()).unwrap_or(hit.text);

        Some(ContentHit {
            id,
            title,
            content,
            score: Some(hit.score),
        })
    }
}
