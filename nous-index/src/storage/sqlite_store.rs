//! SQLite implementation of [`DocumentStore`].
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE documents (
//!     doc_id TEXT PRIMARY KEY,   -- caller-assigned id
//!     text TEXT NOT NULL,        -- raw content
//!     meta TEXT NOT NULL,        -- JSON object
//!     embedding BLOB,            -- f16 vector, NULL without a model
//!     model_id TEXT,             -- provider:model:dimension of `embedding`
//!     updated_at INTEGER NOT NULL
//! );
//! ```
//!
//! Every operation opens its own connection and closes it before returning,
//! so no handle outlives a call. Concurrent writers from other processes are
//! serialized by SQLite's file locking (WAL mode, 5 s busy timeout).

use super::{DocumentRecord, DocumentStore, Embedding, Metadata, StoreStats, StoredDocument};
use crate::error::{IndexError, Result};
use async_trait::async_trait;
use half::f16;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow, SqliteSynchronous};
use sqlx::{Connection, Row, SqliteConnection};
use std::path::{Path, PathBuf};
use std::time::Duration;

const UPSERT_SQL: &str = r#"
    INSERT INTO documents (doc_id, text, meta, embedding, model_id, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(doc_id) DO UPDATE SET
        text = excluded.text,
        meta = excluded.meta,
        embedding = excluded.embedding,
        model_id = excluded.model_id,
        updated_at = excluded.updated_at
"#;

/// Document store backed by a single SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    options: SqliteConnectOptions,
}

impl SqliteStore {
    /// Opens (creating if needed) the store at `path`.
    ///
    /// Creates the parent directory and the schema when absent. Safe to call
    /// against an existing store; existing rows are left alone.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| IndexError::StorageDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let store = Self {
            path: path.to_path_buf(),
            options,
        };

        let mut conn = store.connect().await?;
        Self::create_tables(&mut conn).await?;
        conn.close().await?;

        tracing::debug!("Opened document store at {}", path.display());
        Ok(store)
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        Ok(SqliteConnection::connect_with(&self.options).await?)
    }

    async fn create_tables(conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                doc_id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                meta TEXT NOT NULL,
                embedding BLOB,
                model_id TEXT,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_model_id ON documents(model_id)")
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    async fn fetch(
        &self,
        sql: &str,
        map_row: fn(&SqliteRow) -> Result<StoredDocument>,
    ) -> Result<Vec<StoredDocument>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(sql).fetch_all(&mut conn).await?;
        conn.close().await?;

        rows.iter().map(map_row).collect()
    }
}

/// Raw bytes of an embedding, in native byte order
pub fn encode_embedding(embedding: &[f16]) -> &[u8] {
    bytemuck::cast_slice::<f16, u8>(embedding)
}

/// Inverse of [`encode_embedding`]. Blobs read from SQLite carry no alignment guarantee.
pub fn decode_embedding(doc_id: &str, bytes: &[u8]) -> Result<Embedding> {
    if bytes.len() % std::mem::size_of::<f16>() != 0 {
        return Err(IndexError::CorruptEmbedding {
            doc_id: doc_id.to_string(),
            len: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(std::mem::size_of::<f16>())
        .map(bytemuck::pod_read_unaligned::<f16>)
        .collect())
}

fn row_to_document(row: &SqliteRow) -> Result<StoredDocument> {
    let doc_id: String = row.try_get("doc_id")?;
    let meta_json: String = row.try_get("meta")?;
    let embedding_bytes: Option<Vec<u8>> = row.try_get("embedding")?;

    let meta: Metadata = serde_json::from_str(&meta_json)?;
    let embedding = embedding_bytes
        .map(|bytes| decode_embedding(&doc_id, &bytes))
        .transpose()?;

    Ok(StoredDocument {
        text: row.try_get("text")?,
        model_id: row.try_get("model_id")?,
        updated_at: row.try_get("updated_at")?,
        doc_id,
        meta,
        embedding,
    })
}

/// Row from a query that leaves out `embedding`
fn row_to_text_document(row: &SqliteRow) -> Result<StoredDocument> {
    let meta_json: String = row.try_get("meta")?;
    Ok(StoredDocument {
        doc_id: row.try_get("doc_id")?,
        text: row.try_get("text")?,
        meta: serde_json::from_str(&meta_json)?,
        embedding: None,
        model_id: row.try_get("model_id")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Bind one record to the upsert statement and run it on `conn`
async fn write_record(
    conn: &mut SqliteConnection,
    record: &DocumentRecord,
    meta_json: &str,
    now: i64,
) -> Result<()> {
    sqlx::query(UPSERT_SQL)
        .bind(&record.doc_id)
        .bind(&record.text)
        .bind(meta_json)
        .bind(record.embedding.as_deref().map(encode_embedding))
        .bind(record.model_id.as_deref())
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert(&self, record: DocumentRecord) -> Result<()> {
        let meta_json = serde_json::to_string(&record.meta)?;
        let now = chrono::Utc::now().timestamp();

        let mut conn = self.connect().await?;
        write_record(&mut conn, &record, &meta_json, now).await?;
        conn.close().await?;

        tracing::debug!("Upserted document {}", record.doc_id);
        Ok(())
    }

    async fn upsert_batch(&self, records: Vec<DocumentRecord>) -> Result<usize> {
        // Serialize up front so a bad record fails before anything is written
        let meta_json = records
            .iter()
            .map(|record| serde_json::to_string(&record.meta))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let now = chrono::Utc::now().timestamp();

        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;
        for (record, meta_json) in records.iter().zip(&meta_json) {
            if let Err(e) = write_record(&mut tx, record, meta_json, now).await {
                tracing::warn!(
                    "Batch upsert failed at document {}, rolling back: {}",
                    record.doc_id,
                    e
                );
                tx.rollback().await?;
                return Err(e);
            }
        }
        tx.commit().await?;
        conn.close().await?;

        tracing::debug!("Upserted batch of {} documents", records.len());
        Ok(records.len())
    }

    async fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>> {
        let mut conn = self.connect().await?;
        let row = sqlx::query(
            "SELECT doc_id, text, meta, embedding, model_id, updated_at
             FROM documents WHERE doc_id = ?1",
        )
        .bind(doc_id)
        .fetch_optional(&mut conn)
        .await?;
        conn.close().await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn load_all(&self) -> Result<Vec<StoredDocument>> {
        self.fetch(
            "SELECT doc_id, text, meta, embedding, model_id, updated_at
             FROM documents ORDER BY rowid",
            row_to_document,
        )
        .await
    }

    async fn load_texts(&self) -> Result<Vec<StoredDocument>> {
        self.fetch(
            "SELECT doc_id, text, meta, model_id, updated_at
             FROM documents ORDER BY rowid",
            row_to_text_document,
        )
        .await
    }

    async fn load_with_embeddings(&self) -> Result<Vec<StoredDocument>> {
        self.fetch(
            "SELECT doc_id, text, meta, embedding, model_id, updated_at
             FROM documents WHERE embedding IS NOT NULL ORDER BY rowid",
            row_to_document,
        )
        .await
    }

    async fn stats(&self) -> Result<StoreStats> {
        let mut conn = self.connect().await?;

        let totals = sqlx::query("SELECT COUNT(*) AS total, COUNT(embedding) AS embedded FROM documents")
            .fetch_one(&mut conn)
            .await?;
        let per_model = sqlx::query(
            "SELECT COALESCE(model_id, 'unknown') AS model_id, COUNT(*) AS count
             FROM documents WHERE embedding IS NOT NULL
             GROUP BY model_id ORDER BY model_id",
        )
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        let mut stats = StoreStats {
            total_documents: totals.try_get::<i64, _>("total")? as usize,
            documents_with_embeddings: totals.try_get::<i64, _>("embedded")? as usize,
            ..StoreStats::default()
        };
        for row in per_model {
            let model_id: String = row.try_get("model_id")?;
            let count: i64 = row.try_get("count")?;
            *stats.embeddings_by_model.entry(model_id).or_default() += count as usize;
        }
        Ok(stats)
    }
}
