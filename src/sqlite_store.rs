//! SQLite-backed [`Store`] implementation.
//!
//! Vectors are stored as little-endian f32 BLOBs next to the document text
//! and metadata. Nearest-neighbor search is a brute-force cosine scan over
//! one collection, which is plenty for a single repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use repo_chat_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use repo_chat_core::models::{CollectionInfo, Document, DocumentMetadata, EmbeddedDocument, QueryHit};
use repo_chat_core::store::{check_dims, rank_hits, Store};
use repo_chat_core::StorageError;

use crate::db::{self, backend};
use crate::migrate;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the index under `persist_dir`, creating the directory, database
    /// file and schema as needed.
    pub async fn open(persist_dir: &Path) -> Result<Self, StorageError> {
        let pool = db::connect(persist_dir).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_collection(&self, name: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO collections (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StorageError> {
        let exists: bool = sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(exists)
    }

    async fn upsert(
        &self,
        collection: &str,
        model: &str,
        docs: &[EmbeddedDocument],
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query("SELECT dims FROM collections WHERE name = ?")
            .bind(collection)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?
            .ok_or_else(|| StorageError::UnknownCollection(collection.to_string()))?;
        let recorded: Option<i64> = row.get("dims");

        let dims = check_dims(collection, recorded.map(|d| d as usize), docs)?;
        if docs.is_empty() {
            return Ok(());
        }

        if recorded.is_none() {
            sqlx::query("UPDATE collections SET dims = ?, embedding_model = ? WHERE name = ?")
                .bind(dims.map(|d| d as i64))
                .bind(model)
                .bind(collection)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        let now = Utc::now().timestamp();
        for doc in docs {
            let metadata_json = serde_json::to_string(&doc.document.metadata)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, content, metadata_json, embedding, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    content = excluded.content,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(collection)
            .bind(&doc.document.id)
            .bind(&doc.document.content)
            .bind(metadata_json)
            .bind(vec_to_blob(&doc.embedding))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn nearest(
        &self,
        collection: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<QueryHit>, StorageError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, content, metadata_json, embedding FROM documents WHERE collection = ?",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let metadata_json: String = row.get("metadata_json");
            let metadata: DocumentMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
                StorageError::Corrupt(format!("metadata for '{}': {}", id, e))
            })?;
            let blob: Vec<u8> = row.get("embedding");
            let score = cosine_similarity(query_vec, &blob_to_vec(&blob));
            hits.push(QueryHit {
                document: Document {
                    id,
                    content: row.get("content"),
                    metadata,
                },
                score,
            });
        }

        Ok(rank_hits(hits, k))
    }

    async fn count(&self, collection: &str) -> Result<usize, StorageError> {
        if !self.collection_exists(collection).await? {
            return Err(StorageError::UnknownCollection(collection.to_string()));
        }
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(n as usize)
    }

    async fn collections(&self) -> Result<Vec<CollectionInfo>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT c.name, c.embedding_model, c.dims, c.created_at,
                   (SELECT COUNT(*) FROM documents d WHERE d.collection = c.name) AS documents
            FROM collections c
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows
            .iter()
            .map(|row| {
                let dims: Option<i64> = row.get("dims");
                let documents: i64 = row.get("documents");
                CollectionInfo {
                    name: row.get("name"),
                    embedding_model: row.get("embedding_model"),
                    dims: dims.map(|d| d as usize),
                    created_at: row.get("created_at"),
                    documents: documents as usize,
                }
            })
            .collect())
    }
}
