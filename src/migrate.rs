//! Index schema. Idempotent: safe to run on every open.

use sqlx::SqlitePool;

use repo_chat_core::StorageError;

use crate::db::backend;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    // One row per named collection
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            embedding_model TEXT,
            dims INTEGER,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(backend)?;

    // Documents keyed by (collection, id)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            content TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            embedding BLOB NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(backend)?;

    Ok(())
}
