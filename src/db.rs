//! SQLite connection management for the on-disk index.
//!
//! The index lives in `<persist_dir>/index.sqlite`. The directory is created
//! if missing and the database is opened in WAL mode, so queries from one
//! session can proceed while another session's build commits a batch.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

use repo_chat_core::StorageError;

pub const DB_FILE_NAME: &str = "index.sqlite";

/// Path of the database file inside `persist_dir`.
pub fn db_path(persist_dir: &Path) -> PathBuf {
    persist_dir.join(DB_FILE_NAME)
}

/// Open (creating if needed) the index database under `persist_dir`.
///
/// # Errors
///
/// [`StorageError::Unwritable`] if the directory cannot be created or the
/// database file cannot be opened for writing.
pub async fn connect(persist_dir: &Path) -> Result<SqlitePool, StorageError> {
    let unwritable = |reason: String| StorageError::Unwritable {
        path: persist_dir.display().to_string(),
        reason,
    };

    std::fs::create_dir_all(persist_dir).map_err(|e| unwritable(e.to_string()))?;

    let options = SqliteConnectOptions::new()
        .filename(db_path(persist_dir))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| unwritable(e.to_string()))
}

/// Convert a backend error into a [`StorageError`].
pub fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}
