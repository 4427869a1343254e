//! Indexing orchestration: collect a repository and load it into a
//! collection.
//!
//! ```text
//! collect_documents ──▶ Engine::open_index ──▶ Index::add ──▶ Index
//! ```
//!
//! Indexing is one-shot: every eligible file is embedded and upserted.
//! Re-indexing the same repository upserts by path into the same
//! collection.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use repo_chat_core::{Error, Result};

use crate::collector::collect_documents;
use crate::engine::Engine;
use crate::index::Index;
use crate::session::Session;

/// What an index build did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub collection: String,
    pub root: PathBuf,
    pub documents_indexed: usize,
    pub skipped_unreadable: usize,
    pub skipped_empty: usize,
    pub skipped_extension: usize,
}

/// Collect `repo_dir` and add every document to `collection`.
///
/// A repository with no eligible files still yields an (empty) index.
pub async fn build_index(
    engine: &Engine,
    repo_dir: &Path,
    collection: &str,
) -> Result<(Index, IndexSummary)> {
    let collector_cfg = engine.config().collector.clone();
    let root = repo_dir.to_path_buf();
    let collected = tokio::task::spawn_blocking(move || collect_documents(&root, &collector_cfg))
        .await
        .map_err(|e| Error::Collection {
            path: repo_dir.display().to_string(),
            reason: format!("collector task failed: {}", e),
        })??;

    let index = engine.open_index(collection).await?;

    let documents_indexed = if collected.documents.is_empty() {
        warn!(
            root = %repo_dir.display(),
            collection,
            "No indexable files found; index is empty"
        );
        0
    } else {
        index.add(&collected.documents).await?
    };

    let summary = IndexSummary {
        collection: collection.to_string(),
        root: repo_dir.to_path_buf(),
        documents_indexed,
        skipped_unreadable: collected.skipped_unreadable,
        skipped_empty: collected.skipped_empty,
        skipped_extension: collected.skipped_extension,
    };
    info!(
        root = %repo_dir.display(),
        collection,
        indexed = summary.documents_indexed,
        skipped_unreadable = summary.skipped_unreadable,
        skipped_empty = summary.skipped_empty,
        "Built index"
    );
    Ok((index, summary))
}

/// Index the repository at `local_path` and make it the session's active
/// index, starting a fresh conversation.
///
/// On failure the session keeps its previous index and history.
pub async fn index_repository(
    engine: &Engine,
    session: &mut Session,
    local_path: &Path,
) -> Result<IndexSummary> {
    let canonical = local_path.canonicalize().map_err(|e| Error::Collection {
        path: local_path.display().to_string(),
        reason: e.to_string(),
    })?;
    let collection = engine.collection_name_for(&canonical)?;

    let (index, summary) = build_index(engine, &canonical, &collection).await?;
    session.attach(index);
    Ok(summary)
}
