//! Storage abstraction for the vector index.
//!
//! The [`Store`] trait holds named collections of embedded documents and
//! answers nearest-neighbor queries over one collection at a time. The
//! SQLite backend lives in the app crate; [`memory::InMemoryStore`] is used
//! by tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{CollectionInfo, EmbeddedDocument, QueryHit};

/// Abstract vector storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_collection`](Store::create_collection) | Create a collection if it does not exist |
/// | [`collection_exists`](Store::collection_exists) | Check for a collection by name |
/// | [`upsert`](Store::upsert) | Insert or replace documents by id |
/// | [`nearest`](Store::nearest) | Top-k cosine similarity search |
/// | [`count`](Store::count) | Number of documents in a collection |
/// | [`collections`](Store::collections) | List all collections |
#[async_trait]
pub trait Store: Send + Sync {
    /// Create the collection. Idempotent.
    async fn create_collection(&self, name: &str) -> Result<(), StorageError>;

    async fn collection_exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Insert documents, replacing content, metadata and embedding of any
    /// existing document with the same id.
    ///
    /// The first write to a collection records `model` and the vector
    /// dimensionality; later writes with a different dimensionality fail
    /// with [`StorageError::DimensionMismatch`].
    async fn upsert(
        &self,
        collection: &str,
        model: &str,
        docs: &[EmbeddedDocument],
    ) -> Result<(), StorageError>;

    /// Up to `k` documents most similar to `query_vec`, best first.
    async fn nearest(
        &self,
        collection: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<QueryHit>, StorageError>;

    async fn count(&self, collection: &str) -> Result<usize, StorageError>;

    async fn collections(&self) -> Result<Vec<CollectionInfo>, StorageError>;
}

/// Sort hits by score (desc) then id (asc) and keep the first `k`.
pub fn rank_hits(mut hits: Vec<QueryHit>, k: usize) -> Vec<QueryHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.document.id.cmp(&b.document.id))
    });
    hits.truncate(k);
    hits
}

/// Check that every vector in `docs` matches the collection's recorded
/// dimensionality (or, for a fresh collection, the first vector's).
///
/// Returns the dimensionality the collection holds after the write.
pub fn check_dims(
    collection: &str,
    recorded: Option<usize>,
    docs: &[EmbeddedDocument],
) -> Result<Option<usize>, StorageError> {
    let mut expected = recorded;
    for doc in docs {
        let actual = doc.embedding.len();
        match expected {
            Some(dims) if dims != actual => {
                return Err(StorageError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: dims,
                    actual,
                });
            }
            Some(_) => {}
            None => expected = Some(actual),
        }
    }
    Ok(expected)
}
