//! In-memory [`Store`] implementation for tests.
//!
//! Collections live in a `HashMap` behind `std::sync::RwLock`. Vector
//! search is brute-force cosine similarity over the collection.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::StorageError;
use crate::models::{CollectionInfo, EmbeddedDocument, QueryHit};

use super::{check_dims, rank_hits, Store};

struct MemCollection {
    embedding_model: Option<String>,
    dims: Option<usize>,
    created_at: i64,
    docs: BTreeMap<String, EmbeddedDocument>,
}

/// In-memory vector store.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, MemCollection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemCollection>>, StorageError> {
        self.collections
            .read()
            .map_err(|_| StorageError::Backend("in-memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemCollection>>, StorageError> {
        self.collections
            .write()
            .map_err(|_| StorageError::Backend("in-memory store lock poisoned".into()))
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_collection(&self, name: &str) -> Result<(), StorageError> {
        self.write()?
            .entry(name.to_string())
            .or_insert_with(|| MemCollection {
                embedding_model: None,
                dims: None,
                created_at: now_secs(),
                docs: BTreeMap::new(),
            });
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.read()?.contains_key(name))
    }

    async fn upsert(
        &self,
        collection: &str,
        model: &str,
        docs: &[EmbeddedDocument],
    ) -> Result<(), StorageError> {
        let mut collections = self.write()?;
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StorageError::UnknownCollection(collection.to_string()))?;

        let dims = check_dims(collection, coll.dims, docs)?;
        if docs.is_empty() {
            return Ok(());
        }
        coll.dims = dims;
        if coll.embedding_model.is_none() {
            coll.embedding_model = Some(model.to_string());
        }
        for doc in docs {
            coll.docs.insert(doc.document.id.clone(), doc.clone());
        }
        Ok(())
    }

    async fn nearest(
        &self,
        collection: &str,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<QueryHit>, StorageError> {
        let collections = self.read()?;
        let coll = collections
            .get(collection)
            .ok_or_else(|| StorageError::UnknownCollection(collection.to_string()))?;

        let hits = coll
            .docs
            .values()
            .map(|d| QueryHit {
                document: d.document.clone(),
                score: cosine_similarity(query_vec, &d.embedding),
            })
            .collect();
        Ok(rank_hits(hits, k))
    }

    async fn count(&self, collection: &str) -> Result<usize, StorageError> {
        self.read()?
            .get(collection)
            .map(|c| c.docs.len())
            .ok_or_else(|| StorageError::UnknownCollection(collection.to_string()))
    }

    async fn collections(&self) -> Result<Vec<CollectionInfo>, StorageError> {
        let mut infos: Vec<CollectionInfo> = self
            .read()?
            .iter()
            .map(|(name, c)| CollectionInfo {
                name: name.clone(),
                embedding_model: c.embedding_model.clone(),
                dims: c.dims,
                created_at: c.created_at,
                documents: c.docs.len(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    fn doc(id: &str, content: &str, v: Vec<f32>) -> EmbeddedDocument {
        EmbeddedDocument {
            document: Document::from_path(id, content),
            embedding: v,
        }
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = InMemoryStore::new();
        store.create_collection("c").await.unwrap();
        store
            .upsert("c", "m", &[doc("a", "x", vec![1.0, 0.0])])
            .await
            .unwrap();
        store.create_collection("c").await.unwrap();
        assert_eq!(store.count("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryStore::new();
        store.create_collection("c").await.unwrap();
        store
            .upsert("c", "m", &[doc("a", "old", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("c", "m", &[doc("a", "new", vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("c").await.unwrap(), 1);
        let hits = store.nearest("c", &[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits[0].document.content, "new");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_nearest_orders_best_first() {
        let store = InMemoryStore::new();
        store.create_collection("c").await.unwrap();
        store
            .upsert(
                "c",
                "m",
                &[
                    doc("far", "", vec![0.0, 1.0]),
                    doc("near", "", vec![1.0, 0.1]),
                    doc("mid", "", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let hits = store.nearest("c", &[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.document.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryStore::new();
        store.create_collection("one").await.unwrap();
        store.create_collection("two").await.unwrap();
        store
            .upsert("one", "m", &[doc("a", "", vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("two").await.unwrap(), 0);
        assert!(store.nearest("two", &[1.0], 3).await.unwrap().is_empty());
        let infos = store.collections().await.unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].name, "one");
        assert_eq!(infos[0].dims, Some(1));
        assert_eq!(infos[1].dims, None);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = InMemoryStore::new();
        assert!(!store.collection_exists("nope").await.unwrap());
        assert!(matches!(
            store.count("nope").await,
            Err(StorageError::UnknownCollection(_))
        ));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryStore::new();
        store.create_collection("c").await.unwrap();
        store
            .upsert("c", "m", &[doc("a", "", vec![1.0, 0.0, 0.0, 0.0])])
            .await
            .unwrap();
        let err = store
            .upsert("c", "m", &[doc("b", "", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DimensionMismatch { expected: 4, actual: 3, .. }));
        assert_eq!(store.count("c").await.unwrap(), 1);
    }
}
