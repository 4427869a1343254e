//! Named vector-index collections and the per-collection lock table.
//!
//! An [`Index`] is a handle on one collection in the [`Store`] plus the
//! embedding provider that fills it. Writers hold the collection's write
//! lock for the whole of [`Index::add`]; queries take the read lock, so a
//! query never sees a half-written batch and two adds never interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info};

use repo_chat_core::embedding::EmbeddingProvider;
use repo_chat_core::models::{Document, EmbeddedDocument, QueryHit};
use repo_chat_core::prompt::truncate_to_boundary;
use repo_chat_core::store::Store;
use repo_chat_core::{Error, Result};

/// One lock per collection name, shared by every handle on that collection.
#[derive(Default)]
pub struct CollectionLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl CollectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, collection: &str) -> Arc<RwLock<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(collection.to_string()).or_default())
    }
}

/// Handle on a named collection.
#[derive(Clone)]
pub struct Index {
    name: String,
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingProvider>,
    lock: Arc<RwLock<()>>,
    batch_size: usize,
    max_input_chars: usize,
}

impl Index {
    /// Open `name`, creating the collection if it does not exist.
    pub async fn open_or_create(
        name: &str,
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingProvider>,
        locks: &CollectionLocks,
        batch_size: usize,
        max_input_chars: usize,
    ) -> Result<Self> {
        store.create_collection(name).await?;
        Ok(Self {
            name: name.to_string(),
            store,
            embedder,
            lock: locks.lock_for(name),
            batch_size: batch_size.max(1),
            max_input_chars,
        })
    }

    /// Open `name` only if it was created earlier.
    pub async fn open_existing(
        name: &str,
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingProvider>,
        locks: &CollectionLocks,
        batch_size: usize,
        max_input_chars: usize,
    ) -> Result<Option<Self>> {
        if !store.collection_exists(name).await? {
            return Ok(None);
        }
        Self::open_or_create(name, store, embedder, locks, batch_size, max_input_chars)
            .await
            .map(Some)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embed and upsert `docs` in batches. Returns the number written.
    ///
    /// Each batch is committed once its embeddings come back, so a provider
    /// failure part-way leaves earlier batches in place. Re-running the add
    /// is safe since writes replace by id.
    pub async fn add(&self, docs: &[Document]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }
        let _guard = self.lock.write().await;

        let mut written = 0;
        for (n, batch) in docs.chunks(self.batch_size).enumerate() {
            let texts: Vec<String> = batch
                .iter()
                .map(|d| embedding_input(&d.content, self.max_input_chars))
                .collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(Error::EmbeddingProvider)?;

            let embedded: Vec<EmbeddedDocument> = batch
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(document, embedding)| EmbeddedDocument {
                    document,
                    embedding,
                })
                .collect();
            self.store
                .upsert(&self.name, self.embedder.model_name(), &embedded)
                .await?;

            written += embedded.len();
            debug!(collection = %self.name, batch = n + 1, written, "Stored embedding batch");
        }

        info!(collection = %self.name, documents = written, "Indexed documents");
        Ok(written)
    }

    /// Up to `k` documents closest to `text`, best first.
    ///
    /// An empty collection yields no hits without calling the provider.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<QueryHit>> {
        let _guard = self.lock.read().await;
        if k == 0 || self.store.count(&self.name).await? == 0 {
            return Ok(Vec::new());
        }

        let input = embedding_input(text, self.max_input_chars);
        let query_vec = self
            .embedder
            .embed(std::slice::from_ref(&input))
            .await
            .map_err(Error::EmbeddingProvider)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::EmbeddingProvider(repo_chat_core::ProviderError::InvalidResponse(
                    "empty embedding response".into(),
                ))
            })?;

        Ok(self.store.nearest(&self.name, &query_vec, k).await?)
    }

    pub async fn count(&self) -> Result<usize> {
        let _guard = self.lock.read().await;
        Ok(self.store.count(&self.name).await?)
    }
}

/// Text sent to the embedder: content capped at `max_chars` bytes.
///
/// The stored document keeps its full content.
fn embedding_input(content: &str, max_chars: usize) -> String {
    truncate_to_boundary(content, max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use repo_chat_core::store::memory::InMemoryStore;
    use repo_chat_core::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds a text as (length, count of 'x').
    struct CountingEmbedder {
        calls: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for t in texts {
                self.max_seen.fetch_max(t.len(), Ordering::SeqCst);
            }
            Ok(texts
                .iter()
                .map(|t| vec![1.0, t.matches('x').count() as f32])
                .collect())
        }
    }

    async fn index_with(embedder: Arc<CountingEmbedder>, batch_size: usize) -> Index {
        Index::open_or_create(
            "test",
            Arc::new(InMemoryStore::new()),
            embedder,
            &CollectionLocks::new(),
            batch_size,
            100,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_add_batches_and_counts() {
        let embedder = Arc::new(CountingEmbedder::new());
        let index = index_with(Arc::clone(&embedder), 2).await;
        let docs: Vec<Document> = (0..5)
            .map(|i| Document::from_path(format!("f{}.py", i), "x".repeat(i + 1)))
            .collect();

        assert_eq!(index.add(&docs).await.unwrap(), 5);
        assert_eq!(index.count().await.unwrap(), 5);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_query_empty_collection_skips_provider() {
        let embedder = Arc::new(CountingEmbedder::new());
        let index = index_with(Arc::clone(&embedder), 8).await;
        assert!(index.query("anything", 3).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_long_content_is_capped_for_embedding_only() {
        let embedder = Arc::new(CountingEmbedder::new());
        let index = index_with(Arc::clone(&embedder), 8).await;
        let long = "y".repeat(500);
        index.add(&[Document::from_path("big.txt", long.clone())]).await.unwrap();

        assert_eq!(embedder.max_seen.load(Ordering::SeqCst), 100);
        let hits = index.query("y", 1).await.unwrap();
        assert_eq!(hits[0].document.content, long);
    }

    #[tokio::test]
    async fn test_open_existing() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(CountingEmbedder::new());
        let locks = CollectionLocks::new();
        let none = Index::open_existing("c", Arc::clone(&store), Arc::clone(&embedder), &locks, 8, 100)
            .await
            .unwrap();
        assert!(none.is_none());

        Index::open_or_create("c", Arc::clone(&store), Arc::clone(&embedder), &locks, 8, 100)
            .await
            .unwrap();
        let some = Index::open_existing("c", store, embedder, &locks, 8, 100)
            .await
            .unwrap();
        assert_eq!(some.unwrap().name(), "c");
    }

    #[test]
    fn test_lock_table_shares_per_name() {
        let locks = CollectionLocks::new();
        assert!(Arc::ptr_eq(&locks.lock_for("a"), &locks.lock_for("a")));
        assert!(!Arc::ptr_eq(&locks.lock_for("a"), &locks.lock_for("b")));
    }
}
