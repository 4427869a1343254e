//! Shared components for indexing and answering.
//!
//! An [`Engine`] owns the configuration, the store, both providers and the
//! collection lock table. It is cheap to share behind an `Arc` and is used
//! by every session.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use repo_chat_core::embedding::EmbeddingProvider;
use repo_chat_core::generator::AnswerGenerator;
use repo_chat_core::store::Store;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::generate::create_generator;
use crate::index::{CollectionLocks, Index};
use crate::retry::RetryPolicy;
use crate::sqlite_store::SqliteStore;

pub struct Engine {
    config: Arc<Config>,
    store: Arc<dyn Store>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    locks: CollectionLocks,
}

impl Engine {
    /// Open the on-disk index and build providers from `config`.
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let retry = RetryPolicy::from_config(&config.retry);
        let embedder = create_provider(&config.embedding, retry.clone())
            .context("Failed to create embedding provider")?;
        let generator = create_generator(&config.generation, retry)
            .context("Failed to create answer generator")?;
        let store = SqliteStore::open(&config.index.persist_dir)
            .await
            .with_context(|| {
                format!("Failed to open index at {}", config.index.persist_dir.display())
            })?;

        Ok(Self::with_components(config, Arc::new(store), embedder, generator))
    }

    /// Assemble an engine from ready-made parts.
    pub fn with_components(
        config: Config,
        store: Arc<dyn Store>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            embedder,
            generator,
            locks: CollectionLocks::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn generator(&self) -> &dyn AnswerGenerator {
        self.generator.as_ref()
    }

    /// Attach to `name`, creating the collection if needed.
    pub async fn open_index(&self, name: &str) -> repo_chat_core::Result<Index> {
        Index::open_or_create(
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            &self.locks,
            self.config.embedding.batch_size,
            self.config.embedding.max_input_chars,
        )
        .await
    }

    /// Attach to `name` only if it was built before.
    pub async fn existing_index(&self, name: &str) -> repo_chat_core::Result<Option<Index>> {
        Index::open_existing(
            name,
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            &self.locks,
            self.config.embedding.batch_size,
            self.config.embedding.max_input_chars,
        )
        .await
    }

    /// Collection name for the repository at `path`.
    ///
    /// Fails when `path` cannot be canonicalized (for example, it does not
    /// exist).
    pub fn collection_name_for(&self, path: &Path) -> repo_chat_core::Result<String> {
        let canonical = path.canonicalize().map_err(|e| repo_chat_core::Error::Collection {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(collection_name(&self.config.index.collection_prefix, &canonical))
    }

    /// Index previously built for `path`, if any.
    pub async fn attach_existing(&self, path: &Path) -> repo_chat_core::Result<Option<Index>> {
        let name = self.collection_name_for(path)?;
        self.existing_index(&name).await
    }
}

/// `{prefix}_{first 16 hex chars of SHA-256(path)}`.
pub fn collection_name(prefix: &str, canonical: &Path) -> String {
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("{}_{}", prefix, hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_is_stable_and_distinct() {
        let a = collection_name("repo_files", Path::new("/home/u/project-a"));
        let b = collection_name("repo_files", Path::new("/home/u/project-b"));
        assert_eq!(a, collection_name("repo_files", Path::new("/home/u/project-a")));
        assert_ne!(a, b);
        assert!(a.starts_with("repo_files_"));
        assert_eq!(a.len(), "repo_files_".len() + 16);
        assert!(a["repo_files_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
