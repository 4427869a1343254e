//! Core data models used throughout repo-chat.
//!
//! These types represent the documents that flow from the collector into
//! the vector index, and the hits that come back out of it.

use serde::{Deserialize, Serialize};

/// Metadata stored alongside every indexed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub path: String,
}

/// One indexable file: its path-derived id, full text, and metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Build a document whose id and `metadata.path` are both `path`.
    pub fn from_path(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: path.clone(),
            content: content.into(),
            metadata: DocumentMetadata { path },
        }
    }
}

/// A document paired with its embedding vector, ready to be stored.
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub document: Document,
    pub embedding: Vec<f32>,
}

/// A single nearest-neighbor result.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub document: Document,
    /// Cosine similarity to the query in `[-1.0, 1.0]`.
    pub score: f32,
}

/// Summary of a persisted collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    /// Embedding model that produced the stored vectors, once any were written.
    pub embedding_model: Option<String>,
    /// Vector dimensionality, once any vectors were written.
    pub dims: Option<usize>,
    /// Unix timestamp (seconds).
    pub created_at: i64,
    pub documents: usize,
}
