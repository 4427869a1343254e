//! Query-time retrieval against the session's active index.

use tracing::debug;

use repo_chat_core::prompt::RetrievedFile;
use repo_chat_core::Result;

use crate::index::Index;

/// Outcome of a retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    /// No index is attached; nothing was queried.
    NotReady,
    /// Matches in similarity order, best first. Empty for an empty index.
    Hits(Vec<RetrievedFile>),
}

/// Retrieve the `k` files most similar to `query_text`.
pub async fn retrieve(index: Option<&Index>, query_text: &str, k: usize) -> Result<Retrieval> {
    let Some(index) = index else {
        return Ok(Retrieval::NotReady);
    };

    let hits = index.query(query_text, k).await?;
    debug!(
        collection = index.name(),
        hits = hits.len(),
        top_score = hits.first().map(|h| h.score),
        "Retrieved documents"
    );

    Ok(Retrieval::Hits(
        hits.into_iter()
            .map(|h| RetrievedFile::new(h.document.metadata.path, h.document.content))
            .collect(),
    ))
}
