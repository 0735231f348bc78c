//! Question-to-passages retrieval.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::{check_dims, EmbeddingProvider};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::models::RetrievedPassage;

/// Embeds a question and returns the `k` most similar passages.
///
/// Holds only shared handles, so clones are cheap and one retriever can
/// serve concurrent requests.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Fail with [`RagError::DimensionMismatch`] if the index was built
    /// with a different dimensionality than the provider produces.
    pub async fn check_compatibility(&self) -> Result<()> {
        match self.index.dims().await? {
            Some(expected) if expected != self.embedder.dims() => {
                Err(RagError::DimensionMismatch {
                    expected,
                    actual: self.embedder.dims(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Returns up to `k` passages, best first. An empty index yields an
    /// empty list. Provider failures propagate unchanged.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        let vector = self.embedder.embed(question).await?;
        check_dims(self.embedder.dims(), &vector)?;
        if let Some(expected) = self.index.dims().await? {
            check_dims(expected, &vector)?;
        }
        let passages = self.index.query(&vector, k).await?;
        debug!(
            k,
            returned = passages.len(),
            top_score = passages.first().map(|p| p.similarity_score),
            "retrieved passages"
        );
        Ok(passages)
    }
}
