//! In-memory [`VectorIndex`] for tests, small corpora, and WASM targets.
//!
//! Passages live in a `Vec` behind `std::sync::RwLock`: queries share the
//! read lock, inserts take the write lock only for the append itself.
//! Search is brute-force cosine similarity over all stored vectors.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::embedding::{check_dims, cosine_similarity};
use crate::error::{RagError, Result};
use crate::models::{IndexedPassage, RetrievedPassage};

use super::{check_k, select_top_k, VectorIndex};

#[derive(Default)]
struct Inner {
    dims: Option<usize>,
    passages: Vec<IndexedPassage>,
    sequence_indices: HashSet<i64>,
}

/// In-memory vector index.
#[derive(Default)]
pub struct InMemoryIndex {
    inner: RwLock<Inner>,
}

impl InMemoryIndex {
    /// An empty index whose dimensionality is fixed by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index that only accepts `dims`-length vectors.
    pub fn with_dims(dims: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                dims: Some(dims),
                ..Inner::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| RagError::Storage("index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| RagError::Storage("index lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn dims(&self) -> Result<Option<usize>> {
        Ok(self.read()?.dims)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.read()?.passages.len())
    }

    async fn insert(&self, passage: IndexedPassage) -> Result<()> {
        let mut inner = self.write()?;
        let dims = inner.dims;
        match dims {
            Some(d) => check_dims(d, &passage.embedding)?,
            None if passage.embedding.is_empty() => {
                return Err(RagError::InvalidInput("embedding must not be empty".to_string()));
            }
            None => inner.dims = Some(passage.embedding.len()),
        }
        let seq = passage.chunk.sequence_index;
        if !inner.sequence_indices.insert(seq) {
            return Err(RagError::InvalidInput(format!(
                "passage with sequence index {} already indexed",
                seq
            )));
        }
        inner.passages.push(passage);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedPassage>> {
        check_k(k)?;
        let inner = self.read()?;
        if let Some(d) = inner.dims {
            check_dims(d, vector)?;
        }
        let scored: Vec<(f32, &IndexedPassage)> = inner
            .passages
            .iter()
            .map(|p| (cosine_similarity(vector, &p.embedding), p))
            .collect();
        let top = select_top_k(scored, k, |(s, p)| (*s, p.chunk.sequence_index));
        Ok(top
            .into_iter()
            .map(|(score, p)| RetrievedPassage {
                chunk: p.chunk.clone(),
                similarity_score: score,
            })
            .collect())
    }

    async fn last_sequence_index(&self) -> Result<Option<i64>> {
        Ok(self
            .read()?
            .passages
            .iter()
            .map(|p| p.chunk.sequence_index)
            .max())
    }
}
