//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the storage contract needed by
//! ingestion and retrieval, enabling pluggable backends (in-memory here,
//! SQLite in the app crate).
//!
//! # Contract
//!
//! | Method | Behavior |
//! |--------|----------|
//! | [`insert`](VectorIndex::insert) | Append a passage; rejects a vector whose length differs from the established dimensionality and leaves the index unchanged |
//! | [`query`](VectorIndex::query) | Top-`k` by cosine similarity, descending; ties broken by ascending `sequence_index`; fewer than `k` (possibly zero) results when the index is small |
//! | [`last_sequence_index`](VectorIndex::last_sequence_index) | Highest committed `sequence_index`, the resume point for ingestion |
//!
//! Implementations must allow many concurrent readers and serialize
//! writers. A reader never observes a half-inserted passage.

pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::models::{IndexedPassage, RetrievedPassage};

pub use memory::InMemoryIndex;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Established dimensionality, or `None` while empty and unconfigured.
    async fn dims(&self) -> Result<Option<usize>>;

    /// Number of stored passages.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Append a passage, making it visible to subsequent queries.
    async fn insert(&self, passage: IndexedPassage) -> Result<()>;

    /// Return up to `k` passages ordered by descending cosine similarity.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedPassage>>;

    /// Highest `sequence_index` stored, or `None` for an empty index.
    async fn last_sequence_index(&self) -> Result<Option<i64>>;
}

/// Ranking order: higher score first, then earlier corpus position.
pub fn rank_order(a_score: f32, a_seq: i64, b_score: f32, b_seq: i64) -> Ordering {
    b_score.total_cmp(&a_score).then(a_seq.cmp(&b_seq))
}

/// Sort `items` by [`rank_order`] and keep the first `k`.
pub fn select_top_k<T>(mut items: Vec<T>, k: usize, key: impl Fn(&T) -> (f32, i64)) -> Vec<T> {
    items.sort_by(|a, b| {
        let (sa, qa) = key(a);
        let (sb, qb) = key(b);
        rank_order(sa, qa, sb, qb)
    });
    items.truncate(k);
    items
}

/// Reject a non-positive `k`.
pub fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(RagError::InvalidInput("k must be >= 1".to_string()));
    }
    Ok(())
}
