//! SQLite-backed [`VectorIndex`].
//!
//! One `passages` row per chunk, embedding stored as a little-endian f32
//! BLOB. Similarity is computed in process with the same ranking routine
//! as [`InMemoryIndex`](medrag_core::index::InMemoryIndex). Inserts are
//! serialized by an async mutex and each is a single statement, so WAL
//! readers see either the whole passage or nothing.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use medrag_core::embedding::{blob_to_vec, check_dims, cosine_similarity, vec_to_blob};
use medrag_core::error::{RagError, Result};
use medrag_core::index::{check_k, select_top_k, VectorIndex};
use medrag_core::models::{Chunk, IndexedPassage, RetrievedPassage};

pub struct SqliteIndex {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

fn storage(e: sqlx::Error) -> RagError {
    RagError::Storage(e.to_string())
}

impl SqliteIndex {
    /// Wrap a pool whose schema has been migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Delete every passage and the corpus fingerprint.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query("DELETE FROM passages")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        sqlx::query("DELETE FROM index_meta")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM index_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO index_meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn dims(&self) -> Result<Option<usize>> {
        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM passages LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(dims.map(|d| d as usize))
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages")
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(count as usize)
    }

    async fn insert(&self, passage: IndexedPassage) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        match self.dims().await? {
            Some(expected) => check_dims(expected, &passage.embedding)?,
            None if passage.embedding.is_empty() => {
                return Err(RagError::InvalidInput("embedding must not be empty".to_string()));
            }
            None => {}
        }
        let chunk = &passage.chunk;
        let exists: Option<i64> =
            sqlx::query_scalar("SELECT sequence_index FROM passages WHERE sequence_index = ?")
                .bind(chunk.sequence_index)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
        if exists.is_some() {
            return Err(RagError::InvalidInput(format!(
                "passage with sequence index {} already indexed",
                chunk.sequence_index
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO passages (sequence_index, id, source, source_offset, text, hash,
                                  dims, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(chunk.sequence_index)
        .bind(&chunk.id)
        .bind(&chunk.source)
        .bind(chunk.source_offset)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .bind(passage.embedding.len() as i64)
        .bind(vec_to_blob(&passage.embedding))
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedPassage>> {
        check_k(k)?;
        if let Some(expected) = self.dims().await? {
            check_dims(expected, vector)?;
        }

        let rows = sqlx::query(
            "SELECT sequence_index, id, source, source_offset, text, hash, embedding FROM passages",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let scored: Vec<RetrievedPassage> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedPassage {
                    similarity_score: cosine_similarity(vector, &blob_to_vec(&blob)),
                    chunk: Chunk {
                        id: row.get("id"),
                        text: row.get("text"),
                        sequence_index: row.get("sequence_index"),
                        source_offset: row.get("source_offset"),
                        source: row.get("source"),
                        hash: row.get("hash"),
                    },
                }
            })
            .collect();

        Ok(select_top_k(scored, k, |p| {
            (p.similarity_score, p.chunk.sequence_index)
        }))
    }

    async fn last_sequence_index(&self) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT MAX(sequence_index) FROM passages")
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }
}
