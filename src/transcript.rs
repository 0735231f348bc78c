//! SQLite-backed transcript of completed exchanges (`chat_messages`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use medrag_core::error::{RagError, Result};
use medrag_core::models::{ChatExchange, Citation};
use medrag_core::transcript::TranscriptSink;

pub struct SqliteTranscript {
    pool: SqlitePool,
}

impl SqliteTranscript {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RagError::Storage(e.to_string()))
    }
}

#[async_trait]
impl TranscriptSink for SqliteTranscript {
    async fn record(&self, exchange: &ChatExchange) -> Result<()> {
        let citations_json = serde_json::to_string(&exchange.citations)
            .map_err(|e| RagError::Storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO chat_messages (id, question, answer, citations_json, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&exchange.id)
        .bind(&exchange.question)
        .bind(&exchange.answer_text)
        .bind(&citations_json)
        .bind(exchange.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| RagError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatExchange>> {
        let rows = sqlx::query(
            r#"
            SELECT id, question, answer, citations_json, created_at
            FROM chat_messages
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RagError::Storage(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let citations_json: String = row.get("citations_json");
                let citations: Vec<Citation> = serde_json::from_str(&citations_json)
                    .map_err(|e| RagError::Storage(format!("corrupt citations: {}", e)))?;
                let millis: i64 = row.get("created_at");
                Ok(ChatExchange {
                    id: row.get("id"),
                    question: row.get("question"),
                    answer_text: row.get("answer"),
                    citations,
                    created_at: DateTime::<Utc>::from_timestamp_millis(millis)
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}
