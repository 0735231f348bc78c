//! Persistence of completed question/answer exchanges.
//!
//! Recording is a side effect the orchestrator's caller performs after a
//! successful answer. A failed record must never fail the request; callers
//! log it and move on.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::models::ChatExchange;

#[async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn record(&self, exchange: &ChatExchange) -> Result<()>;

    /// Most recent exchanges, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChatExchange>>;
}

/// Discards every exchange.
pub struct NullTranscript;

#[async_trait]
impl TranscriptSink for NullTranscript {
    async fn record(&self, _exchange: &ChatExchange) -> Result<()> {
        Ok(())
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<ChatExchange>> {
        Ok(Vec::new())
    }
}

/// Keeps exchanges in memory.
#[derive(Default)]
pub struct MemoryTranscript {
    exchanges: RwLock<Vec<ChatExchange>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptSink for MemoryTranscript {
    async fn record(&self, exchange: &ChatExchange) -> Result<()> {
        self.exchanges
            .write()
            .map_err(|_| RagError::Storage("transcript lock poisoned".to_string()))?
            .push(exchange.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatExchange>> {
        let exchanges = self
            .exchanges
            .read()
            .map_err(|_| RagError::Storage("transcript lock poisoned".to_string()))?;
        Ok(exchanges.iter().rev().take(limit).cloned().collect())
    }
}
