//! Core data models flowing through the ingestion and query paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded, word-safe slice of the source corpus.
///
/// Immutable once indexed. `sequence_index` is the position within the
/// source document and is used for traceability and tie-breaking, never
/// for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub sequence_index: i64,
    /// Byte offset of `text` within the source document.
    pub source_offset: i64,
    /// Corpus source label (e.g. the textbook title).
    pub source: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// The unit stored by a vector index.
#[derive(Debug, Clone)]
pub struct IndexedPassage {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A passage returned for one query, ranked by similarity.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedPassage {
    pub chunk: Chunk,
    pub similarity_score: f32,
}

/// A `[label: reference]` span parsed from generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub label: String,
    pub reference: String,
}

/// The result of one question/answer cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// A completed exchange handed to the transcript persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub id: String,
    pub question: String,
    pub answer_text: String,
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

impl ChatExchange {
    pub fn new(question: &str, answer: &Answer) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question: question.to_string(),
            answer_text: answer.text.clone(),
            citations: answer.citations.clone(),
            created_at: Utc::now(),
        }
    }
}
