//! # medrag core
//!
//! Retrieval-augmented question answering over a fixed reference corpus:
//! chunking, embedding and generation traits, vector index, retriever,
//! prompt builder, citation extractor, and the orchestrator that ties them
//! together.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Concrete
//! backends (SQLite index, OpenAI/Ollama adapters) live in the `medrag`
//! app crate and plug in through the traits defined here.
//!
//! ## Online path
//!
//! ```text
//! question ─▶ Retriever ─▶ PromptBuilder ─▶ AnswerGenerator ─▶ citations
//!            (embed+kNN)                                      (extract)
//! ```
//!
//! ## Offline path
//!
//! ```text
//! corpus ─▶ chunk ─▶ EmbeddingProvider ─▶ VectorIndex::insert
//! ```

pub mod chunk;
pub mod citation;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod transcript;

pub use error::{RagError, Result};
pub use models::{Answer, ChatExchange, Chunk, Citation, IndexedPassage, RetrievedPassage};
