//! Wires the configured components into a ready-to-query pipeline and wraps
//! each question with retry and transcript recording.

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::warn;

use medrag_core::citation::grounded_citations;
use medrag_core::embedding::EmbeddingProvider;
use medrag_core::error::RagError;
use medrag_core::generation::AnswerGenerator;
use medrag_core::index::VectorIndex;
use medrag_core::models::{ChatExchange, Citation};
use medrag_core::pipeline::{AnswerWithSources, RagPipeline};
use medrag_core::prompt::PromptBuilder;
use medrag_core::retriever::Retriever;
use medrag_core::transcript::TranscriptSink;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::generation::create_generator;
use crate::retry::RetryPolicy;
use crate::sqlite_index::SqliteIndex;
use crate::transcript::SqliteTranscript;

/// A shareable question-answering service.
pub struct Assistant {
    pipeline: RagPipeline,
    transcript: Arc<dyn TranscriptSink>,
    retry: RetryPolicy,
    source_label: String,
}

impl Assistant {
    /// Assemble from explicit components. Nothing is read from the
    /// environment.
    pub fn new(
        config: &Config,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn AnswerGenerator>,
        transcript: Arc<dyn TranscriptSink>,
    ) -> Result<Self> {
        let prompt = PromptBuilder::new(config.prompt.load_template()?)
            .with_max_context_chars(config.prompt.max_context_chars)
            .with_passage_headers(config.prompt.passage_headers);
        let pipeline = RagPipeline::new(Retriever::new(embedder, index), prompt, generator)
            .with_top_k(config.retrieval.top_k);
        Ok(Self {
            pipeline,
            transcript,
            retry: RetryPolicy::new(config.generation.max_retries),
            source_label: config.corpus.source_label.clone(),
        })
    }

    /// Assemble the SQLite-backed service described by `config`.
    pub fn from_config(config: &Config, pool: SqlitePool) -> Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        Self::new(
            config,
            embedder,
            Arc::new(SqliteIndex::new(pool.clone())),
            generator,
            Arc::new(SqliteTranscript::new(pool)),
        )
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.pipeline
    }

    pub fn transcript(&self) -> &Arc<dyn TranscriptSink> {
        &self.transcript
    }

    /// Fail early when the index and the provider disagree on dims.
    pub async fn check_ready(&self) -> medrag_core::Result<()> {
        self.pipeline.retriever().check_compatibility().await
    }

    /// Answer `question`, retrying transient failures, and record the
    /// exchange. A recording failure is logged, never returned.
    pub async fn ask(&self, question: &str) -> Result<AnswerWithSources, RagError> {
        let result = self
            .retry
            .run("answer", || self.pipeline.answer_with_sources(question))
            .await?;

        let exchange = ChatExchange::new(question.trim(), &result.answer);
        if let Err(e) = self.transcript.record(&exchange).await {
            warn!(error = %e, "failed to record chat exchange");
        }
        Ok(result)
    }

    /// Citations in `citations` that do not name the corpus source.
    pub fn ungrounded<'a>(&self, citations: &'a [Citation]) -> Vec<&'a Citation> {
        let grounded = grounded_citations(citations, &[self.source_label.as_str()]);
        citations
            .iter()
            .filter(|c| !grounded.iter().any(|g| std::ptr::eq(*g, *c)))
            .collect()
    }
}
