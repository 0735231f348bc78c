//! The question-answering orchestrator.
//!
//! One call to [`RagPipeline::answer`] runs retrieve, build prompt,
//! generate, and extract citations in sequence. Any step failure fails the
//! whole request; there is no partial answer and no retry here.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::citation;
use crate::error::{RagError, Result};
use crate::generation::AnswerGenerator;
use crate::models::{Answer, RetrievedPassage};
use crate::prompt::PromptBuilder;
use crate::retriever::Retriever;

/// Default number of passages fed into the prompt.
pub const DEFAULT_TOP_K: usize = 4;

/// An answer together with the passages that grounded it.
#[derive(Debug, Clone)]
pub struct AnswerWithSources {
    pub answer: Answer,
    pub passages: Vec<RetrievedPassage>,
}

pub struct RagPipeline {
    retriever: Retriever,
    prompt: PromptBuilder,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, prompt: PromptBuilder, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            retriever,
            prompt,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer one question.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        Ok(self.answer_with_sources(question).await?.answer)
    }

    /// Answer one question and return the retrieved passages alongside.
    pub async fn answer_with_sources(&self, question: &str) -> Result<AnswerWithSources> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput("question must not be empty".to_string()));
        }
        let started = Instant::now();

        let passages = self.retriever.retrieve(question, self.top_k).await?;
        let prompt = self.prompt.build(question, &passages);
        debug!(
            passages = passages.len(),
            prompt_chars = prompt.chars().count(),
            "prompt assembled"
        );

        let text = self.generator.generate(&prompt).await?;
        let citations = citation::extract(&text);

        info!(
            model = self.generator.model_name(),
            passages = passages.len(),
            citations = citations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );

        Ok(AnswerWithSources {
            answer: Answer { text, citations },
            passages,
        })
    }
}
