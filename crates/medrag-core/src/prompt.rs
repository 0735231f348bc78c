//! Prompt assembly from retrieved passages.
//!
//! The instruction template is configuration, not logic: [`DEFAULT_TEMPLATE`]
//! ships as the default and any text containing the `{context}` and
//! `{question}` placeholders can replace it.

use crate::error::{RagError, Result};
use crate::models::RetrievedPassage;

/// Default budget for the context block, in characters.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

/// Default instruction template.
pub const DEFAULT_TEMPLATE: &str = "\
You are a pediatric knowledge assistant answering questions from the Nelson Textbook of Pediatrics.
Use only the context below to answer the question at the end. Do not rely on outside knowledge.
If the context does not contain enough information to answer, say that you don't know. Do not make up an answer.
Use three sentences maximum and keep the answer concise.
After each claim, cite its source in the format [Citation Text: Reference], for example [Nelson Textbook of Pediatrics: Fever without a focus].

Context:
{context}

Question: {question}

Answer:";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

/// A validated instruction template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// Fails unless `text` contains both `{context}` and `{question}`.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(RagError::InvalidInput(format!(
                    "prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Substitute both placeholders in a single pass, so placeholder-like
    /// text inside the values is never expanded.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out =
            String::with_capacity(self.text.len() + context.len() + question.len());
        let mut rest = self.text.as_str();
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Builds bounded-size prompts from ranked passages.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: PromptTemplate,
    max_context_chars: usize,
    passage_headers: bool,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptTemplate::default())
    }
}

impl PromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self {
            template,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            passage_headers: true,
        }
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    /// Prefix each passage with a `Source: <label> (passage <n>)` line.
    pub fn with_passage_headers(mut self, enabled: bool) -> Self {
        self.passage_headers = enabled;
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Interpolate the context block and question into the template.
    pub fn build(&self, question: &str, passages: &[RetrievedPassage]) -> String {
        self.template.render(&self.context_block(passages), question)
    }

    /// Join passage texts in the order received, stopping at the context
    /// budget. The passage that crosses the budget is cut at a character
    /// boundary; later passages are dropped.
    pub fn context_block(&self, passages: &[RetrievedPassage]) -> String {
        let mut context = String::new();
        let mut used = 0usize;

        for passage in passages {
            let entry = if self.passage_headers {
                format!(
                    "Source: {} (passage {})\n{}",
                    passage.chunk.source, passage.chunk.sequence_index, passage.chunk.text
                )
            } else {
                passage.chunk.text.clone()
            };
            let sep = if context.is_empty() { "" } else { "\n\n" };
            let needed = sep.len() + entry.chars().count();

            if used + needed > self.max_context_chars {
                let room = self.max_context_chars.saturating_sub(used + sep.len());
                if room > 0 {
                    context.push_str(sep);
                    context.extend(entry.chars().take(room));
                }
                break;
            }

            context.push_str(sep);
            context.push_str(&entry);
            used += needed;
        }

        context
    }
}
