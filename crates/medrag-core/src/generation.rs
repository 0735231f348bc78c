//! Answer generator trait and sampling parameters.
//!
//! Concrete backends (OpenAI chat completions, Ollama) live in the `medrag`
//! app crate. A generator performs exactly one round trip per call; any
//! retry policy belongs to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Model configuration for one generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Model identifier (e.g. `"gpt-4"`).
    pub model: String,
    /// Sampling randomness in `[0, 1]`. Low values favor conservative,
    /// repeatable answers.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RagError::InvalidInput(format!(
                "temperature must be in [0.0, 1.0], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(RagError::InvalidInput("max_tokens must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Produces raw answer text for an assembled prompt.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Fails with [`RagError::Generation`].
    async fn generate(&self, prompt: &str) -> Result<String>;
}
