//! Generation backend seam.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("backend returned {got} completions for {expected} prompts")]
    CountMismatch { expected: usize, got: usize },

    #[error("no completion returned for prompt {0}")]
    MissingCompletion(usize),
}

/// Decoding parameters sent with every batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl Default for SamplingConfig {
    /// Greedy decoding, 2048 new tokens, stop before the model invents the
    /// next question.
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 2048,
            stop: vec!["Question:".to_string()],
        }
    }
}

/// Batched text generation.
///
/// `generate` must return exactly one completion per prompt, in prompt
/// order. How the backend parallelizes internally is its own business.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short label for reports.
    fn name(&self) -> &str;

    async fn generate(
        &self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<String>, BackendError>;
}
