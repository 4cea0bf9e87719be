//! Model-facing layer: token budgeting, few-shot prompt construction,
//! generation backends, and the evaluation harness that ties them together.

mod backend;
mod harness;
pub mod prompt;
mod tokenizer;

#[cfg(feature = "http")]
mod openai;

pub use backend::{BackendError, GenerationBackend, SamplingConfig};
pub use harness::{EvalOutcome, EvalSettings, Harness};
pub use prompt::{BuiltPrompt, ExemplarPool, PromptBudget, PromptBuilder};
pub use tokenizer::TokenCounter;

#[cfg(feature = "http")]
pub use openai::CompletionsClient;
#[cfg(feature = "tokenizer")]
pub use tokenizer::HfTokenCounter;
