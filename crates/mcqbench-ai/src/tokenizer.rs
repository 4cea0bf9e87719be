//! Token counting for prompt budgeting.

/// Measures the token length of a prompt.
///
/// Only used to decide how many few-shot exemplars fit in the context
/// window, so implementations should count the same way the serving model
/// tokenizes its input (special tokens included).
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> anyhow::Result<usize>;
}

#[cfg(feature = "tokenizer")]
pub use hf::HfTokenCounter;

#[cfg(feature = "tokenizer")]
mod hf {
    use std::path::Path;

    use tokenizers::Tokenizer;
    use tracing::info;

    use super::TokenCounter;

    /// Token counter backed by a HuggingFace `tokenizer.json`.
    pub struct HfTokenCounter {
        tokenizer: Tokenizer,
    }

    impl HfTokenCounter {
        /// Load a tokenizer from a `tokenizer.json` file, or from a model
        /// directory containing one.
        pub fn load(path: &Path) -> anyhow::Result<Self> {
            let file = if path.is_dir() {
                path.join("tokenizer.json")
            } else {
                path.to_path_buf()
            };
            anyhow::ensure!(file.exists(), "tokenizer.json not found at {file:?}");

            let tokenizer = Tokenizer::from_file(&file)
                .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

            info!(path = %file.display(), "loaded tokenizer");
            Ok(Self { tokenizer })
        }
    }

    impl TokenCounter for HfTokenCounter {
        fn count_tokens(&self, text: &str) -> anyhow::Result<usize> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
            Ok(encoding.get_ids().len())
        }
    }

}
