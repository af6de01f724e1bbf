//! Hugging Face tokenizer for exact token budgeting.
//!
//! Loads a `tokenizer.json` from the Hub (cached under `~/.cache/huggingface`)
//! or from disk. Only compiled with the `local` feature.

use docent_core::Tokenizer;
use docent_core::error::ProviderError;
use hf_hub::api::sync::Api;
use std::path::Path;
use tracing::{info, warn};

pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    /// Download (or reuse the cached) `tokenizer.json` of a Hub repository.
    ///
    /// Blocking: call from `spawn_blocking` when already inside the runtime.
    pub fn from_repo(repo: &str) -> Result<Self, ProviderError> {
        let api = Api::new().map_err(|e| {
            ProviderError::Network(format!("Failed to initialize HuggingFace Hub API: {e}"))
        })?;

        let path = api.model(repo.to_string()).get("tokenizer.json").map_err(|e| {
            ProviderError::Network(format!("Failed to download tokenizer from '{repo}': {e}"))
        })?;

        info!(repo, path = %path.display(), "Tokenizer ready");
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to load tokenizer: {e}")))?;
        Ok(Self { inner })
    }
}

impl Tokenizer for HfTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.get_ids().len(),
            Err(e) => {
                warn!(error = %e, "Tokenization failed, estimating from length");
                text.len().div_ceil(4)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "downloads from the Hugging Face Hub"]
    fn counts_tokens_from_hub_tokenizer() {
        let tok = HfTokenizer::from_repo("Xenova/gpt-3").unwrap();
        assert!(tok.count_tokens("Hello world") >= 2);
        assert_eq!(tok.count_tokens(""), 0);
    }

    #[test]
    fn missing_file_is_not_configured() {
        let err = HfTokenizer::from_file(Path::new("/nonexistent/tokenizer.json")).err();
        assert!(matches!(err, Some(ProviderError::NotConfigured(_))));
    }
}
