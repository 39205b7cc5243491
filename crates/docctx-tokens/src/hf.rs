//! Token counting with a HuggingFace `tokenizer.json`.

use std::path::Path;

use tokenizers::Tokenizer;
use tracing::warn;

use docctx_core::error::{Error, Result};
use docctx_core::traits::TokenEstimator;

use crate::heuristic::CharRatioEstimator;

/// One tokenizer file describes one model, so the `model` argument is ignored.
pub struct HfTokenizerEstimator {
    tokenizer: Tokenizer,
    fallback: CharRatioEstimator,
}

impl HfTokenizerEstimator {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| Error::Tokenizer(format!("failed to load tokenizer from {}: {}", path.display(), e)))?;
        // Counts must cover the whole text, so undo any truncation/padding baked into the file.
        tokenizer
            .with_truncation(None)
            .map_err(|e| Error::Tokenizer(format!("failed to disable truncation for {}: {}", path.display(), e)))?;
        tokenizer.with_padding(None);
        Ok(Self { tokenizer, fallback: CharRatioEstimator::default() })
    }

    pub fn with_fallback(mut self, fallback: CharRatioEstimator) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() { return 0; }
        match self.tokenizer.encode(text, false) {
            Ok(enc) => enc.get_ids().len(),
            Err(e) => {
                warn!(error = %e, "tokenization failed, using character estimate");
                self.fallback.count(text)
            }
        }
    }
}

impl TokenEstimator for HfTokenizerEstimator {
    fn estimate(&self, text: &str, _model: &str) -> usize { self.count(text) }
}
