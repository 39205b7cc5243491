//! Token estimator backends.
//!
//! Everything downstream sees only [`TokenEstimator`]; which backend is in
//! use is decided once from configuration by [`select_estimator`].
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use docctx_core::config::{EstimatorKind, RetrievalSettings};
use docctx_core::error::{Error, Result};
use docctx_core::traits::TokenEstimator;

pub mod bpe;
pub mod heuristic;
pub mod hf;

pub use bpe::TiktokenEstimator;
pub use heuristic::CharRatioEstimator;
pub use hf::HfTokenizerEstimator;

/// Build the estimator named by `settings.estimator`.
///
/// `APP_TOKEN_ESTIMATOR` overrides the configured kind, which keeps tests and
/// offline runs on the heuristic without touching config files.
pub fn select_estimator(settings: &RetrievalSettings) -> Result<Arc<dyn TokenEstimator>> {
    let kind = match std::env::var("APP_TOKEN_ESTIMATOR") {
        Ok(v) if !v.trim().is_empty() => v.parse()?,
        _ => settings.estimator,
    };
    match kind {
        EstimatorKind::Heuristic => {
            info!(chars_per_token = settings.chars_per_token, "using character-ratio token estimator");
            Ok(Arc::new(CharRatioEstimator::new(settings.chars_per_token)))
        }
        EstimatorKind::Tiktoken => {
            info!("using tiktoken estimator");
            Ok(Arc::new(TiktokenEstimator::new()?))
        }
        EstimatorKind::Huggingface => {
            let path = resolve_tokenizer_path(settings)?;
            info!(path = %path.display(), "using tokenizer.json estimator");
            let estimator = HfTokenizerEstimator::from_file(&path)?
                .with_fallback(CharRatioEstimator::new(settings.chars_per_token));
            Ok(Arc::new(estimator))
        }
    }
}

fn resolve_tokenizer_path(settings: &RetrievalSettings) -> Result<PathBuf> {
    if let Ok(p) = std::env::var("APP_TOKENIZER_PATH") {
        let p = docctx_core::config::expand_path(p);
        if p.exists() { return Ok(p); }
    }
    match settings.tokenizer_path() {
        Some(p) if p.exists() => Ok(p),
        Some(p) => Err(Error::Tokenizer(format!("tokenizer file not found: {}", p.display()))),
        None => Err(Error::Tokenizer("no tokenizer_path configured".into())),
    }
}
