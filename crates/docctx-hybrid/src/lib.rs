//! Hybrid retrieval and context assembly.
//!
//! [`HybridSearchEngine`] queries both retrieval paths concurrently, merges
//! them with [`HybridRanker`] and fits the result into a token budget with
//! [`ContextAssembler`].
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use docctx_core::config::RetrievalSettings;
use docctx_core::traits::{LexicalSearch, TokenEstimator, VectorSearch};
use docctx_core::types::{AssembledContext, RetrievedCandidate, SearchPath};
use docctx_core::{CandidateNormalizer, Result};

pub mod assemble;
pub mod prompt;
pub mod ranker;

pub use assemble::{cut_to_window, ContextAssembler, TrimPolicy};
pub use prompt::{ChatPrompt, Citation};
pub use ranker::HybridRanker;

pub struct HybridSearchEngine<V, L> where V: VectorSearch, L: LexicalSearch {
    vector: V,
    lexical: L,
    estimator: Arc<dyn TokenEstimator>,
    normalizer: CandidateNormalizer,
    ranker: HybridRanker,
    assembler: ContextAssembler,
    settings: RetrievalSettings,
}

impl<V, L> HybridSearchEngine<V, L> where V: VectorSearch, L: LexicalSearch {
    /// Fails fast on invalid settings.
    pub fn new(vector: V, lexical: L, estimator: Arc<dyn TokenEstimator>, settings: RetrievalSettings) -> Result<Self> {
        settings.validate()?;
        let normalizer = CandidateNormalizer::from_settings(estimator.clone(), &settings);
        let ranker = HybridRanker::new(settings.lexical_weight)?;
        let assembler = ContextAssembler::from_settings(estimator.clone(), &settings)?;
        Ok(Self { vector, lexical, estimator, normalizer, ranker, assembler, settings })
    }

    /// Like [`HybridSearchEngine::new`] with the estimator chosen by configuration.
    pub fn from_settings(vector: V, lexical: L, settings: RetrievalSettings) -> Result<Self> {
        let estimator = docctx_tokens::select_estimator(&settings)?;
        Self::new(vector, lexical, estimator, settings)
    }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    pub fn estimator(&self) -> &dyn TokenEstimator { self.estimator.as_ref() }

    /// Query both paths, normalize their rows and merge them into one ranked list.
    ///
    /// A path that fails or exceeds its timeout counts as empty. `top_k` of
    /// `None` or `Some(0)` uses the configured default. The merged list is not
    /// truncated.
    pub async fn hybrid_search(&self, query_embedding: &[f32], query_text: &str, top_k: Option<usize>) -> Vec<RetrievedCandidate> {
        let limit = top_k.filter(|k| *k > 0).unwrap_or(self.settings.top_k);
        let timeout = self.settings.path_timeout();

        let (vector_rows, lexical_rows) = futures::future::join(
            guarded(SearchPath::Vector, timeout, self.vector.vector_search(query_embedding, limit)),
            guarded(SearchPath::Lexical, timeout, self.lexical.lexical_search(query_text, limit)),
        )
        .await;

        let vector = self.normalizer.normalize_vector(vector_rows);
        let lexical = self.normalizer.normalize_lexical(lexical_rows);
        self.ranker.merge(vector, lexical)
    }

    pub fn assemble_context(&self, ranked: &[RetrievedCandidate], token_budget: usize, model: &str) -> AssembledContext {
        self.assembler.assemble(ranked, token_budget, model)
    }

    /// [`HybridSearchEngine::assemble_context`] with the configured budget and model.
    pub fn assemble_default(&self, ranked: &[RetrievedCandidate]) -> AssembledContext {
        self.assembler.assemble(ranked, self.settings.token_budget, &self.settings.model)
    }

    /// Search and assemble in one step. An empty result means no relevant context was found.
    pub async fn retrieve_context(&self, query_embedding: &[f32], query_text: &str) -> AssembledContext {
        let ranked = self.hybrid_search(query_embedding, query_text, None).await;
        let context = self.assemble_default(&ranked);
        if context.is_empty() { debug!(ranked = ranked.len(), "no context fits the budget"); }
        context
    }

    pub fn build_prompt(&self, system: &str, query: &str, context: &AssembledContext) -> ChatPrompt {
        ChatPrompt::build(system, query, context, self.estimator.as_ref(), &self.settings)
    }
}

/// Await one retrieval path, turning failure and timeout into an empty result.
async fn guarded<T, F>(path: SearchPath, timeout: Duration, fut: F) -> Vec<T>
where
    F: Future<Output = anyhow::Result<Vec<T>>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            warn!(%path, error = %e, "retrieval path failed, continuing without it");
            Vec::new()
        }
        Err(_) => {
            warn!(%path, timeout_ms = timeout.as_millis() as u64, "retrieval path timed out, continuing without it");
            Vec::new()
        }
    }
}
