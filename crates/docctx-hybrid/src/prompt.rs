//! Turning an assembled context into the text handed to the generation call,
//! plus the citation list returned alongside the answer.

use serde::{Deserialize, Serialize};
use tracing::info;

use docctx_core::config::RetrievalSettings;
use docctx_core::normalize::preview;
use docctx_core::traits::TokenEstimator;
use docctx_core::types::{AssembledContext, RetrievedCandidate};

pub const CITATION_EXCERPT_CHARS: usize = 200;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer using the provided sources, \
keep code examples complete and correct, and name the source files you relied on.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub filename: String,
    pub similarity_score: f32,
    pub excerpt: String,
}

/// One `Source: <file>\n<content>` block per candidate, in rank order.
pub fn render_context(candidates: &[RetrievedCandidate]) -> Vec<String> {
    candidates.iter().map(|c| format!("Source: {}\n{}", c.source_filename, c.content)).collect()
}

pub fn citations(candidates: &[RetrievedCandidate]) -> Vec<Citation> {
    candidates
        .iter()
        .map(|c| Citation {
            filename: c.source_filename.clone(),
            similarity_score: c.similarity_score,
            excerpt: if c.content.is_empty() { preview(&c.excerpt, CITATION_EXCERPT_CHARS) } else { preview(&c.content, CITATION_EXCERPT_CHARS) },
        })
        .collect()
}

pub fn estimate_prompt_tokens<'a, I>(parts: I, estimator: &dyn TokenEstimator, model: &str) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    parts.into_iter().map(|p| estimator.estimate(p, model)).sum()
}

/// The primary model, or the fallback when the prompt is larger than the budget.
pub fn choose_model(prompt_tokens: usize, settings: &RetrievalSettings) -> &str {
    if prompt_tokens > settings.token_budget {
        info!(prompt_tokens, budget = settings.token_budget, model = %settings.fallback_model, "prompt exceeds budget, using fallback model");
        &settings.fallback_model
    } else {
        &settings.model
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub prompt_tokens: usize,
    pub model: String,
    pub sources: Vec<Citation>,
}

impl ChatPrompt {
    /// The user message is the context blocks followed by the question, separated by blank lines.
    pub fn build(system: &str, query: &str, context: &AssembledContext, estimator: &dyn TokenEstimator, settings: &RetrievalSettings) -> Self {
        let blocks = render_context(&context.candidates);
        let prompt_tokens = estimate_prompt_tokens(
            std::iter::once(system).chain(blocks.iter().map(String::as_str)).chain(std::iter::once(query)),
            estimator,
            &settings.model,
        );
        let model = choose_model(prompt_tokens, settings).to_string();
        let mut user_parts = blocks;
        user_parts.push(query.to_string());
        Self { system: system.to_string(), user: user_parts.join("\n\n"), prompt_tokens, model, sources: citations(&context.candidates) }
    }
}
