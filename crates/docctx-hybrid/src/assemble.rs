//! Token-budgeted selection over a ranked candidate list.
//!
//! Candidates are taken in rank order while they fit. When the very first
//! candidate is already too large it is trimmed to the budget instead of
//! being dropped; trimming never leaves a fenced code block half open.

use std::sync::Arc;

use tracing::debug;

use docctx_core::config::RetrievalSettings;
use docctx_core::error::{Error, Result};
use docctx_core::traits::TokenEstimator;
use docctx_core::types::{AssembledContext, RetrievedCandidate};

pub const FENCE: &str = "```";

/// How a token allowance is turned into a character cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimPolicy {
    pub chars_per_token: usize,
    /// A line cut is only taken when it keeps at least this fraction of the window.
    pub newline_floor: f32,
}

impl Default for TrimPolicy {
    fn default() -> Self { Self { chars_per_token: 4, newline_floor: 0.5 } }
}

impl TrimPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.chars_per_token == 0 {
            return Err(Error::InvalidConfig("chars_per_token must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.newline_floor) {
            return Err(Error::InvalidConfig(format!("newline_floor must lie in [0,1], got {}", self.newline_floor)));
        }
        Ok(())
    }
}

/// A fence line starts (after indentation) with three or more backticks.
fn is_fence_line(line: &str) -> bool { line.trim_start().starts_with(FENCE) }

/// Byte offsets of the fence lines in `text`.
fn fence_offsets(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.split_inclusive('\n')
        .scan(0usize, |offset, line| {
            let start = *offset;
            *offset += line.len();
            Some((start, line))
        })
        .filter(|(_, line)| is_fence_line(line))
        .map(|(start, _)| start)
}

/// Number of fence lines. Backticks inside a line do not count, and a
/// four-backtick fence counts once.
pub fn fence_count(text: &str) -> usize { fence_offsets(text).count() }

/// Drop a trailing unterminated fence together with everything after it.
fn close_dangling_fence(text: &str) -> &str {
    if fence_count(text) % 2 == 0 {
        return text;
    }
    match fence_offsets(text).last() {
        Some(open) => &text[..open],
        None => text,
    }
}

/// Cut `content` to at most `window_chars` characters.
///
/// Content already inside the window is returned unchanged. Otherwise the cut
/// goes before a fence that opens inside the window and closes outside it,
/// else at the last newline in the window when that keeps at least
/// `newline_floor` of it, else exactly at the window edge. The result has
/// trailing whitespace removed and an even number of fence markers.
pub fn cut_to_window(content: &str, window_chars: usize, newline_floor: f32) -> &str {
    let end = match content.char_indices().nth(window_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return content,
    };
    let mut window = &content[..end];
    // an edge inside a fence marker would leave a stray run of backticks
    let line_start = window.rfind('\n').map_or(0, |nl| nl + 1);
    if is_fence_line(&content[line_start..]) && !is_fence_line(&window[line_start..]) {
        window = &window[..line_start];
    }

    let cut = if fence_count(window) % 2 == 1 {
        close_dangling_fence(window)
    } else {
        match window.rfind('\n') {
            Some(nl) if window[..nl].chars().count() as f64 >= window_chars as f64 * f64::from(newline_floor) => &window[..nl],
            _ => window,
        }
    };
    close_dangling_fence(cut).trim_end()
}

pub struct ContextAssembler {
    estimator: Arc<dyn TokenEstimator>,
    policy: TrimPolicy,
}

impl ContextAssembler {
    pub fn new(estimator: Arc<dyn TokenEstimator>, policy: TrimPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self { estimator, policy })
    }

    pub fn from_settings(estimator: Arc<dyn TokenEstimator>, settings: &RetrievalSettings) -> Result<Self> {
        Self::new(estimator, TrimPolicy { chars_per_token: settings.chars_per_token, newline_floor: settings.newline_floor })
    }

    pub fn policy(&self) -> TrimPolicy { self.policy }

    /// Cost of a candidate; a zero count on non-empty content is re-estimated.
    fn cost(&self, candidate: &RetrievedCandidate, model: &str) -> usize {
        if candidate.token_count == 0 && !candidate.content.is_empty() {
            self.estimator.estimate(&candidate.content, model)
        } else {
            candidate.token_count
        }
    }

    /// Select a rank-ordered prefix of `ranked` whose total cost stays within `token_budget`.
    pub fn assemble(&self, ranked: &[RetrievedCandidate], token_budget: usize, model: &str) -> AssembledContext {
        let mut selected: Vec<RetrievedCandidate> = Vec::new();
        let mut tokens_used = 0usize;
        if token_budget == 0 {
            return AssembledContext { candidates: selected, tokens_used };
        }

        for candidate in ranked {
            let cost = self.cost(candidate, model);
            if tokens_used.saturating_add(cost) > token_budget {
                if selected.is_empty() {
                    if let Some(trimmed) = self.trim_to_budget(candidate, token_budget - tokens_used, model) {
                        debug!(id = %trimmed.id, from = cost, to = trimmed.token_count, "trimmed leading candidate");
                        tokens_used += trimmed.token_count;
                        selected.push(trimmed);
                    }
                }
                break;
            }
            selected.push(candidate.clone());
            tokens_used += cost;
            if tokens_used >= token_budget {
                break;
            }
        }

        debug!(selected = selected.len(), tokens_used, token_budget, "assembled context");
        AssembledContext { candidates: selected, tokens_used }
    }

    /// Derive a shortened copy of `candidate` costing at most `allowed_tokens`.
    ///
    /// The character window starts at `allowed_tokens * chars_per_token`. If the
    /// recomputed cost of the cut still exceeds the allowance, the window is
    /// shrunk in proportion and the cut is redone. Returns `None` when nothing
    /// non-empty fits.
    pub fn trim_to_budget(&self, candidate: &RetrievedCandidate, allowed_tokens: usize, model: &str) -> Option<RetrievedCandidate> {
        if allowed_tokens == 0 {
            return None;
        }
        let mut window = allowed_tokens.saturating_mul(self.policy.chars_per_token);
        loop {
            let text = cut_to_window(&candidate.content, window, self.policy.newline_floor);
            if text.is_empty() {
                return None;
            }
            let tokens = self.estimator.estimate(text, model);
            if tokens == 0 {
                return None;
            }
            if tokens <= allowed_tokens {
                return Some(candidate.with_content(text.to_string(), tokens));
            }
            let kept = text.chars().count();
            let scaled = (kept as u128 * allowed_tokens as u128 / tokens as u128) as usize;
            window = scaled.min(kept - 1);
            if window == 0 {
                return None;
            }
        }
    }
}
