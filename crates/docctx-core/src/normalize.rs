//! Conversion of raw retrieval rows into [`RetrievedCandidate`]s.
//!
//! Each path has its own constructor feeding the same record type. Rows that
//! cannot yield an id and some content are dropped with a warning; every other
//! missing field falls back to its zero value.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::RetrievalSettings;
use crate::traits::TokenEstimator;
use crate::types::{LexicalRow, RetrievedCandidate, SearchPath, VectorRow};

pub const DEFAULT_EXCERPT_CHARS: usize = 250;

/// First `max_chars` characters of `text`, cut on a character boundary.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Path scores are expected to be non-negative; anything else counts as no signal.
fn sanitize_score(score: Option<f64>) -> f32 {
    match score {
        Some(s) if s.is_finite() && s > 0.0 => s.min(f64::from(f32::MAX)) as f32,
        _ => 0.0,
    }
}

struct RowFields {
    id: Option<String>,
    content: Option<String>,
    source_filename: Option<String>,
    chunk_index: Option<i64>,
    token_count: Option<i64>,
    score: Option<f64>,
    excerpt: Option<String>,
}

impl From<VectorRow> for RowFields {
    fn from(r: VectorRow) -> Self {
        Self { id: r.id, content: r.content, source_filename: r.source_filename, chunk_index: r.chunk_index, token_count: r.token_count, score: r.similarity, excerpt: r.excerpt }
    }
}

impl From<LexicalRow> for RowFields {
    fn from(r: LexicalRow) -> Self {
        Self { id: r.id, content: r.content, source_filename: r.source_filename, chunk_index: r.chunk_index, token_count: r.token_count, score: r.rank, excerpt: r.excerpt }
    }
}

#[derive(Clone)]
pub struct CandidateNormalizer {
    estimator: Arc<dyn TokenEstimator>,
    model: String,
    excerpt_chars: usize,
}

impl CandidateNormalizer {
    pub fn new(estimator: Arc<dyn TokenEstimator>, model: impl Into<String>, excerpt_chars: usize) -> Self {
        Self { estimator, model: model.into(), excerpt_chars }
    }

    pub fn from_settings(estimator: Arc<dyn TokenEstimator>, settings: &RetrievalSettings) -> Self {
        Self::new(estimator, settings.model.clone(), settings.excerpt_chars)
    }

    pub fn from_vector_row(&self, row: VectorRow) -> Option<RetrievedCandidate> {
        self.build(SearchPath::Vector, row.into())
    }

    pub fn from_lexical_row(&self, row: LexicalRow) -> Option<RetrievedCandidate> {
        self.build(SearchPath::Lexical, row.into())
    }

    /// Convert a whole vector-path batch, ordered by score descending.
    pub fn normalize_vector(&self, rows: Vec<VectorRow>) -> Vec<RetrievedCandidate> {
        let total = rows.len();
        let out = sort_by_score(rows.into_iter().filter_map(|r| self.from_vector_row(r)).collect());
        debug!(path = %SearchPath::Vector, rows = total, kept = out.len(), "normalized rows");
        out
    }

    /// Convert a whole lexical-path batch, ordered by score descending.
    pub fn normalize_lexical(&self, rows: Vec<LexicalRow>) -> Vec<RetrievedCandidate> {
        let total = rows.len();
        let out = sort_by_score(rows.into_iter().filter_map(|r| self.from_lexical_row(r)).collect());
        debug!(path = %SearchPath::Lexical, rows = total, kept = out.len(), "normalized rows");
        out
    }

    fn build(&self, path: SearchPath, row: RowFields) -> Option<RetrievedCandidate> {
        let id = match row.id.map(|s| s.trim().to_string()) {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!(%path, "dropping row without id");
                return None;
            }
        };
        let content = match row.content {
            Some(c) if !c.is_empty() => c,
            _ => {
                warn!(%path, %id, "dropping row without content");
                return None;
            }
        };
        let token_count = match row.token_count.and_then(|n| usize::try_from(n).ok()) {
            Some(n) if n > 0 => n,
            _ => self.estimator.estimate(&content, &self.model),
        };
        let excerpt = match row.excerpt {
            Some(e) if !e.is_empty() => preview(&e, self.excerpt_chars),
            _ => preview(&content, self.excerpt_chars),
        };
        Some(RetrievedCandidate {
            id,
            source_filename: row.source_filename.unwrap_or_default(),
            chunk_index: row.chunk_index.and_then(|i| usize::try_from(i).ok()).unwrap_or(0),
            token_count,
            similarity_score: sanitize_score(row.score),
            excerpt,
            content,
        })
    }
}

fn sort_by_score(mut candidates: Vec<RetrievedCandidate>) -> Vec<RetrievedCandidate> {
    candidates.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    candidates
}
