//! Weighted fusion of the vector and lexical candidate lists.
//!
//! Each path is normalized by its own maximum score so that bounded cosine
//! similarity and unbounded text rank become comparable, then the two are
//! blended with the lexical weight `w`:
//!
//! ```text
//! combined = (1 - w) * vec / max_vec + w * lex / max_lex
//! ```
//!
//! Normalization is local to one call. Nothing is carried across queries.

use std::collections::HashMap;

use tracing::debug;

use docctx_core::config::validate_weight;
use docctx_core::types::{ChunkId, RetrievedCandidate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridRanker {
    lexical_weight: f32,
}

struct Entry {
    candidate: RetrievedCandidate,
    vec_score: f32,
    lex_score: f32,
}

impl HybridRanker {
    /// Fails when `lexical_weight` is not a finite value in `[0,1]`.
    pub fn new(lexical_weight: f32) -> docctx_core::Result<Self> {
        validate_weight(lexical_weight)?;
        Ok(Self { lexical_weight })
    }

    pub fn lexical_weight(&self) -> f32 { self.lexical_weight }

    /// Merge both paths into one deduplicated list, best combined score first.
    ///
    /// Equal scores keep insertion order: vector-path candidates in their
    /// input order, then lexical-only candidates in theirs. For an id found by
    /// both paths the vector-path record is kept and only its score changes.
    pub fn merge(&self, vector: Vec<RetrievedCandidate>, lexical: Vec<RetrievedCandidate>) -> Vec<RetrievedCandidate> {
        let max_vec = max_score(&vector);
        let max_lex = max_score(&lexical);
        let (n_vec, n_lex) = (vector.len(), lexical.len());

        let mut slots: HashMap<ChunkId, usize> = HashMap::with_capacity(n_vec + n_lex);
        let mut entries: Vec<Entry> = Vec::with_capacity(n_vec + n_lex);

        for c in vector {
            let norm = normalize(c.similarity_score, max_vec);
            match slots.get(&c.id) {
                Some(&i) => entries[i].vec_score = entries[i].vec_score.max(norm),
                None => {
                    slots.insert(c.id.clone(), entries.len());
                    entries.push(Entry { candidate: c, vec_score: norm, lex_score: 0.0 });
                }
            }
        }
        for c in lexical {
            let norm = normalize(c.similarity_score, max_lex);
            match slots.get(&c.id) {
                Some(&i) => entries[i].lex_score = entries[i].lex_score.max(norm),
                None => {
                    slots.insert(c.id.clone(), entries.len());
                    entries.push(Entry { candidate: c, vec_score: 0.0, lex_score: norm });
                }
            }
        }

        let w = self.lexical_weight;
        let mut merged: Vec<RetrievedCandidate> = entries
            .into_iter()
            .map(|e| {
                let combined = ((1.0 - w) * e.vec_score + w * e.lex_score).clamp(0.0, 1.0);
                RetrievedCandidate { similarity_score: combined, ..e.candidate }
            })
            .collect();
        // sort_by is stable, so ties stay in insertion order
        merged.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

        debug!(vector = n_vec, lexical = n_lex, merged = merged.len(), w, "merged retrieval paths");
        merged
    }
}

fn max_score(candidates: &[RetrievedCandidate]) -> f32 {
    candidates.iter().map(|c| c.similarity_score).fold(0.0, f32::max)
}

fn normalize(score: f32, max: f32) -> f32 {
    if max > 0.0 { score / max } else { score }
}
