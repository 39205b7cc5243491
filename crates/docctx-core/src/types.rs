//! Domain types shared by the retrieval ports, the ranker and the assembler.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Which retrieval path produced a row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SearchPath {
    Vector,
    Lexical,
}

impl std::fmt::Display for SearchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchPath::Vector => f.write_str("vector"),
            SearchPath::Lexical => f.write_str("lexical"),
        }
    }
}

/// A chunk of source text retrieved for a query.
///
/// - `id`: stable chunk key, identical across both retrieval paths
/// - `content`: the text span handed to the generation call
/// - `source_filename`: provenance label used for citations
/// - `chunk_index`: position of the chunk inside its source document
/// - `token_count`: estimated cost of `content` under the reference model
/// - `similarity_score`: path score before merging, combined score in `[0,1]` after
/// - `excerpt`: short preview for citation display, never used for budgeting
///
/// Records are not edited after construction. Budget assembly derives a new
/// record through [`RetrievedCandidate::with_content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    pub id: ChunkId,
    pub content: String,
    pub source_filename: String,
    pub chunk_index: usize,
    pub token_count: usize,
    pub similarity_score: f32,
    pub excerpt: String,
}

impl RetrievedCandidate {
    /// Copy of this candidate carrying replacement content and its recomputed cost.
    pub fn with_content(&self, content: String, token_count: usize) -> Self {
        Self { content, token_count, ..self.clone() }
    }
}

/// Raw row returned by the nearest-neighbour query.
///
/// Every field is optional so that partial rows deserialize; the normalizer
/// decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorRow {
    pub id: Option<String>,
    pub content: Option<String>,
    pub source_filename: Option<String>,
    pub chunk_index: Option<i64>,
    pub token_count: Option<i64>,
    #[serde(alias = "similarity_score")]
    pub similarity: Option<f64>,
    pub excerpt: Option<String>,
}

/// Raw row returned by the full-text query. `rank` is the backend's text
/// relevance score (BM25, `ts_rank`, ...), unbounded above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalRow {
    pub id: Option<String>,
    pub content: Option<String>,
    pub source_filename: Option<String>,
    pub chunk_index: Option<i64>,
    pub token_count: Option<i64>,
    pub rank: Option<f64>,
    pub excerpt: Option<String>,
}

/// Ordered, budget-compliant selection produced by context assembly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub candidates: Vec<RetrievedCandidate>,
    pub tokens_used: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool { self.candidates.is_empty() }
}
