use async_trait::async_trait;

use crate::types::{LexicalRow, VectorRow};

/// Nearest-neighbour half of the retrieval port.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn vector_search(&self, query_embedding: &[f32], limit: usize) -> anyhow::Result<Vec<VectorRow>>;
}

/// Full-text half of the retrieval port.
#[async_trait]
pub trait LexicalSearch: Send + Sync {
    async fn lexical_search(&self, query_text: &str, limit: usize) -> anyhow::Result<Vec<LexicalRow>>;
}

/// Token cost of a text span for a target model.
///
/// Implementations must be deterministic and monotonic in the length of the
/// text: extending a text never lowers its estimate.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str, model: &str) -> usize;
}

impl<T: TokenEstimator + ?Sized> TokenEstimator for std::sync::Arc<T> {
    fn estimate(&self, text: &str, model: &str) -> usize { (**self).estimate(text, model) }
}

impl<T: TokenEstimator + ?Sized> TokenEstimator for Box<T> {
    fn estimate(&self, text: &str, model: &str) -> usize { (**self).estimate(text, model) }
}

#[async_trait]
impl<T: VectorSearch + ?Sized> VectorSearch for std::sync::Arc<T> {
    async fn vector_search(&self, query_embedding: &[f32], limit: usize) -> anyhow::Result<Vec<VectorRow>> {
        (**self).vector_search(query_embedding, limit).await
    }
}

#[async_trait]
impl<T: LexicalSearch + ?Sized> LexicalSearch for std::sync::Arc<T> {
    async fn lexical_search(&self, query_text: &str, limit: usize) -> anyhow::Result<Vec<LexicalRow>> {
        (**self).lexical_search(query_text, limit).await
    }
}
