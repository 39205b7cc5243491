use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use docctx_core::config::RetrievalSettings;
use docctx_core::traits::{LexicalSearch, VectorSearch};
use docctx_core::types::{LexicalRow, RetrievedCandidate, VectorRow};
use docctx_hybrid::HybridSearchEngine;
use docctx_tokens::CharRatioEstimator;

struct StaticVector(Vec<VectorRow>);

#[async_trait]
impl VectorSearch for StaticVector {
    async fn vector_search(&self, query_embedding: &[f32], limit: usize) -> anyhow::Result<Vec<VectorRow>> {
        assert!(!query_embedding.is_empty());
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

struct StaticLexical(Vec<LexicalRow>);

#[async_trait]
impl LexicalSearch for StaticLexical {
    async fn lexical_search(&self, _query_text: &str, limit: usize) -> anyhow::Result<Vec<LexicalRow>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

struct FailingLexical;

#[async_trait]
impl LexicalSearch for FailingLexical {
    async fn lexical_search(&self, _query_text: &str, _limit: usize) -> anyhow::Result<Vec<LexicalRow>> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

struct FailingVector;

#[async_trait]
impl VectorSearch for FailingVector {
    async fn vector_search(&self, _query_embedding: &[f32], _limit: usize) -> anyhow::Result<Vec<VectorRow>> {
        Err(anyhow::anyhow!("rpc error"))
    }
}

struct SlowLexical;

#[async_trait]
impl LexicalSearch for SlowLexical {
    async fn lexical_search(&self, _query_text: &str, _limit: usize) -> anyhow::Result<Vec<LexicalRow>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![LexicalRow { id: Some("late".into()), content: Some("late".into()), rank: Some(1.0), ..Default::default() }])
    }
}

fn vrow(id: &str, sim: f64, tokens: i64) -> VectorRow {
    VectorRow {
        id: Some(id.into()),
        content: Some(format!("{id} ").repeat(tokens as usize * 2)),
        source_filename: Some(format!("{id}.md")),
        chunk_index: Some(0),
        token_count: Some(tokens),
        similarity: Some(sim),
        excerpt: None,
    }
}

fn lrow(id: &str, rank: f64, tokens: i64) -> LexicalRow {
    LexicalRow {
        id: Some(id.into()),
        content: Some(format!("{id} ").repeat(tokens as usize * 2)),
        source_filename: Some(format!("{id}.md")),
        chunk_index: Some(1),
        token_count: Some(tokens),
        rank: Some(rank),
        excerpt: None,
    }
}

fn settings(w: f32) -> RetrievalSettings {
    RetrievalSettings { lexical_weight: w, path_timeout_ms: 200, ..Default::default() }
}

fn engine<V: VectorSearch, L: LexicalSearch>(v: V, l: L, w: f32) -> HybridSearchEngine<V, L> {
    HybridSearchEngine::new(v, l, Arc::new(CharRatioEstimator::default()), settings(w)).expect("engine")
}

fn ids(list: &[RetrievedCandidate]) -> Vec<&str> { list.iter().map(|c| c.id.as_str()).collect() }

fn assert_ranked(list: &[RetrievedCandidate]) {
    let mut seen = HashSet::new();
    for pair in list.windows(2) { assert!(pair[0].similarity_score >= pair[1].similarity_score); }
    for c in list {
        assert!((0.0..=1.0).contains(&c.similarity_score), "{} scored {}", c.id, c.similarity_score);
        assert!(seen.insert(c.id.clone()), "duplicate id {}", c.id);
    }
}

#[tokio::test]
async fn overlapping_candidate_ranks_first() {
    let e = engine(StaticVector(vec![vrow("a", 0.95, 50), vrow("b", 0.90, 60)]), StaticLexical(vec![lrow("b", 2.0, 60), lrow("c", 1.5, 40)]), 0.5);
    let merged = e.hybrid_search(&[0.1, 0.2], "query", Some(3)).await;
    assert_eq!(ids(&merged), vec!["b", "a", "c"]);
    assert_ranked(&merged);
    // vector-path provenance wins for b
    assert_eq!(merged[0].chunk_index, 0);
}

#[tokio::test]
async fn failed_lexical_path_degrades_to_vector_ranking() {
    let e = engine(StaticVector(vec![vrow("a", 0.9, 10), vrow("b", 0.45, 10)]), FailingLexical, 0.0);
    let merged = e.hybrid_search(&[1.0], "query", None).await;
    assert_eq!(ids(&merged), vec!["a", "b"]);
    assert!((merged[0].similarity_score - 1.0).abs() < 1e-6);
    assert!((merged[1].similarity_score - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn failed_vector_path_keeps_lexical_results() {
    let e = engine(FailingVector, StaticLexical(vec![lrow("x", 3.0, 5), lrow("y", 1.0, 5)]), 0.4);
    let merged = e.hybrid_search(&[1.0], "query", None).await;
    assert_eq!(ids(&merged), vec!["x", "y"]);
    assert_ranked(&merged);
}

#[tokio::test]
async fn both_paths_failing_yields_no_candidates() {
    docctx_core::logging::init_test_tracing();
    let e = engine(FailingVector, FailingLexical, 0.3);
    assert!(e.hybrid_search(&[1.0], "query", None).await.is_empty());
    let ctx = e.retrieve_context(&[1.0], "query").await;
    assert!(ctx.is_empty());
    assert_eq!(ctx.tokens_used, 0);
}

#[tokio::test]
async fn slow_path_times_out_without_blocking_the_other() {
    docctx_core::logging::init_test_tracing();
    let e = engine(StaticVector(vec![vrow("a", 0.9, 10)]), SlowLexical, 0.5);
    let started = Instant::now();
    let merged = e.hybrid_search(&[1.0], "query", None).await;
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(ids(&merged), vec!["a"]);
}

#[tokio::test]
async fn malformed_rows_are_skipped() {
    let mut broken = vrow("", 0.99, 10);
    broken.id = None;
    let no_content = VectorRow { id: Some("empty".into()), similarity: Some(0.5), ..Default::default() };
    let e = engine(StaticVector(vec![broken, vrow("a", 0.8, 10), no_content]), StaticLexical(vec![]), 0.3);
    let merged = e.hybrid_search(&[1.0], "query", None).await;
    assert_eq!(ids(&merged), vec!["a"]);
}

#[tokio::test]
async fn top_k_limits_each_path() {
    let vectors = (0..10).map(|i| vrow(&format!("v{i}"), 1.0 - f64::from(i) * 0.05, 5)).collect();
    let lexical = (0..10).map(|i| lrow(&format!("l{i}"), 10.0 - f64::from(i), 5)).collect();
    let e = engine(StaticVector(vectors), StaticLexical(lexical), 0.5);
    let merged = e.hybrid_search(&[1.0], "query", Some(3)).await;
    assert_eq!(merged.len(), 6);
    assert_ranked(&merged);
}

#[tokio::test]
async fn retrieve_context_respects_configured_budget() {
    let e = HybridSearchEngine::new(
        StaticVector(vec![vrow("doc1", 0.9, 1000), vrow("doc2", 0.8, 800), vrow("doc3", 0.7, 600)]),
        StaticLexical(vec![]),
        Arc::new(CharRatioEstimator::default()),
        RetrievalSettings { token_budget: 1500, ..settings(0.3) },
    )
    .expect("engine");

    let ctx = e.retrieve_context(&[1.0], "sma").await;
    assert_eq!(ids(&ctx.candidates), vec!["doc1"]);
    assert_eq!(ctx.tokens_used, 1000);

    let prompt = e.build_prompt(docctx_hybrid::prompt::DEFAULT_SYSTEM_PROMPT, "How do I compute an SMA?", &ctx);
    assert!(prompt.user.starts_with("Source: doc1.md\n"));
    assert!(prompt.user.ends_with("How do I compute an SMA?"));
    assert_eq!(prompt.sources.len(), 1);
}

#[test]
fn invalid_settings_fail_at_construction() {
    let bad = RetrievalSettings { lexical_weight: 2.0, ..Default::default() };
    let r = HybridSearchEngine::new(StaticVector(vec![]), StaticLexical(vec![]), Arc::new(CharRatioEstimator::default()), bad);
    assert!(r.is_err());

    let bad = RetrievalSettings { top_k: 0, ..Default::default() };
    let r = HybridSearchEngine::new(StaticVector(vec![]), StaticLexical(vec![]), Arc::new(CharRatioEstimator::default()), bad);
    assert!(r.is_err());
}
