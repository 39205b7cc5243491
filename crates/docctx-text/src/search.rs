//! docctx-text
//!
//! Lexical half of the retrieval port backed by an existing tantivy index.
//! The index is opened read-only; building it belongs to the ingestion side.
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, TantivyDocument};
use tracing::{debug, warn};

use docctx_core::error::Error;
use docctx_core::traits::LexicalSearch;
use docctx_core::types::LexicalRow;

use crate::schema::{register_tokenizer, ChunkFields};

#[derive(Clone)]
pub struct TantivyLexicalSearch {
	index: Index,
	reader: IndexReader,
	fields: ChunkFields,
}

impl TantivyLexicalSearch {
	pub fn open(index_dir: &Path) -> docctx_core::Result<Self> {
		let index = Index::open_in_dir(index_dir).map_err(|e| Error::Index(format!("{}: {}", index_dir.display(), e)))?;
		Self::from_index(index)
	}

	pub fn from_index(index: Index) -> docctx_core::Result<Self> {
		register_tokenizer(&index);
		let fields = ChunkFields::resolve(&index.schema()).map_err(|e| Error::Index(e.to_string()))?;
		let reader = index.reader().map_err(|e| Error::Index(e.to_string()))?;
		Ok(Self { index, reader, fields })
	}

	/// BM25 top-`limit` for `query_text`. Syntax errors in the query are
	/// tolerated: whatever part of it parses is searched.
	pub fn search_blocking(&self, query_text: &str, limit: usize) -> Result<Vec<LexicalRow>> {
		if limit == 0 || query_text.trim().is_empty() { return Ok(vec![]); }
		let parser = QueryParser::for_index(&self.index, vec![self.fields.content]);
		let (query, errors) = parser.parse_query_lenient(query_text);
		if !errors.is_empty() { debug!(errors = errors.len(), "query parsed leniently"); }
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
		let mut rows = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.fields.id).and_then(|v| v.as_str()).map(str::to_string);
			if id.is_none() { warn!(?addr, "indexed chunk has no id"); }
			rows.push(LexicalRow {
				id,
				content: doc.get_first(self.fields.content).and_then(|v| v.as_str()).map(str::to_string),
				source_filename: doc.get_first(self.fields.source_filename).and_then(|v| v.as_str()).map(str::to_string),
				chunk_index: doc.get_first(self.fields.chunk_index).and_then(|v| v.as_u64()).and_then(|n| i64::try_from(n).ok()),
				token_count: doc.get_first(self.fields.token_count).and_then(|v| v.as_u64()).and_then(|n| i64::try_from(n).ok()),
				rank: Some(f64::from(score)),
				excerpt: None,
			});
		}
		Ok(rows)
	}
}

#[async_trait]
impl LexicalSearch for TantivyLexicalSearch {
	async fn lexical_search(&self, query_text: &str, limit: usize) -> Result<Vec<LexicalRow>> {
		let this = self.clone();
		let query_text = query_text.to_string();
		tokio::task::spawn_blocking(move || this.search_blocking(&query_text, limit)).await?
	}
}
