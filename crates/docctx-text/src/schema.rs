//! Index layout expected from whatever process builds the chunk index.
use tantivy::schema::{Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::{doc, Index, TantivyDocument};

pub const CONTENT_TOKENIZER: &str = "docctx_text";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	let content_indexing = TextFieldIndexing::default().set_tokenizer(CONTENT_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	schema_builder.add_text_field("content", TextOptions::default().set_indexing_options(content_indexing).set_stored());
	schema_builder.add_text_field("source_filename", STRING | STORED);
	schema_builder.add_u64_field("chunk_index", STORED);
	schema_builder.add_u64_field("token_count", STORED);
	schema_builder.build()
}

/// Must be called on every `Index` handle before querying the content field.
pub fn register_tokenizer(index: &Index) {
	let stop_words = [
		"a","an","and","are","as","at","be","by","for","from","has","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","there","then","than","so","if","when","where","why","how","what","which","who","can","could","should","would","do","does","did","i","you","my",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(CONTENT_TOKENIZER, tokenizer);
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkFields {
	pub id: Field,
	pub content: Field,
	pub source_filename: Field,
	pub chunk_index: Field,
	pub token_count: Field,
}

impl ChunkFields {
	pub fn resolve(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field("id")?,
			content: schema.get_field("content")?,
			source_filename: schema.get_field("source_filename")?,
			chunk_index: schema.get_field("chunk_index")?,
			token_count: schema.get_field("token_count")?,
		})
	}

	pub fn document(&self, id: &str, content: &str, source_filename: &str, chunk_index: u64, token_count: u64) -> TantivyDocument {
		doc!(
			self.id => id.to_string(),
			self.content => content.to_string(),
			self.source_filename => source_filename.to_string(),
			self.chunk_index => chunk_index,
			self.token_count => token_count,
		)
	}
}
