pub mod schema;
pub mod search;

pub use schema::{build_schema, register_tokenizer, ChunkFields};
pub use search::TantivyLexicalSearch;
