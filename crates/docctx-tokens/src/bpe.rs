//! OpenAI BPE token counting via `tiktoken-rs`.

use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer};
use tiktoken_rs::CoreBPE;

use docctx_core::error::{Error, Result};
use docctx_core::traits::TokenEstimator;

/// Longest run of characters charged as one segment.
const SEGMENT_CHARS: usize = 32;

/// Counts tokens with `o200k_base` for models that use it and `cl100k_base`
/// for everything else, unknown model names included.
///
/// A raw BPE count can drop when a character is appended ("hello worl" is
/// three tokens, "hello world" two). The text is therefore split into
/// segments of leading whitespace plus a word, capped at [`SEGMENT_CHARS`],
/// and each segment is charged the largest count of any of its prefixes.
/// Appending a character either extends the last segment or opens a new
/// one, so the total never decreases. Segments follow the BPE
/// pre-tokenizer's word split, so the result stays at or slightly above the
/// exact count.
pub struct TiktokenEstimator {
    o200k: CoreBPE,
    cl100k: CoreBPE,
}

impl TiktokenEstimator {
    pub fn new() -> Result<Self> {
        let o200k = tiktoken_rs::o200k_base().map_err(|e| Error::Tokenizer(format!("o200k_base: {e}")))?;
        let cl100k = tiktoken_rs::cl100k_base().map_err(|e| Error::Tokenizer(format!("cl100k_base: {e}")))?;
        Ok(Self { o200k, cl100k })
    }

    fn bpe_for(&self, model: &str) -> &CoreBPE {
        match get_tokenizer(model) {
            Some(Tokenizer::O200kBase) => &self.o200k,
            _ => &self.cl100k,
        }
    }

    pub fn count(&self, text: &str, model: &str) -> usize {
        let bpe = self.bpe_for(model);
        segments(text)
            .map(|seg| {
                seg.char_indices()
                    .map(|(i, ch)| bpe.encode_ordinary(&seg[..i + ch.len_utf8()]).len())
                    .max()
                    .unwrap_or(0)
            })
            .sum()
    }
}

/// Split `text` left to right; a boundary depends only on the characters before it.
fn segments(text: &str) -> impl Iterator<Item = &str> + '_ {
    let mut start = 0;
    let mut chars = 0;
    let mut prev_ws = true;
    let mut bounds = Vec::new();
    for (i, ch) in text.char_indices() {
        let ws = ch.is_whitespace();
        if i > start && ((ws && !prev_ws) || chars == SEGMENT_CHARS) {
            bounds.push((start, i));
            start = i;
            chars = 0;
        }
        chars += 1;
        prev_ws = ws;
    }
    if start < text.len() {
        bounds.push((start, text.len()));
    }
    bounds.into_iter().map(move |(a, b)| &text[a..b])
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str, model: &str) -> usize { self.count(text, model) }
}
