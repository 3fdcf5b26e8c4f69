use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;

/// Turns generated token ids into text one token at a time.
///
/// Sentencepiece-style vocabularies only produce correct spacing when decoded
/// as a sequence, so the whole generated sequence is re-decoded and the new
/// suffix is returned. Pieces ending inside a multi-byte character yield an
/// empty string until the character completes.
pub struct TokenDecoder<'a> {
    tokenizer: &'a Tokenizer,
    tokens: Vec<u32>,
    emitted: usize,
}

impl<'a> TokenDecoder<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self { tokenizer, tokens: Vec::new(), emitted: 0 }
    }

    pub fn push(&mut self, token: u32) -> Result<String> {
        self.tokens.push(token);
        let text = self
            .tokenizer
            .decode(&self.tokens, true)
            .map_err(|e| anyhow!("Decoding failed: {}", e))?;
        if text.ends_with('\u{FFFD}') {
            return Ok(String::new());
        }
        let piece = text.get(self.emitted..).unwrap_or_default().to_string();
        self.emitted = text.len();
        Ok(piece)
    }
}
