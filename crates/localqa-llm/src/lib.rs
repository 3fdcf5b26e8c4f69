//! localqa-llm
//!
//! Local answer generation with a quantized GGUF language model on candle.
use anyhow::Result;
use std::path::Path;

use localqa_core::config::LlmSettings;
use localqa_core::error::Error;
use localqa_core::traits::LanguageModel;

pub mod decode;
pub mod gguf;
pub mod sampling;

pub use decode::TokenDecoder;
pub use gguf::QuantizedLlama;

pub fn load_language_model(settings: &LlmSettings, model_path: &Path, tokenizer_path: &Path) -> Result<Box<dyn LanguageModel>> {
    for (what, p) in [("language model", model_path), ("tokenizer", tokenizer_path)] {
        if !p.exists() {
            return Err(Error::NotFound(format!("{} {}", what, p.display())).into());
        }
    }
    Ok(Box::new(QuantizedLlama::load(model_path, tokenizer_path, settings)?))
}
