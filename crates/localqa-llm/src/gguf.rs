//! Quantized llama-family model (GGUF) on candle.
use anyhow::{anyhow, Result};
use candle_core::quantized::gguf_file;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use candle_transformers::utils::apply_repeat_penalty;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use localqa_core::config::LlmSettings;
use localqa_core::traits::{LanguageModel, TokenSource};
use localqa_core::device::select_device;

use crate::decode::TokenDecoder;
use crate::sampling::logits_processor;

/// The weights hold a single KV cache, so completions are serialized: a
/// session keeps the lock until it is dropped.
pub struct QuantizedLlama {
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    context_window: usize,
    eos_token: Option<u32>,
    settings: LlmSettings,
}

impl QuantizedLlama {
    pub fn load(model_path: &Path, tokenizer_path: &Path, settings: &LlmSettings) -> Result<Self> {
        let device = select_device();
        info!(model = %model_path.display(), "loading language model");
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let mut file = std::fs::File::open(model_path)?;
        let content = gguf_file::Content::read(&mut file).map_err(|e| e.with_path(model_path))?;
        let trained_ctx = content
            .metadata
            .get("llama.context_length")
            .and_then(|v| v.to_u32().ok())
            .map(|v| v as usize);
        let eos_token = content
            .metadata
            .get("tokenizer.ggml.eos_token_id")
            .and_then(|v| v.to_u32().ok())
            .or_else(|| tokenizer.token_to_id("</s>"));
        let model = ModelWeights::from_gguf(content, &mut file, &device)?;

        let context_window = trained_ctx.map_or(settings.context_window, |c| c.min(settings.context_window));
        info!(context_window, ?eos_token, "language model ready");
        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            context_window,
            eos_token,
            settings: settings.clone(),
        })
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        Ok(self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?
            .get_ids()
            .to_vec())
    }
}

impl LanguageModel for QuantizedLlama {
    fn context_window(&self) -> usize { self.context_window }

    fn token_count(&self, text: &str) -> Result<usize> { Ok(self.encode(text)?.len()) }

    fn start<'a>(&'a self, prompt: &str) -> Result<Box<dyn TokenSource + 'a>> {
        let tokens = self.encode(prompt)?;
        let model = self.model.lock().map_err(|_| anyhow!("language model lock poisoned by an earlier panic"))?;
        debug!(prompt_tokens = tokens.len(), "completion started");
        Ok(Box::new(LlamaSession {
            model,
            device: &self.device,
            decoder: TokenDecoder::new(&self.tokenizer),
            sampler: logits_processor(&self.settings),
            tokens,
            fed: 0,
            window: self.context_window,
            eos_token: self.eos_token,
            repeat_penalty: self.settings.repeat_penalty,
            repeat_last_n: self.settings.repeat_last_n,
            finished: false,
        }))
    }
}

struct LlamaSession<'a> {
    model: MutexGuard<'a, ModelWeights>,
    device: &'a Device,
    decoder: TokenDecoder<'a>,
    sampler: LogitsProcessor,
    /// Prompt followed by everything generated so far.
    tokens: Vec<u32>,
    /// How many of `tokens` are already in the KV cache.
    fed: usize,
    window: usize,
    eos_token: Option<u32>,
    repeat_penalty: f32,
    repeat_last_n: usize,
    finished: bool,
}

impl TokenSource for LlamaSession<'_> {
    fn next_token(&mut self) -> Result<Option<String>> {
        if self.finished || self.tokens.len() >= self.window {
            return Ok(None);
        }
        let input = Tensor::new(&self.tokens[self.fed..], self.device)?.unsqueeze(0)?;
        // index_pos 0 on the first step also resets the cache left by the previous session
        let logits = self.model.forward(&input, self.fed)?;
        self.fed = self.tokens.len();
        let logits = logits.squeeze(0)?.to_dtype(DType::F32)?;
        let logits = if (self.repeat_penalty - 1.0).abs() < f32::EPSILON {
            logits
        } else {
            let start = self.tokens.len().saturating_sub(self.repeat_last_n);
            apply_repeat_penalty(&logits, self.repeat_penalty, &self.tokens[start..])?
        };
        let next = self.sampler.sample(&logits)?;
        if Some(next) == self.eos_token {
            self.finished = true;
            return Ok(None);
        }
        self.tokens.push(next);
        Ok(Some(self.decoder.push(next)?))
    }
}
