//! Query-time sentence embeddings.
//!
//! `BertEmbedder` runs a BERT-family sentence-transformer (all-MiniLM-L6-v2 by
//! default) on candle and mean-pools the last hidden state. `FakeEmbedder` is
//! a deterministic hashed bag-of-words used in development and tests.
use anyhow::{anyhow, ensure, Result};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};
use twox_hash::XxHash64;

use localqa_core::config::EmbeddingSettings;
use localqa_core::device::select_device;
use localqa_core::error::Error;
use localqa_core::traits::Embedder;

pub mod pool;
pub mod tokenize;

pub use pool::masked_mean;
pub use tokenize::tokenize_batch;

pub const FAKE_DIM: usize = 384;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    pad_id: u32,
}

impl BertEmbedder {
    /// Loads `tokenizer.json`, `config.json` and either `model.safetensors` or
    /// `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: &Path, model_id: &str, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(model = model_id, dir = %model_dir.display(), "loading sentence encoder");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0);
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, &device)? }
        } else {
            let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
            let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, DType::F32, &device)
        };
        let model = BertModel::load(vb, &config)?;
        info!(dim, "sentence encoder ready");
        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), dim, max_len, pad_id })
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean(&hidden, &attention_mask)?;
        let out: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

/// Hashed bag of lowercase alphanumeric words. Same text, same vector.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        ensure!(dim > 0, "fake embedder needs a positive dimension");
        Ok(Self { dim, id: format!("fake:d{}", dim) })
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

impl FakeEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let word: String = token.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect();
            if word.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0);
            word.hash(&mut hasher);
            v[(hasher.finish() as usize) % self.dim] += 1.0;
        }
        v
    }
}

fn fake_requested(settings: &EmbeddingSettings) -> bool {
    settings.fake
        || std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

/// Builds the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` or
/// `embedding.fake = true` selects [`FakeEmbedder`].
pub fn load_embedder(settings: &EmbeddingSettings, model_dir: &Path) -> Result<Box<dyn Embedder>> {
    if fake_requested(settings) {
        info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(FAKE_DIM)?));
    }
    if !model_dir.exists() {
        return Err(Error::NotFound(format!("embedding model directory {}", model_dir.display())).into());
    }
    Ok(Box::new(BertEmbedder::load(model_dir, &settings.model_name, settings.max_len)?))
}
