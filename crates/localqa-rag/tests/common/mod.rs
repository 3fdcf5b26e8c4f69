#![allow(dead_code)]
use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::runtime::Runtime;

use localqa_core::traits::{Embedder, LanguageModel, TokenSource};
use localqa_core::types::Metric;
use localqa_core::vector::l2_normalize;
use localqa_rag::prompt::{CONTEXT_HEADER, QUESTION_HEADER};
use localqa_vector::{load_artifacts, save_artifacts, AlignedCorpus, ArtifactPaths, IndexManifest};

pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect()
}

/// One dimension per known word, so overlap is exact and collision free.
pub struct VocabEmbedder {
    id: String,
    vocab: Vec<String>,
}

impl VocabEmbedder {
    pub fn new(id: &str, texts: &[&str]) -> Self {
        let mut vocab: Vec<String> = texts.iter().flat_map(|t| words(t)).collect();
        vocab.sort();
        vocab.dedup();
        Self { id: id.to_string(), vocab }
    }
}

impl Embedder for VocabEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.vocab.len() }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0f32; self.vocab.len()];
                for w in words(t) {
                    if let Ok(i) = self.vocab.binary_search(&w) {
                        v[i] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}

/// Returns the same vector for every input.
pub struct FixedEmbedder {
    pub id: String,
    pub vector: Vec<f32>,
}

impl Embedder for FixedEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.vector.len() }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }
}

pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model_id(&self) -> &str { "failing" }
    fn dim(&self) -> usize { 2 }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("encoder crashed"))
    }
}

pub fn manifest(model: &str, dim: usize, count: usize, metric: Metric, normalized: bool) -> IndexManifest {
    IndexManifest { embedding_model: model.to_string(), dim, metric, normalized, count }
}

/// Artifact directories plus the runtime their indexes search on. Corpora
/// built here stay usable for as long as the store lives.
pub struct Store {
    rt: Runtime,
    dir: TempDir,
    next: AtomicUsize,
}

impl Store {
    pub fn new() -> Self {
        Self { rt: Runtime::new().unwrap(), dir: tempfile::tempdir().unwrap(), next: AtomicUsize::new(0) }
    }

    pub fn corpus(&self, texts: &[&str], vectors: Vec<Vec<f32>>, manifest: IndexManifest) -> AlignedCorpus {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let paths = ArtifactPaths::in_dir(&self.dir.path().join(n.to_string()));
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        self.rt
            .block_on(async {
                save_artifacts(&paths, &texts, &vectors, &manifest).await?;
                load_artifacts(&paths).await
            })
            .unwrap()
    }

    /// Embeds `texts` with `embedder` the way the index builder does.
    pub fn embedded(&self, embedder: &dyn Embedder, texts: &[&str]) -> AlignedCorpus {
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let mut vectors = embedder.embed_batch(&owned).unwrap();
        vectors.iter_mut().for_each(|v| l2_normalize(v));
        let m = manifest(embedder.model_id(), embedder.dim(), texts.len(), Metric::Dot, true);
        self.corpus(texts, vectors, m)
    }
}

/// Emits `pieces` in order, then `tail` forever (or ends when `tail` is None).
/// Counts whitespace-separated words as tokens.
pub struct ScriptedModel {
    pub window: usize,
    pub pieces: Vec<String>,
    pub tail: Option<String>,
}

impl ScriptedModel {
    pub fn new(pieces: &[&str]) -> Self {
        Self { window: 4096, pieces: pieces.iter().map(|p| p.to_string()).collect(), tail: None }
    }
}

struct Script {
    pieces: VecDeque<String>,
    tail: Option<String>,
}

impl TokenSource for Script {
    fn next_token(&mut self) -> Result<Option<String>> {
        Ok(self.pieces.pop_front().or_else(|| self.tail.clone()))
    }
}

impl LanguageModel for ScriptedModel {
    fn context_window(&self) -> usize { self.window }
    fn token_count(&self, text: &str) -> Result<usize> { Ok(text.split_whitespace().count()) }

    fn start<'a>(&'a self, _prompt: &str) -> Result<Box<dyn TokenSource + 'a>> {
        Ok(Box::new(Script { pieces: self.pieces.iter().cloned().collect(), tail: self.tail.clone() }))
    }
}

/// Repeats the prompt's context block word by word, then runs on into a new
/// question section. Records every prompt it is given.
#[derive(Default)]
pub struct EchoModel {
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl LanguageModel for EchoModel {
    fn context_window(&self) -> usize { 4096 }
    fn token_count(&self, text: &str) -> Result<usize> { Ok(text.split_whitespace().count()) }

    fn start<'a>(&'a self, prompt: &str) -> Result<Box<dyn TokenSource + 'a>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let start = prompt.find(CONTEXT_HEADER).ok_or_else(|| anyhow!("no context header"))? + CONTEXT_HEADER.len();
        let end = prompt.find(QUESTION_HEADER).ok_or_else(|| anyhow!("no question header"))?;
        let mut pieces: VecDeque<String> = prompt[start..end].split_whitespace().map(|w| format!(" {}", w)).collect();
        pieces.extend(["\n\n###".to_string(), " Question".to_string(), "\nWhat else?".to_string()]);
        Ok(Box::new(Script { pieces, tail: None }))
    }
}

pub struct FailingModel;

impl LanguageModel for FailingModel {
    fn context_window(&self) -> usize { 4096 }
    fn token_count(&self, text: &str) -> Result<usize> { Ok(text.split_whitespace().count()) }

    fn start<'a>(&'a self, _prompt: &str) -> Result<Box<dyn TokenSource + 'a>> {
        Err(anyhow!("model weights unavailable"))
    }
}
