use tracing::{debug, warn};

use localqa_core::error::{Error, Result};
use localqa_core::traits::Embedder;
use localqa_core::types::{Chunk, SearchHit};
use localqa_core::vector::l2_normalize;
use localqa_vector::AlignedCorpus;

/// Embeds questions and looks them up in the aligned corpus.
pub struct Retriever {
    corpus: AlignedCorpus,
    embedder: Box<dyn Embedder>,
}

impl Retriever {
    /// Fails when `embedder` is not the encoder the index was built with.
    pub fn new(corpus: AlignedCorpus, embedder: Box<dyn Embedder>) -> Result<Self> {
        let built_with = &corpus.manifest().embedding_model;
        if built_with != embedder.model_id() {
            return Err(Error::EmbeddingModelMismatch {
                index: built_with.clone(),
                query: embedder.model_id().to_string(),
            });
        }
        Ok(Self { corpus, embedder })
    }

    /// Nearest `k` hits for `question`, best first. `k` larger than the
    /// corpus is clamped to the corpus size. Blocks on the runtime the corpus
    /// was loaded on, so call it outside async tasks.
    pub fn search(&self, question: &str, k: usize) -> Result<Vec<SearchHit>> {
        if self.corpus.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if k == 0 {
            return Err(Error::InvalidK { k });
        }
        if k > self.corpus.len() {
            warn!(k, corpus = self.corpus.len(), "k exceeds corpus size; clamping");
        }
        let mut query = self
            .embedder
            .embed_batch(&[question.to_string()])
            .map_err(|e| Error::Embedding(format!("{:#}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("encoder returned no vector".into()))?;
        if query.len() != self.corpus.dim() {
            return Err(Error::EmbeddingDimensionMismatch { expected: self.corpus.dim(), actual: query.len() });
        }
        if self.corpus.manifest().normalized {
            l2_normalize(&mut query);
        }
        let hits = self.corpus.search(&query, k)?;
        debug!(k, hits = hits.len(), top = ?hits.first().map(|h| h.chunk_id), "retrieved");
        Ok(hits)
    }

    pub fn retrieve(&self, question: &str, k: usize) -> Result<Vec<Chunk>> {
        self.search(question, k)?
            .into_iter()
            .map(|h| {
                self.corpus
                    .chunk(h.chunk_id)
                    .ok_or_else(|| Error::MisalignedArtifacts(format!("hit {} has no chunk", h.chunk_id)))
            })
            .collect()
    }
}
