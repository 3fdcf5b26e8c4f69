//! Domain types shared by the retriever, the prompt composer and the generator.

use serde::{Deserialize, Serialize};

pub type ChunkId = u32;

/// A unit of source text that was embedded and indexed ahead of time.
///
/// - `chunk_id`: position of the chunk in the corpus; also its citation label
/// - `text`: the payload, used verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub text: String,
}

impl Chunk {
    pub fn new(chunk_id: ChunkId, text: impl Into<String>) -> Self {
        Self { chunk_id, text: text.into() }
    }
}

/// Similarity metric the index was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Inner product. Equivalent to cosine similarity on unit vectors.
    Dot,
    /// Squared Euclidean distance.
    L2,
}

/// A nearest-neighbor match.
///
/// `score` is metric-specific but higher is always better (L2 distances are
/// negated).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub chunk_id: ChunkId,
    pub score: f32,
}

/// The answer to one question together with the context it was grounded on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagAnswer {
    pub text: String,
    pub context: Vec<Chunk>,
}

impl RagAnswer {
    pub fn cited_ids(&self) -> Vec<ChunkId> {
        self.context.iter().map(|c| c.chunk_id).collect()
    }
}
