//! The chunk texts and their vector index bundled behind one type.
//!
//! Position is identity: vector row `i` belongs to the chunk whose id is `i`.
//! Construction rejects any pair that cannot honor that.
use localqa_core::error::{Error, Result};
use localqa_core::types::{Chunk, ChunkId, SearchHit};

use crate::index::LanceIndex;
use crate::manifest::IndexManifest;

fn misaligned(msg: String) -> Error { Error::MisalignedArtifacts(msg) }

fn check_shape(texts: usize, manifest: &IndexManifest) -> Result<()> {
    if manifest.count != texts {
        return Err(misaligned(format!(
            "manifest declares {} entries but {} chunks are present",
            manifest.count, texts
        )));
    }
    if manifest.dim == 0 {
        return Err(misaligned("manifest declares dimension 0".into()));
    }
    if u32::try_from(texts).is_err() {
        return Err(misaligned(format!("{} chunks exceed the id space", texts)));
    }
    Ok(())
}

/// Validates an in-memory `(texts, vectors)` pair before it is written.
pub fn check_pair(texts: &[String], vectors: &[Vec<f32>], manifest: &IndexManifest) -> Result<()> {
    if texts.len() != vectors.len() {
        return Err(misaligned(format!("{} chunks but {} vectors", texts.len(), vectors.len())));
    }
    check_shape(texts.len(), manifest)?;
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != manifest.dim) {
        return Err(misaligned(format!(
            "vector {} has dimension {} but the manifest declares {}",
            i,
            v.len(),
            manifest.dim
        )));
    }
    Ok(())
}

pub struct AlignedCorpus {
    texts: Vec<String>,
    manifest: IndexManifest,
    index: LanceIndex,
}

impl AlignedCorpus {
    pub fn new(texts: Vec<String>, manifest: IndexManifest, index: LanceIndex) -> Result<Self> {
        check_shape(texts.len(), &manifest)?;
        if index.len() != texts.len() {
            return Err(misaligned(format!("{} chunks but {} vectors", texts.len(), index.len())));
        }
        if index.dim() != manifest.dim {
            return Err(misaligned(format!(
                "index stores dimension {} but the manifest declares {}",
                index.dim(),
                manifest.dim
            )));
        }
        Ok(Self { texts, manifest, index })
    }

    pub fn len(&self) -> usize { self.texts.len() }

    pub fn is_empty(&self) -> bool { self.texts.is_empty() }

    pub fn dim(&self) -> usize { self.manifest.dim }

    pub fn manifest(&self) -> &IndexManifest { &self.manifest }

    pub fn chunk(&self, chunk_id: ChunkId) -> Option<Chunk> {
        self.texts.get(chunk_id as usize).map(|t| Chunk::new(chunk_id, t.clone()))
    }

    /// Nearest first; equal scores keep ascending chunk id. `k` above the
    /// corpus size returns every chunk. Blocks on the index runtime.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if k == 0 {
            return Err(Error::InvalidK { k });
        }
        if query.len() != self.dim() {
            return Err(Error::EmbeddingDimensionMismatch { expected: self.dim(), actual: query.len() });
        }
        self.index.search(query, k)
    }
}
