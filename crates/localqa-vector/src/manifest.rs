//! Build-time facts about the index that query time must agree with.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use localqa_core::types::Metric;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Identifier of the encoder the vectors were produced with.
    pub embedding_model: String,
    pub dim: usize,
    pub metric: Metric,
    /// Whether stored vectors are unit length; queries are normalized to match.
    pub normalized: bool,
    pub count: usize,
}

impl IndexManifest {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing manifest {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("writing manifest {}", path.display()))
    }
}
