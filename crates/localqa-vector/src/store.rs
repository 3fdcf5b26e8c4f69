//! On-disk artifact layout: `chunks.json` + `index.lance/` + `manifest.json`.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use tracing::info;

use localqa_core::config::ArtifactSettings;
use localqa_core::error::Error;

use crate::corpus::{check_pair, AlignedCorpus};
use crate::index::LanceIndex;
use crate::manifest::IndexManifest;
use crate::table::{open_db, table_exists, write_vectors};

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub chunks: PathBuf,
    pub index_dir: PathBuf,
    pub table: String,
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    /// `dir` is the already-resolved artifact directory.
    pub fn from_settings(settings: &ArtifactSettings, dir: &Path) -> Self {
        Self {
            chunks: dir.join(&settings.chunks_file),
            index_dir: dir.join(&settings.index_dir),
            table: settings.table.clone(),
            manifest: dir.join(&settings.manifest_file),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::from_settings(&ArtifactSettings::default(), dir)
    }
}

/// Must be called from within a tokio runtime; searches on the returned
/// corpus run on that runtime.
pub async fn load_artifacts(paths: &ArtifactPaths) -> Result<AlignedCorpus> {
    for p in [&paths.chunks, &paths.index_dir, &paths.manifest] {
        if !p.exists() {
            return Err(Error::NotFound(format!("artifact {}", p.display())).into());
        }
    }
    let raw = std::fs::read_to_string(&paths.chunks).with_context(|| format!("reading {}", paths.chunks.display()))?;
    let texts: Vec<String> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", paths.chunks.display()))?;
    let manifest = IndexManifest::read(&paths.manifest)?;

    let conn = open_db(&paths.index_dir.to_string_lossy()).await?;
    if !table_exists(&conn, &paths.table).await? {
        return Err(Error::NotFound(format!("table '{}' in {}", paths.table, paths.index_dir.display())).into());
    }
    let index = LanceIndex::open(&conn, &paths.table, manifest.metric).await?;
    let corpus = AlignedCorpus::new(texts, manifest, index)?;
    info!(
        chunks = corpus.len(),
        dim = corpus.dim(),
        model = %corpus.manifest().embedding_model,
        "loaded artifacts"
    );
    Ok(corpus)
}

fn parent_dir(p: &Path) -> Result<&Path> {
    let parent = p.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    Ok(parent)
}

/// Writes an already-embedded corpus, replacing whatever is at `paths`.
///
/// Everything is written to staging files next to the targets first; the
/// existing artifacts are only touched once every write has succeeded.
pub async fn save_artifacts(paths: &ArtifactPaths, texts: &[String], vectors: &[Vec<f32>], manifest: &IndexManifest) -> Result<()> {
    check_pair(texts, vectors, manifest)?;

    let staged_index = Builder::new().prefix(".index-staging-").tempdir_in(parent_dir(&paths.index_dir)?)?;
    {
        let conn = open_db(&staged_index.path().to_string_lossy()).await?;
        write_vectors(&conn, &paths.table, vectors, manifest.dim)
            .await
            .with_context(|| format!("writing table '{}'", paths.table))?;
    }
    let staged_chunks = NamedTempFile::new_in(parent_dir(&paths.chunks)?)?;
    std::fs::write(staged_chunks.path(), serde_json::to_string(texts)?)?;
    let staged_manifest = NamedTempFile::new_in(parent_dir(&paths.manifest)?)?;
    manifest.write(staged_manifest.path())?;

    let retired = if paths.index_dir.exists() {
        let dir = Builder::new().prefix(".index-retired-").tempdir_in(parent_dir(&paths.index_dir)?)?;
        std::fs::rename(&paths.index_dir, dir.path().join("index"))?;
        Some(dir)
    } else {
        None
    };
    if let Err(e) = std::fs::rename(staged_index.path(), &paths.index_dir) {
        if let Some(dir) = &retired {
            std::fs::rename(dir.path().join("index"), &paths.index_dir).context("restoring the previous index")?;
        }
        return Err(anyhow::Error::from(e).context(format!("moving index into {}", paths.index_dir.display())));
    }
    staged_chunks.persist(&paths.chunks)?;
    staged_manifest.persist(&paths.manifest)?;
    info!(chunks = texts.len(), dir = %paths.index_dir.display(), "saved artifacts");
    Ok(())
}
