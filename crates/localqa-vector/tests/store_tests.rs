use localqa_core::error::Error;
use localqa_core::types::Metric;
use localqa_vector::{load_artifacts, save_artifacts, ArtifactPaths, IndexManifest};

fn sample() -> (Vec<String>, Vec<Vec<f32>>, IndexManifest) {
    let texts: Vec<String> = (0..5).map(|i| format!("chunk number {}", i)).collect();
    let vectors: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32, 1.0, -(i as f32)]).collect();
    let manifest = IndexManifest { embedding_model: "fake:d3".into(), dim: 3, metric: Metric::Dot, normalized: false, count: 5 };
    (texts, vectors, manifest)
}

#[test]
fn save_then_load_preserves_alignment() -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let tmp = tempfile::tempdir()?;
    let paths = ArtifactPaths::in_dir(tmp.path());
    let (texts, vectors, manifest) = sample();
    let corpus = rt.block_on(async {
        save_artifacts(&paths, &texts, &vectors, &manifest).await?;
        load_artifacts(&paths).await
    })?;

    assert_eq!(corpus.len(), 5);
    assert_eq!(corpus.manifest(), &manifest);
    for (i, text) in texts.iter().enumerate() {
        assert_eq!(&corpus.chunk(i as u32).unwrap().text, text);
    }
    // chunk 4 has the largest first component
    let hits = corpus.search(&[1.0, 0.0, 0.0], 1)?;
    assert_eq!(hits[0].chunk_id, 4);
    assert_eq!(hits[0].score, 4.0);
    Ok(())
}

#[tokio::test]
async fn saving_twice_replaces_the_index() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let paths = ArtifactPaths::in_dir(tmp.path());
    let (texts, vectors, manifest) = sample();
    save_artifacts(&paths, &texts, &vectors, &manifest).await?;
    let smaller = IndexManifest { count: 2, ..manifest.clone() };
    save_artifacts(&paths, &texts[..2], &vectors[..2], &smaller).await?;
    assert_eq!(load_artifacts(&paths).await?.len(), 2);
    let leftovers = std::fs::read_dir(tmp.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".index-"))
        .count();
    assert_eq!(leftovers, 0, "staging directories are cleaned up");
    Ok(())
}

#[tokio::test]
async fn failed_write_keeps_previous_artifacts() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let paths = ArtifactPaths::in_dir(tmp.path());
    let (texts, vectors, manifest) = sample();
    save_artifacts(&paths, &texts, &vectors, &manifest).await?;

    let bad = ArtifactPaths { table: "not a valid table name!".into(), ..paths.clone() };
    let smaller = IndexManifest { count: 2, ..manifest.clone() };
    let replacement = vec!["new 0".to_string(), "new 1".to_string()];
    assert!(save_artifacts(&bad, &replacement, &vectors[..2], &smaller).await.is_err());

    let corpus = load_artifacts(&paths).await?;
    assert_eq!(corpus.len(), 5);
    assert_eq!(corpus.chunk(0).unwrap().text, "chunk number 0");
    assert_eq!(IndexManifest::read(&paths.manifest)?, manifest);
    Ok(())
}

#[tokio::test]
async fn chunk_file_out_of_sync_with_index_is_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let paths = ArtifactPaths::in_dir(tmp.path());
    let (texts, vectors, manifest) = sample();
    save_artifacts(&paths, &texts, &vectors, &manifest).await?;
    std::fs::write(&paths.chunks, serde_json::to_string(&texts[..3])?)?;

    let err = load_artifacts(&paths).await.err().unwrap();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MisalignedArtifacts(_))), "{err:#}");
    Ok(())
}

#[tokio::test]
async fn manifest_dimension_must_match_the_table() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let paths = ArtifactPaths::in_dir(tmp.path());
    let (texts, vectors, manifest) = sample();
    save_artifacts(&paths, &texts, &vectors, &manifest).await?;
    IndexManifest { dim: 4, ..manifest }.write(&paths.manifest)?;

    let err = load_artifacts(&paths).await.err().unwrap();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::MisalignedArtifacts(_))), "{err:#}");
    Ok(())
}

#[tokio::test]
async fn missing_artifacts_are_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let err = load_artifacts(&ArtifactPaths::in_dir(tmp.path())).await.err().unwrap();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))), "{err:#}");
}

#[tokio::test]
async fn inconsistent_input_is_not_written() {
    let tmp = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(tmp.path());
    let (texts, vectors, manifest) = sample();
    assert!(save_artifacts(&paths, &texts, &vectors[..4], &manifest).await.is_err());
    assert!(!paths.chunks.exists());
}
