//! Test: save, reload in a fresh instance, search.

use anyhow::Result;
use docvec::vector::{META_FILE, VECTORS_FILE, read_npy};
use docvec::{Metadata, SearchResult, VectorIndex};
use serde_json::json;
use tempfile::TempDir;

fn meta(title: &str) -> Metadata {
    let mut map = Metadata::new();
    map.insert("title".to_string(), json!(title));
    map
}

fn scores(results: &[SearchResult]) -> Vec<(String, f32)> {
    results.iter().map(|r| (r.id.clone(), r.score)).collect()
}

#[test]
fn test_fresh_instance_lazily_reloads() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let query = [0.9, 0.1, 0.0, 0.2];

    let mut index = VectorIndex::new(temp_dir.path());
    index.add("alpha", vec![1.0, 0.0, 0.0, 0.0], meta("Alpha"));
    index.add("beta", vec![0.0, 1.0, 0.0, 0.0], meta("Beta"));
    index.add("gamma", vec![0.5, 0.5, 0.5, 0.5], meta("Gamma"));
    let before = index.search(&query, 3);
    index.save()?;

    let fresh = VectorIndex::new(temp_dir.path());
    assert!(fresh.is_empty());
    let after = fresh.search(&query, 3);

    assert_eq!(after.len(), 3);
    for ((id_a, score_a), (id_b, score_b)) in scores(&before).iter().zip(scores(&after).iter()) {
        assert_eq!(id_a, id_b);
        assert!((score_a - score_b).abs() < 1e-6);
    }
    assert_eq!(after[0].id, "alpha");
    assert_eq!(after[0].metadata["title"], "Alpha");
    assert_eq!(fresh.len(), 3);
    assert_eq!(fresh.ids(), vec!["alpha", "beta", "gamma"]);
    Ok(())
}

#[test]
fn test_reloaded_state_matches_exactly() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let vectors = vec![vec![0.1, -0.2, 0.3], vec![1e-7, 42.0, -0.0]];

    let mut index = VectorIndex::new(temp_dir.path());
    for (i, vector) in vectors.iter().enumerate() {
        index.add(format!("doc-{i}"), vector.clone(), meta(&format!("Doc {i}")));
    }
    index.save()?;

    let stored = read_npy(&temp_dir.path().join(VECTORS_FILE))?;
    assert_eq!(stored, vectors);

    let meta_json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(temp_dir.path().join(META_FILE))?)?;
    assert_eq!(meta_json["ids"], json!(["doc-0", "doc-1"]));
    assert_eq!(meta_json["metadatas"][1]["title"], "Doc 1");
    Ok(())
}

#[test]
fn test_empty_save_writes_zero_shape() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let index = VectorIndex::new(temp_dir.path());
    index.save()?;

    let bytes = std::fs::read(temp_dir.path().join(VECTORS_FILE))?;
    let header = String::from_utf8_lossy(&bytes);
    assert!(header.contains("'shape': (0, 0)"));
    assert!(read_npy(&temp_dir.path().join(VECTORS_FILE))?.is_empty());

    let fresh = VectorIndex::new(temp_dir.path());
    assert!(fresh.search(&[1.0, 0.0], 5).is_empty());
    Ok(())
}

#[test]
fn test_search_without_any_persisted_state() {
    let temp_dir = TempDir::new().unwrap();
    let index = VectorIndex::new(temp_dir.path().join("never-saved"));
    assert!(index.search(&[1.0, 2.0, 3.0], 10).is_empty());
    assert!(index.search_brute_force(&[1.0, 2.0, 3.0], 10).is_empty());
}

#[test]
fn test_save_is_idempotent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut index = VectorIndex::new(temp_dir.path());
    index.add("a", vec![1.0, 2.0], meta("A"));
    index.add("b", vec![2.0, 1.0], meta("B"));

    index.save()?;
    let first_vectors = std::fs::read(temp_dir.path().join(VECTORS_FILE))?;
    let first_meta = std::fs::read(temp_dir.path().join(META_FILE))?;

    index.save()?;
    assert_eq!(std::fs::read(temp_dir.path().join(VECTORS_FILE))?, first_vectors);
    assert_eq!(std::fs::read(temp_dir.path().join(META_FILE))?, first_meta);
    Ok(())
}

#[test]
fn test_misaligned_artifacts_are_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut index = VectorIndex::new(temp_dir.path());
    index.add("a", vec![1.0, 0.0], meta("A"));
    index.add("b", vec![0.0, 1.0], meta("B"));
    index.save()?;

    std::fs::write(
        temp_dir.path().join(META_FILE),
        r#"{"ids": ["a"], "metadatas": [{}]}"#,
    )?;

    let fresh = VectorIndex::new(temp_dir.path());
    let err = fresh.load().unwrap_err();
    assert!(matches!(
        err,
        docvec::VectorError::RowCountMismatch { vectors: 2, .. }
    ));
    // search never fails; it reports nothing instead
    assert!(fresh.search(&[1.0, 0.0], 2).is_empty());
    Ok(())
}
