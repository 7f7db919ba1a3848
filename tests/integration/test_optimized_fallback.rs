//! Test: optimized and brute-force search agree, and a broken optimized
//! index degrades to brute force without surfacing errors.

use anyhow::Result;
use docvec::config::OptimizedIndexKind;
use docvec::vector::{FLAT_INDEX_FILE, FlatInnerProduct, create_backend};
use docvec::{EmbeddingGenerator, Metadata, TfIdfSvdGenerator, VectorIndex};
use std::path::Path;
use tempfile::TempDir;

const CORPUS: &[&str] = &[
    "rust ownership and borrowing rules",
    "the borrow checker rejects dangling references",
    "async runtimes schedule futures on worker threads",
    "tokio provides an async runtime for rust",
    "vector databases store embeddings for similarity search",
    "cosine similarity compares the angle between vectors",
    "inverted indexes power keyword search engines",
    "embeddings map text into a dense vector space",
    "threads share memory through locks and channels",
    "search engines rank documents by relevance",
];

fn build_index(dir: &Path) -> Result<(VectorIndex, Vec<Vec<f32>>)> {
    let generator = TfIdfSvdGenerator::default();
    let embeddings = generator.generate_embeddings(CORPUS)?;

    let mut index = VectorIndex::new(dir);
    for (i, embedding) in embeddings.iter().enumerate() {
        index.add(i.to_string(), embedding.clone(), Metadata::new());
    }
    index.save()?;
    Ok((index, embeddings))
}

fn ids(results: &[docvec::SearchResult]) -> Vec<String> {
    results.iter().map(|r| r.id.clone()).collect()
}

#[test]
fn test_optimized_and_brute_force_agree() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (_, embeddings) = build_index(temp_dir.path())?;
    assert!(temp_dir.path().join(FLAT_INDEX_FILE).exists());

    // Fresh instance: the optimized index is read back from disk
    let index = VectorIndex::new(temp_dir.path());
    for query in &embeddings {
        for k in [1, 3, CORPUS.len()] {
            let optimized = index.search(query, k);
            let exact = index.search_brute_force(query, k);
            assert_eq!(ids(&optimized), ids(&exact));
            for (a, b) in optimized.iter().zip(&exact) {
                assert!((a.score - b.score).abs() < 1e-5);
            }
            assert!(optimized.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }
    Ok(())
}

#[test]
fn test_corrupt_optimized_index_falls_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (_, embeddings) = build_index(temp_dir.path())?;

    let artifact = temp_dir.path().join(FLAT_INDEX_FILE);
    let mut bytes = std::fs::read(&artifact)?;
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    std::fs::write(&artifact, bytes)?;

    let index = VectorIndex::new(temp_dir.path());
    let results = index.search(&embeddings[0], 3);
    assert_eq!(ids(&results), ids(&index.search_brute_force(&embeddings[0], 3)));
    assert_eq!(results[0].id, "0");
    Ok(())
}

#[test]
fn test_garbage_optimized_index_falls_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (_, embeddings) = build_index(temp_dir.path())?;
    std::fs::write(temp_dir.path().join(FLAT_INDEX_FILE), b"not an index")?;

    let index = VectorIndex::new(temp_dir.path());
    let results = index.search(&embeddings[4], 2);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "4");
    Ok(())
}

#[test]
fn test_missing_optimized_index_falls_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (_, embeddings) = build_index(temp_dir.path())?;
    std::fs::remove_file(temp_dir.path().join(FLAT_INDEX_FILE))?;

    let index = VectorIndex::new(temp_dir.path());
    assert_eq!(index.search(&embeddings[7], 1)[0].id, "7");
    Ok(())
}

#[test]
fn test_disabled_backend_matches_flat_backend() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (_, embeddings) = build_index(temp_dir.path())?;

    let flat = VectorIndex::with_backend(temp_dir.path(), Some(Box::new(FlatInnerProduct)));
    let plain = VectorIndex::with_backend(
        temp_dir.path(),
        create_backend(OptimizedIndexKind::Disabled),
    );
    assert_eq!(plain.backend_name(), None);

    for query in &embeddings {
        assert_eq!(ids(&flat.search(query, 4)), ids(&plain.search(query, 4)));
    }
    Ok(())
}
