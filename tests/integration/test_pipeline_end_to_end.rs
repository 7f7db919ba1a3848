//! Test: documents -> generator -> index -> save -> search in a new process-like instance.

use anyhow::Result;
use docvec::config::{EmbeddingConfig, IndexConfig};
use docvec::{
    DocumentRecord, EmbeddingBackend, VectorIndex, create_generator, index_documents, search_text,
};
use tempfile::TempDir;

fn records() -> Vec<DocumentRecord> {
    [
        ("notes/cats.txt", "Cats sleep most of the day and hunt at night."),
        ("notes/dogs.txt", "Dogs enjoy long walks and playing fetch in the park."),
        ("notes/cats-2.txt", "Cats sleep most of the day and hunt at night."),
        ("notes/fish.txt", "Goldfish live in bowls and need clean water."),
        ("notes/birds.txt", "Parrots can learn to mimic human speech."),
    ]
    .into_iter()
    .map(|(source, text)| DocumentRecord::new(Some(source.to_string()), text, text))
    .collect()
}

#[test]
fn test_statistical_pipeline_end_to_end() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let index_config = IndexConfig {
        index_dir: temp_dir.path().join("index"),
        ..IndexConfig::default()
    };

    let generator = create_generator(&EmbeddingConfig::statistical());
    assert_eq!(generator.backend(), EmbeddingBackend::Statistical);

    let mut index = VectorIndex::from_settings(&index_config);
    let written = index_documents(&records(), generator.as_ref(), &mut index)?;
    assert_eq!(written, 5);
    assert_eq!(generator.dimension(), Some(4));

    let reloaded = VectorIndex::from_settings(&index_config);
    let results = search_text(
        "Cats sleep most of the day and hunt at night.",
        generator.as_ref(),
        &reloaded,
        3,
    )?;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "0");
    assert_eq!(results[1].id, "2");
    assert_eq!(results[0].score, results[1].score);
    assert!(results[2].score < results[1].score);
    assert_eq!(results[1].metadata["source"], "notes/cats-2.txt");
    Ok(())
}

#[test]
fn test_empty_document_set() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let generator = create_generator(&EmbeddingConfig::statistical());
    let mut index = VectorIndex::new(temp_dir.path());

    assert_eq!(index_documents(&[], generator.as_ref(), &mut index)?, 0);
    assert!(VectorIndex::new(temp_dir.path()).search(&[1.0], 3).is_empty());
    Ok(())
}
