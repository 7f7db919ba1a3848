//! Test: settings file drives backend selection for both halves of the pipeline

use anyhow::Result;
use docvec::config::{EmbeddingBackendKind, OptimizedIndexKind};
use docvec::{EmbeddingBackend, Settings, VectorIndex, create_generator};
use tempfile::TempDir;

#[test]
fn test_settings_file_selects_backends() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let index_dir = temp_dir.path().join("idx");
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[index]
index_dir = "{}"
optimized_index = "disabled"

[embedding]
backend = "statistical"
max_components = 2
"#,
            index_dir.display().to_string().replace('\\', "/")
        ),
    )?;

    let settings = Settings::load_from(&config_path)?;
    assert_eq!(settings.index.optimized_index, OptimizedIndexKind::Disabled);
    assert_eq!(settings.embedding.backend, EmbeddingBackendKind::Statistical);

    let generator = create_generator(&settings.embedding);
    assert_eq!(generator.backend(), EmbeddingBackend::Statistical);
    let embeddings = generator.generate_embeddings(&["one two", "two three", "three four", "four five"])?;
    assert!(embeddings.iter().all(|e| e.len() == 2));

    let mut index = VectorIndex::from_settings(&settings.index);
    assert_eq!(index.backend_name(), None);
    for (i, embedding) in embeddings.into_iter().enumerate() {
        index.add(i.to_string(), embedding, Default::default());
    }
    index.save()?;
    assert!(index_dir.join("vectors.npy").exists());
    assert!(!index_dir.join("flat_ip.idx").exists());
    Ok(())
}
