//! Configuration module for the embedding and vector index pipeline.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCVEC_` and use double underscores
//! to separate nested levels:
//! - `DOCVEC_INDEX__INDEX_DIR=/tmp/index` sets `index.index_dir`
//! - `DOCVEC_EMBEDDING__BACKEND=statistical` sets `embedding.backend`
//! - `DOCVEC_EMBEDDING__MAX_FEATURES=500` sets `embedding.max_features`
//! - `DOCVEC_LOGGING__LEVEL=debug` sets `logging.level`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::DocvecResult;

/// Directory holding the workspace configuration.
const CONFIG_DIR: &str = ".docvec";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "DOCVEC_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Vector index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Embedding generation settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which optimized similarity structure `save` builds alongside the raw vectors.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizedIndexKind {
    /// Exact inner-product index over normalized rows
    #[default]
    Flat,
    /// Always search by brute force
    Disabled,
}

/// Which embedding strategy the generator factory should try.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    /// Pretrained encoder, falling back to the statistical variant if it fails to load
    #[default]
    Encoder,
    /// Deterministic TF-IDF + truncated SVD, no model download
    Statistical,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexConfig {
    /// Directory holding the persisted index
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Optimized index built on save
    #[serde(default)]
    pub optimized_index: OptimizedIndexKind,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Preferred backend
    #[serde(default)]
    pub backend: EmbeddingBackendKind,

    /// Pretrained model name for the encoder backend
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded models are cached (defaults to the user cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Vocabulary cap for the statistical backend
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Upper bound on the number of SVD components
    #[serde(default = "default_max_components")]
    pub max_components: usize,

    /// Seed for the randomized SVD
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// Power iterations of the randomized range finder
    #[serde(default = "default_power_iterations")]
    pub power_iterations: usize,

    /// Extra sampled columns beyond the requested components
    #[serde(default = "default_oversamples")]
    pub oversamples: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Maximum level: error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target (module path) in log lines
    #[serde(default = "default_false")]
    pub with_target: bool,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_dir() -> PathBuf {
    PathBuf::from(".docvec/index")
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_max_features() -> usize {
    2000
}
fn default_max_components() -> usize {
    128
}
fn default_random_seed() -> u64 {
    42
}
fn default_power_iterations() -> usize {
    5
}
fn default_oversamples() -> usize {
    10
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            optimized_index: OptimizedIndexKind::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackendKind::default(),
            model: default_embedding_model(),
            cache_dir: None,
            max_features: default_max_features(),
            max_components: default_max_components(),
            random_seed: default_random_seed(),
            power_iterations: default_power_iterations(),
            oversamples: default_oversamples(),
        }
    }
}

impl EmbeddingConfig {
    /// Statistical backend with default parameters.
    #[must_use]
    pub fn statistical() -> Self {
        Self {
            backend: EmbeddingBackendKind::Statistical,
            ..Self::default()
        }
    }

    /// Resolved model cache directory.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
                .join("docvec")
                .join("models")
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> DocvecResult<Self> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and environment overrides still apply.
    pub fn load_from(path: impl AsRef<Path>) -> DocvecResult<Self> {
        let settings = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting, single underscores stay in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)?;
        Ok(settings)
    }

    /// Find the workspace config by looking for a .docvec directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index.index_dir, PathBuf::from(".docvec/index"));
        assert_eq!(settings.index.optimized_index, OptimizedIndexKind::Flat);
        assert_eq!(settings.embedding.backend, EmbeddingBackendKind::Encoder);
        assert_eq!(settings.embedding.max_features, 2000);
        assert_eq!(settings.embedding.max_components, 128);
        assert_eq!(settings.embedding.random_seed, 42);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[index]
index_dir = "/var/lib/docvec"
optimized_index = "disabled"

[embedding]
backend = "statistical"
max_features = 500
max_components = 32

[logging]
level = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.index.index_dir, PathBuf::from("/var/lib/docvec"));
        assert_eq!(settings.index.optimized_index, OptimizedIndexKind::Disabled);
        assert_eq!(settings.embedding.backend, EmbeddingBackendKind::Statistical);
        assert_eq!(settings.embedding.max_features, 500);
        assert_eq!(settings.embedding.max_components, 32);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        // Only specify a few settings
        let toml_content = r#"
[embedding]
oversamples = 4
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified values
        assert_eq!(settings.embedding.oversamples, 4);

        // Default values should still be present
        assert_eq!(settings.version, 1);
        assert_eq!(settings.embedding.model, "AllMiniLML6V2");
        assert_eq!(settings.embedding.power_iterations, 5);
        assert_eq!(settings.index.optimized_index, OptimizedIndexKind::Flat);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.embedding.max_components, 128);
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[logging]\nwith_target = false\n").unwrap();

        // Other tests either leave with_target alone or set it to true
        unsafe {
            std::env::set_var("DOCVEC_LOGGING__WITH_TARGET", "true");
        }
        let settings = Settings::load_from(&config_path).unwrap();
        unsafe {
            std::env::remove_var("DOCVEC_LOGGING__WITH_TARGET");
        }

        assert!(settings.logging.with_target);
    }

    #[test]
    fn test_invalid_value_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[index]\noptimized_index = \"hnsw\"\n").unwrap();

        let err = Settings::load_from(&config_path).unwrap_err();
        assert_eq!(err.status_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.embedding.backend = EmbeddingBackendKind::Statistical;
        settings.embedding.cache_dir = Some(temp_dir.path().join("models"));
        settings.logging.with_target = true;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_models_dir_prefers_configured_cache() {
        let mut config = EmbeddingConfig::statistical();
        assert_eq!(config.backend, EmbeddingBackendKind::Statistical);
        assert!(config.models_dir().ends_with("models"));

        config.cache_dir = Some(PathBuf::from("/tmp/docvec-models"));
        assert_eq!(config.models_dir(), PathBuf::from("/tmp/docvec-models"));
    }
}
