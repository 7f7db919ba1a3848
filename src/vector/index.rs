//! Append-only vector index with an optimized search path and a brute-force fallback.
//!
//! Entries accumulate in memory through [`VectorIndex::add`] and are flushed
//! with [`VectorIndex::save`], which rewrites the whole directory. Searches
//! lazily reload persisted state when nothing is resident, prefer the
//! optimized structure when it loads and matches the resident rows, and
//! otherwise fall back to an exact scan. Failures on the optimized path are
//! logged and never reach the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::vector::backend::{NeighborSearch, OptimizedBackend, create_backend};
use crate::vector::flat::FlatInnerProduct;
use crate::vector::similarity::{dot, normalize, top_k};
use crate::vector::storage::{IndexState, IndexStorage};
use crate::vector::types::{Metadata, SearchResult, VectorResult};

/// Persisted, queryable cosine-similarity index.
///
/// # Preconditions
///
/// All vectors added to one index must share a dimension, and query vectors
/// must have that same dimension. Ids should be unique; duplicates are
/// stored as-is and returned as separate hits.
///
/// # Concurrency
///
/// `add` and `save` are meant for a single writer. Searches take `&self`,
/// so an index that is no longer being written can be queried from several
/// threads at once.
#[derive(Debug)]
pub struct VectorIndex {
    storage: IndexStorage,

    /// Optimized index strategy, `None` when only brute force is available
    backend: Option<Box<dyn OptimizedBackend>>,

    /// Resident entries
    state: RwLock<IndexState>,

    /// Optimized structure loaded from (or just written to) disk
    optimized: RwLock<Option<Arc<dyn NeighborSearch>>>,

    /// Resident state matches the directory contents
    in_sync: AtomicBool,
}

impl VectorIndex {
    /// Creates an index rooted at `dir` using the flat inner-product backend.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_backend(dir, Some(Box::new(FlatInnerProduct)))
    }

    /// Creates an index with an explicit optimized backend, or none at all.
    pub fn with_backend(dir: impl Into<PathBuf>, backend: Option<Box<dyn OptimizedBackend>>) -> Self {
        let storage = IndexStorage::new(dir);
        debug!(
            dir = %storage.dir().display(),
            backend = backend.as_ref().map_or("brute-force", |b| b.name()),
            "created vector index"
        );
        Self {
            storage,
            backend,
            state: RwLock::new(IndexState::default()),
            optimized: RwLock::new(None),
            in_sync: AtomicBool::new(false),
        }
    }

    /// Creates an index from the `[index]` configuration section.
    pub fn from_settings(config: &IndexConfig) -> Self {
        Self::with_backend(
            config.index_dir.clone(),
            create_backend(config.optimized_index),
        )
    }

    /// Directory holding the persisted artifacts.
    pub fn index_dir(&self) -> &Path {
        self.storage.dir()
    }

    /// Name of the optimized backend, if any.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Appends an entry.
    ///
    /// The vector must have the same dimension as every other entry; this
    /// is not checked here.
    pub fn add(&mut self, id: impl Into<String>, vector: Vec<f32>, metadata: Metadata) {
        let state = self.state.get_mut();
        state.ids.push(id.into());
        state.vectors.push(vector);
        state.metadatas.push(metadata);
        *self.optimized.get_mut() = None;
        *self.in_sync.get_mut() = false;
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Dimension of the resident vectors, 0 when empty.
    pub fn dimension(&self) -> usize {
        self.state.read().dimension()
    }

    /// Ids of the resident entries in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.state.read().ids.clone()
    }

    /// Writes the full resident state and, when a backend is configured and
    /// there is at least one entry, regenerates the optimized index.
    ///
    /// Only failures writing the vectors or metadata are returned; a failed
    /// optimized build is logged and leaves searches on the brute-force path.
    ///
    /// Calling `save` twice without intervening `add`s produces the same files.
    pub fn save(&self) -> VectorResult<()> {
        let state = self.state.read();
        self.storage.save(&state)?;
        self.in_sync.store(true, Ordering::Release);

        let mut optimized = self.optimized.write();
        *optimized = None;

        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let artifact = self.storage.dir().join(backend.file_name());

        if state.is_empty() {
            if artifact.exists() {
                if let Err(e) = std::fs::remove_file(&artifact) {
                    warn!(
                        path = %artifact.display(),
                        error = %e,
                        "could not remove optimized index of an emptied index"
                    );
                }
            }
            return Ok(());
        }

        let built = match backend
            .build(&state.vectors)
            .and_then(|built| built.save(&artifact).map(|()| built))
        {
            Ok(built) => built,
            Err(e) => {
                warn!(
                    backend = backend.name(),
                    error = %e,
                    "failed to build optimized index, searches will use brute force"
                );
                // A leftover artifact from an earlier save would be stale
                let _ = std::fs::remove_file(&artifact);
                return Ok(());
            }
        };
        info!(
            dir = %self.storage.dir().display(),
            backend = backend.name(),
            entries = built.len(),
            dimension = built.dimension(),
            "saved vector index"
        );
        *optimized = Some(Arc::from(built));
        Ok(())
    }

    /// Replaces resident state with what is persisted on disk.
    ///
    /// A directory that was never saved loads as an empty index.
    pub fn load(&self) -> VectorResult<()> {
        let loaded = self.storage.load()?;
        debug!(
            dir = %self.storage.dir().display(),
            entries = loaded.len(),
            "loaded vector index"
        );
        let mut state = self.state.write();
        *state = loaded;
        *self.optimized.write() = None;
        self.in_sync.store(true, Ordering::Release);
        Ok(())
    }

    /// Returns up to `k` entries ranked by descending cosine similarity.
    ///
    /// Never fails: a missing or unreadable index yields an empty result,
    /// and problems with the optimized index fall back to brute force.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchResult> {
        if k == 0 {
            return Vec::new();
        }
        self.ensure_loaded();

        let state = self.state.read();
        if state.is_empty() {
            return Vec::new();
        }

        let query = normalize(query);
        if let Some(optimized) = self.optimized_for(&state) {
            let hits = optimized.search(&query, k);
            return to_results(&state, hits);
        }

        to_results(&state, brute_force(&state.vectors, &query, k))
    }

    /// Exact search over every resident vector, ignoring any optimized index.
    ///
    /// This is the reference the optimized path must agree with.
    pub fn search_brute_force(&self, query: &[f32], k: usize) -> Vec<SearchResult> {
        if k == 0 {
            return Vec::new();
        }
        self.ensure_loaded();

        let state = self.state.read();
        let query = normalize(query);
        to_results(&state, brute_force(&state.vectors, &query, k))
    }

    /// Reloads persisted state when nothing is resident.
    fn ensure_loaded(&self) {
        if !self.state.read().is_empty() {
            return;
        }

        let mut state = self.state.write();
        // Another reader may have loaded while we waited for the lock
        if !state.is_empty() {
            return;
        }
        match self.storage.load() {
            Ok(loaded) => {
                if !loaded.is_empty() {
                    debug!(
                        dir = %self.storage.dir().display(),
                        entries = loaded.len(),
                        "lazily reloaded vector index"
                    );
                }
                *state = loaded;
                self.in_sync.store(true, Ordering::Release);
            }
            Err(e) => warn!(
                dir = %self.storage.dir().display(),
                error = %e,
                "could not reload persisted index, searching empty state"
            ),
        }
    }

    /// Returns the optimized structure if one is available and covers exactly
    /// the resident rows.
    ///
    /// Entries added since the last save or load are never served from disk,
    /// even when the artifact happens to have the same shape.
    fn optimized_for(&self, state: &IndexState) -> Option<Arc<dyn NeighborSearch>> {
        let backend = self.backend.as_ref()?;
        if !self.in_sync.load(Ordering::Acquire) {
            debug!(
                backend = backend.name(),
                resident = state.len(),
                "resident entries are unsaved, using brute force"
            );
            return None;
        }

        let cached = self.optimized.read().clone();
        let optimized = match cached {
            Some(optimized) => optimized,
            None => {
                let artifact = self.storage.dir().join(backend.file_name());
                if !artifact.exists() {
                    return None;
                }
                match backend.load(&artifact) {
                    Ok(loaded) => {
                        let loaded: Arc<dyn NeighborSearch> = Arc::from(loaded);
                        *self.optimized.write() = Some(Arc::clone(&loaded));
                        loaded
                    }
                    Err(e) => {
                        debug!(
                            backend = backend.name(),
                            error = %e,
                            "optimized index unavailable, using brute force"
                        );
                        return None;
                    }
                }
            }
        };

        if optimized.len() != state.len() || optimized.dimension() != state.dimension() {
            debug!(
                backend = backend.name(),
                indexed = optimized.len(),
                resident = state.len(),
                "optimized index is stale, using brute force"
            );
            return None;
        }
        Some(optimized)
    }
}

/// Scores every row against a normalized query.
fn brute_force(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<(usize, f32)> {
    let scored = vectors
        .iter()
        .enumerate()
        .map(|(row, vector)| (row, dot(&normalize(vector), query)))
        .collect();
    top_k(scored, k)
}

fn to_results(state: &IndexState, hits: Vec<(usize, f32)>) -> Vec<SearchResult> {
    hits.into_iter()
        .filter(|(row, _)| *row < state.len())
        .map(|(row, score)| SearchResult {
            id: state.ids[row].clone(),
            score,
            metadata: state.metadatas[row].clone(),
        })
        .collect()
}
