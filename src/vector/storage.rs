//! On-disk layout of a vector index directory.
//!
//! An index directory holds two mandatory artifacts and one optional one:
//! - `vectors.npy`: dense row-major `f32` matrix in NumPy `.npy` v1.0 format,
//!   shape `(N, D)`; `(0, 0)` for an empty index
//! - `meta.json`: `{"ids": [...], "metadatas": [...]}` aligned to the matrix rows
//! - the optimized index artifact, owned by the configured backend
//!
//! Every save is a full rewrite. Files are written to a temporary file in
//! the same directory and renamed into place, so a crashed save never
//! leaves a half-written artifact behind. The matrix is read back through
//! a memory map.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use memmap2::Mmap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::vector::types::{Metadata, VectorError, VectorResult};

/// File name of the raw vector matrix.
pub const VECTORS_FILE: &str = "vectors.npy";

/// File name of the ids/metadata sidecar.
pub const META_FILE: &str = "meta.json";

/// Magic prefix of every `.npy` file.
const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Magic + version + u16 header length.
const NPY_PREAMBLE: usize = 10;

/// Header block alignment required by the `.npy` format.
const NPY_ALIGNMENT: usize = 64;

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// The three parallel sequences making up an index.
///
/// Row `i` of `vectors`, `ids[i]` and `metadatas[i]` describe the same entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexState {
    pub ids: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub metadatas: Vec<Metadata>,
}

impl IndexState {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dimension of the stored vectors, 0 when empty.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectors.first().map_or(0, Vec::len)
    }
}

/// Sidecar record persisted as `meta.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MetaRecord {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    metadatas: Vec<Metadata>,
}

/// Reads and writes the artifacts of one index directory.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStorage {
    dir: PathBuf,
}

impl IndexStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    /// Persists the full state, replacing whatever was there before.
    pub fn save(&self, state: &IndexState) -> VectorResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        write_npy(&self.vectors_path(), &state.vectors)?;

        let record = MetaRecord {
            ids: state.ids.clone(),
            metadatas: state.metadatas.clone(),
        };
        write_atomic(&self.meta_path(), |writer| {
            serde_json::to_writer(&mut *writer, &record).map_err(io::Error::other)
        })?;

        debug!(
            dir = %self.dir.display(),
            entries = state.len(),
            dimension = state.dimension(),
            "wrote vector matrix and metadata"
        );
        Ok(())
    }

    /// Loads persisted state.
    ///
    /// Missing artifacts are not an error: a directory without a prior save
    /// loads as an empty state.
    pub fn load(&self) -> VectorResult<IndexState> {
        let vectors_path = self.vectors_path();
        let meta_path = self.meta_path();

        let vectors = if vectors_path.exists() {
            read_npy(&vectors_path)?
        } else {
            Vec::new()
        };

        let record: MetaRecord = if meta_path.exists() {
            let file = File::open(&meta_path)?;
            serde_json::from_reader(io::BufReader::new(file))?
        } else {
            MetaRecord::default()
        };

        if record.ids.len() != vectors.len() || record.metadatas.len() != vectors.len() {
            return Err(VectorError::RowCountMismatch {
                vectors: vectors.len(),
                ids: record.ids.len(),
                metadatas: record.metadatas.len(),
            });
        }

        Ok(IndexState {
            ids: record.ids,
            vectors,
            metadatas: record.metadatas,
        })
    }
}

/// Writes a file atomically through a temporary sibling file.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> VectorResult<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> io::Result<()>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Writes `rows` as a 2-D little-endian `f32` `.npy` matrix.
pub fn write_npy(path: &Path, rows: &[Vec<f32>]) -> VectorResult<()> {
    let cols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|row| row.len() != cols) {
        return Err(VectorError::DimensionMismatch {
            expected: cols,
            actual: bad.len(),
        });
    }

    let header = npy_header(rows.len(), cols);
    write_atomic(path, |writer| {
        writer.write_all(NPY_MAGIC)?;
        writer.write_all(&[1, 0])?;
        writer.write_all(&(header.len() as u16).to_le_bytes())?;
        writer.write_all(header.as_bytes())?;
        for row in rows {
            for &value in row {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        Ok(())
    })
}

/// Builds the padded header dictionary for a C-ordered `<f4` matrix.
fn npy_header(rows: usize, cols: usize) -> String {
    let mut header =
        format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({rows}, {cols}), }}");
    let unpadded = NPY_PREAMBLE + header.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    header.extend(std::iter::repeat_n(' ', padding));
    header.push('\n');
    header
}

/// Reads a 2-D little-endian `f32` `.npy` matrix into rows.
pub fn read_npy(path: &Path) -> VectorResult<Vec<Vec<f32>>> {
    let invalid = |reason: &str| VectorError::InvalidFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let file = File::open(path)?;
    if file.metadata()?.len() < NPY_PREAMBLE as u64 {
        return Err(invalid("file too small to contain an .npy header"));
    }
    let mmap = unsafe { Mmap::map(&file)? };

    if &mmap[0..6] != NPY_MAGIC {
        return Err(invalid("missing .npy magic bytes"));
    }
    if mmap[6] != 1 {
        return Err(invalid("unsupported .npy major version"));
    }
    let header_len = u16::from_le_bytes([mmap[8], mmap[9]]) as usize;
    let data_offset = NPY_PREAMBLE + header_len;
    if mmap.len() < data_offset {
        return Err(invalid("truncated .npy header"));
    }
    let header = std::str::from_utf8(&mmap[NPY_PREAMBLE..data_offset])
        .map_err(|_| invalid("header is not valid UTF-8"))?;

    if !header.contains("'descr': '<f4'") {
        return Err(invalid("expected little-endian float32 ('<f4') data"));
    }
    if !header.contains("'fortran_order': False") {
        return Err(invalid("expected C-ordered data"));
    }
    let (rows, cols) = parse_shape(header).ok_or_else(|| invalid("expected a 2-D shape"))?;

    let payload = &mmap[data_offset..];
    let expected = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(BYTES_PER_F32))
        .ok_or_else(|| invalid("shape overflows"))?;
    if payload.len() != expected {
        return Err(invalid(&format!(
            "payload is {} bytes, shape ({rows}, {cols}) needs {expected}",
            payload.len()
        )));
    }

    let values: Vec<f32> = payload
        .chunks_exact(BYTES_PER_F32)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    if cols == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(values.chunks_exact(cols).map(<[f32]>::to_vec).collect())
}

static SHAPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'shape':\s*\(\s*(\d+)\s*,\s*(\d+)\s*,?\s*\)").expect("Invalid shape regex")
});

fn parse_shape(header: &str) -> Option<(usize, usize)> {
    let caps = SHAPE_PATTERN.captures(header)?;
    let rows = caps.get(1)?.as_str().parse().ok()?;
    let cols = caps.get(2)?.as_str().parse().ok()?;
    Some((rows, cols))
}
