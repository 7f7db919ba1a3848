//! Exact inner-product index over unit-length rows.
//!
//! Rows are normalized once at build time and stored contiguously, so a
//! query costs one dot product per row and no per-row normalization.
//! Large indexes are scanned in parallel.
//!
//! # Storage Format
//!
//! - Header (24 bytes): magic, version, row count (u64), dimension (u64)
//! - Payload: contiguous little-endian f32 rows
//! - Trailer (32 bytes): SHA-256 of the payload
//!
//! Load rejects any artifact whose trailer does not match its payload.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::vector::backend::{NeighborSearch, OptimizedBackend};
use crate::vector::similarity::{dot, normalize, top_k};
use crate::vector::storage::write_atomic;
use crate::vector::types::{VectorError, VectorResult};

/// File name of the flat index artifact.
pub const FLAT_INDEX_FILE: &str = "flat_ip.idx";

/// Current storage format version.
const FORMAT_VERSION: u32 = 1;

/// Magic bytes to identify flat index files.
const MAGIC_BYTES: &[u8; 4] = b"DVIP";

/// Size of the header in bytes.
const HEADER_SIZE: usize = 24;

/// Size of the SHA-256 trailer in bytes.
const CHECKSUM_SIZE: usize = 32;

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Below this row count a sequential scan is cheaper than spawning work.
const PARALLEL_SCAN_THRESHOLD: usize = 1024;

/// Backend producing [`FlatInnerProductIndex`] structures.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatInnerProduct;

impl OptimizedBackend for FlatInnerProduct {
    fn name(&self) -> &'static str {
        "flat-inner-product"
    }

    fn file_name(&self) -> &'static str {
        FLAT_INDEX_FILE
    }

    fn build(&self, vectors: &[Vec<f32>]) -> VectorResult<Box<dyn NeighborSearch>> {
        Ok(Box::new(FlatInnerProductIndex::build(vectors)?))
    }

    fn load(&self, path: &Path) -> VectorResult<Box<dyn NeighborSearch>> {
        Ok(Box::new(FlatInnerProductIndex::load(path)?))
    }
}

/// Contiguous matrix of normalized rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatInnerProductIndex {
    rows: usize,
    dimension: usize,
    data: Vec<f32>,
}

impl FlatInnerProductIndex {
    /// Normalizes and packs `vectors` into a flat index.
    pub fn build(vectors: &[Vec<f32>]) -> VectorResult<Self> {
        let dimension = vectors.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend(normalize(vector));
        }

        Ok(Self {
            rows: vectors.len(),
            dimension,
            data,
        })
    }

    /// Reads and verifies a flat index artifact.
    pub fn load(path: &Path) -> VectorResult<Self> {
        let invalid = |reason: String| VectorError::InvalidFormat {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path)?;
        if (file.metadata()?.len() as usize) < HEADER_SIZE + CHECKSUM_SIZE {
            return Err(invalid("file too small to contain header".to_string()));
        }
        let mmap = unsafe { Mmap::map(&file)? };

        if &mmap[0..4] != MAGIC_BYTES {
            return Err(invalid("invalid magic bytes".to_string()));
        }
        let version = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]);
        if version != FORMAT_VERSION {
            return Err(invalid(format!(
                "unsupported version {version}, expected {FORMAT_VERSION}"
            )));
        }
        let rows = read_u64(&mmap[8..16]) as usize;
        let dimension = read_u64(&mmap[16..24]) as usize;

        let payload_len = rows
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(BYTES_PER_F32))
            .ok_or_else(|| invalid("shape overflows".to_string()))?;
        if mmap.len() != HEADER_SIZE + payload_len + CHECKSUM_SIZE {
            return Err(invalid(format!(
                "expected {} bytes for {rows} rows of dimension {dimension}, found {}",
                HEADER_SIZE + payload_len + CHECKSUM_SIZE,
                mmap.len()
            )));
        }

        let payload = &mmap[HEADER_SIZE..HEADER_SIZE + payload_len];
        let checksum = &mmap[HEADER_SIZE + payload_len..];
        if Sha256::digest(payload).as_slice() != checksum {
            return Err(VectorError::ChecksumMismatch {
                path: path.to_path_buf(),
            });
        }

        let data = payload
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self {
            rows,
            dimension,
            data,
        })
    }

    /// Iterates the stored normalized rows.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact(0) panics, and a zero-dimension index has nothing to yield
        let width = self.dimension.max(1);
        self.data.chunks_exact(width).take(self.rows)
    }
}

impl NeighborSearch for FlatInnerProductIndex {
    fn len(&self) -> usize {
        self.rows
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || self.rows == 0 {
            return Vec::new();
        }
        if self.dimension == 0 {
            // Empty rows have no direction and score zero against any query
            return top_k((0..self.rows).map(|row| (row, 0.0)).collect(), k);
        }

        let scored: Vec<(usize, f32)> = if self.rows >= PARALLEL_SCAN_THRESHOLD {
            self.data
                .par_chunks_exact(self.dimension)
                .enumerate()
                .map(|(row, values)| (row, dot(values, query)))
                .collect()
        } else {
            self.rows()
                .enumerate()
                .map(|(row, values)| (row, dot(values, query)))
                .collect()
        };

        top_k(scored, k)
    }

    fn save(&self, path: &Path) -> VectorResult<()> {
        write_atomic(path, |writer| {
            writer.write_all(MAGIC_BYTES)?;
            writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
            writer.write_all(&(self.rows as u64).to_le_bytes())?;
            writer.write_all(&(self.dimension as u64).to_le_bytes())?;

            let mut hasher = Sha256::new();
            for value in &self.data {
                let bytes = value.to_le_bytes();
                hasher.update(bytes);
                writer.write_all(&bytes)?;
            }
            writer.write_all(hasher.finalize().as_slice())
        })
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
