//! On-disk layout of a flat index.
//!
//! Two files per index:
//! - vectors: raw little-endian `f32`, `dimension` values per record, no
//!   header; record count = file size / record width
//! - metadata: JSON sidecar listing one chunk record per vector, same order
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use docqa_core::config::IndexSettings;
use docqa_core::types::Chunk;

pub const BYTES_PER_F32: usize = 4;

pub fn record_width(dimension: usize) -> usize { dimension * BYTES_PER_F32 }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFiles {
    pub vectors: PathBuf,
    pub metadata: PathBuf,
}

impl IndexFiles {
    pub fn new(vectors: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self { vectors: vectors.into(), metadata: metadata.into() }
    }

    /// Default file names inside one directory.
    pub fn in_dir(dir: &Path) -> Self { Self::new(dir.join("vectors.bin"), dir.join("chunks.json")) }

    pub fn from_settings(settings: &IndexSettings, base: &Path) -> Self {
        Self::new(settings.vectors_path(base), settings.metadata_path(base))
    }
}

/// Sidecar document. `records[i]` describes vector record `i`.
#[derive(Debug, Deserialize)]
pub(crate) struct Sidecar {
    pub dimension: usize,
    pub records: Vec<Chunk>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SidecarRef<'a> {
    pub dimension: usize,
    pub records: &'a [Chunk],
}
