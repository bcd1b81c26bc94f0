//! Snapshot persistence with temp-file-then-rename commits.
//!
//! Vectors are committed first and the sidecar last. Loading requires the
//! two files to agree exactly; the extra vector tail an interrupted save can
//! leave behind is only removed by an explicit `repair_snapshot`.
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use docqa_core::types::Chunk;
use docqa_core::{Error, Result};
use tempfile::NamedTempFile;

use crate::schema::{record_width, IndexFiles, Sidecar, SidecarRef, BYTES_PER_F32};

/// Flat vector array plus parallel chunk metadata. Position `i` owns
/// `vectors[i * dimension..(i + 1) * dimension]` and `chunks[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    pub(crate) dimension: usize,
    pub(crate) vectors: Vec<f32>,
    pub(crate) chunks: Vec<Chunk>,
}

impl IndexSnapshot {
    pub fn empty(dimension: usize) -> Self { Self { dimension, vectors: Vec::new(), chunks: Vec::new() } }

    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
    pub fn dimension(&self) -> usize { self.dimension }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    pub fn vector(&self, position: usize) -> &[f32] {
        &self.vectors[position * self.dimension..(position + 1) * self.dimension]
    }

    pub(crate) fn push(&mut self, vector: &[f32], chunk: Chunk) {
        debug_assert_eq!(vector.len(), self.dimension);
        self.vectors.extend_from_slice(vector);
        self.chunks.push(chunk);
    }
}

/// Load both files. Absent files mean an empty index; any disagreement
/// between them is `IndexCorrupt`.
pub fn read_snapshot(files: &IndexFiles, dimension: usize) -> Result<IndexSnapshot> {
    let Some((sidecar, raw_vecs)) = read_files(files, dimension)? else {
        tracing::info!(vectors = %files.vectors.display(), metadata = %files.metadata.display(), "index files absent; starting empty");
        return Ok(IndexSnapshot::empty(dimension));
    };
    let stored = stored_records(files, &raw_vecs, dimension)?;
    let committed = sidecar.records.len();
    if stored != committed {
        return Err(Error::IndexCorrupt(format!("{stored} vectors but {committed} metadata records")));
    }

    let vectors = raw_vecs
        .chunks_exact(BYTES_PER_F32)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    tracing::info!(records = committed, dimension, "index loaded");
    Ok(IndexSnapshot { dimension, vectors, chunks: sidecar.records })
}

/// Cut vector records past the last sidecar entry, the state an interrupted
/// save leaves behind. Returns how many records were dropped. A vector file
/// shorter than the sidecar cannot be repaired.
pub fn repair_snapshot(files: &IndexFiles, dimension: usize) -> Result<usize> {
    let Some((sidecar, raw_vecs)) = read_files(files, dimension)? else { return Ok(0) };
    let stored = stored_records(files, &raw_vecs, dimension)?;
    let committed = sidecar.records.len();
    if stored < committed {
        return Err(Error::IndexCorrupt(format!("{stored} vectors but {committed} metadata records")));
    }
    let dropped = stored - committed;
    if dropped > 0 {
        let keep = &raw_vecs[..committed * record_width(dimension)];
        write_atomic(&files.vectors, |w| w.write_all(keep))?;
        tracing::warn!(dropped, committed, vectors = %files.vectors.display(), "dropped uncommitted vector records");
    }
    Ok(dropped)
}

fn read_files(files: &IndexFiles, dimension: usize) -> Result<Option<(Sidecar, Vec<u8>)>> {
    if !files.vectors.exists() || !files.metadata.exists() { return Ok(None); }

    let raw_meta = fs::read(&files.metadata).map_err(|source| Error::IndexRead { path: files.metadata.clone(), source })?;
    let sidecar: Sidecar = serde_json::from_slice(&raw_meta)
        .map_err(|e| Error::IndexCorrupt(format!("{}: {}", files.metadata.display(), e)))?;
    if sidecar.dimension != dimension {
        return Err(Error::IndexCorrupt(format!(
            "index was built with dimension {}, embedder produces {}",
            sidecar.dimension, dimension
        )));
    }
    let raw_vecs = fs::read(&files.vectors).map_err(|source| Error::IndexRead { path: files.vectors.clone(), source })?;
    Ok(Some((sidecar, raw_vecs)))
}

fn stored_records(files: &IndexFiles, raw_vecs: &[u8], dimension: usize) -> Result<usize> {
    let width = record_width(dimension);
    if width == 0 { return Err(Error::InvalidConfig("index dimension must be positive".into())); }
    if raw_vecs.len() % width != 0 {
        return Err(Error::IndexCorrupt(format!(
            "{} is {} bytes, not a multiple of the {}-byte record width",
            files.vectors.display(), raw_vecs.len(), width
        )));
    }
    Ok(raw_vecs.len() / width)
}

pub fn write_snapshot(files: &IndexFiles, snapshot: &IndexSnapshot) -> Result<()> {
    write_atomic(&files.vectors, |w| {
        for x in &snapshot.vectors {
            w.write_all(&x.to_le_bytes())?;
        }
        Ok(())
    })?;
    write_atomic(&files.metadata, |w| {
        let sidecar = SidecarRef { dimension: snapshot.dimension, records: &snapshot.chunks };
        serde_json::to_writer(w, &sidecar).map_err(io::Error::from)
    })?;
    tracing::debug!(records = snapshot.len(), vectors = %files.vectors.display(), "index persisted");
    Ok(())
}

fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> io::Result<()>,
{
    let wrap = |source: io::Error| Error::IndexWrite { path: path.to_path_buf(), source };
    let dir = parent_dir(path);
    fs::create_dir_all(&dir).map_err(wrap)?;
    let tmp = NamedTempFile::new_in(&dir).map_err(wrap)?;
    {
        let mut w = BufWriter::new(tmp.as_file());
        fill(&mut w).map_err(wrap)?;
        w.flush().map_err(wrap)?;
    }
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
