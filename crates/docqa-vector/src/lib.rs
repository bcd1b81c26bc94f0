//! docqa-vector
//!
//! Exact (flat) nearest-neighbour index over chunk embeddings, persisted as a
//! raw vector file plus a JSON metadata sidecar. See `writer` for appends,
//! `search` for queries and `store` for the on-disk commit protocol.
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::Arc;

use docqa_core::traits::Embedder;
use docqa_core::types::DocId;
use docqa_core::{Error, Result};

pub mod schema;
pub mod search;
pub mod store;
pub mod writer;

pub use schema::IndexFiles;
pub use search::squared_l2;
pub use store::IndexSnapshot;

/// Append-only flat index.
///
/// Readers clone the current `Arc<IndexSnapshot>` and search it without
/// holding a lock. Writers serialize on `writer`, build the next snapshot
/// off to the side, persist it, then swap it in; readers therefore see the
/// pre- or post-add state and never a partial one.
pub struct FlatIndex {
    files: IndexFiles,
    embedder: Arc<dyn Embedder>,
    current: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
}

impl FlatIndex {
    /// An empty index bound to `files`; nothing is read until `load`.
    pub fn new(files: IndexFiles, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let dimension = embedder.dim();
        if dimension == 0 { return Err(Error::InvalidConfig("embedder dimension must be positive".into())); }
        Ok(Self { files, embedder, current: RwLock::new(Arc::new(IndexSnapshot::empty(dimension))), writer: Mutex::new(()) })
    }

    pub fn open(files: IndexFiles, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let index = Self::new(files, embedder)?;
        index.load()?;
        Ok(index)
    }

    /// Replace the in-memory state with what is on disk. Absent files mean
    /// an empty index.
    pub fn load(&self) -> Result<()> {
        let _guard = self.writer.lock();
        let snapshot = store::read_snapshot(&self.files, self.dimension())?;
        *self.current.write() = Arc::new(snapshot);
        Ok(())
    }

    /// Drop the uncommitted vector tail of an interrupted save, then load.
    /// Returns the number of records dropped.
    pub fn repair(&self) -> Result<usize> {
        let _guard = self.writer.lock();
        let dropped = store::repair_snapshot(&self.files, self.dimension())?;
        let snapshot = store::read_snapshot(&self.files, self.dimension())?;
        *self.current.write() = Arc::new(snapshot);
        Ok(dropped)
    }

    /// Persist the current state.
    pub fn save(&self) -> Result<()> {
        let _guard = self.writer.lock();
        let snapshot = self.snapshot();
        store::write_snapshot(&self.files, &snapshot)
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> { self.current.read().clone() }

    pub fn files(&self) -> &IndexFiles { &self.files }
    pub fn dimension(&self) -> usize { self.embedder.dim() }
    pub fn len(&self) -> usize { self.snapshot().len() }
    pub fn is_empty(&self) -> bool { self.snapshot().is_empty() }

    /// Documents with at least one indexed chunk. The index never
    /// deduplicates; callers use this to avoid re-indexing.
    pub fn indexed_doc_ids(&self) -> BTreeSet<DocId> {
        self.snapshot().chunks().iter().map(|c| c.doc_id).collect()
    }

    pub fn contains_doc(&self, doc_id: DocId) -> bool {
        self.snapshot().chunks().iter().any(|c| c.doc_id == doc_id)
    }
}
