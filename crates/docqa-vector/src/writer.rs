use std::sync::Arc;

use docqa_core::types::Chunk;
use docqa_core::{Error, Result};

use crate::store;
use crate::FlatIndex;

impl FlatIndex {
    /// Embed `chunks`, append them after the current last position and
    /// persist both files before returning.
    ///
    /// On `IndexWrite` the in-memory index keeps its pre-add state, but the
    /// files may hold a partial commit; reload before trusting them.
    pub fn add_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() { return Ok(()); }
        let vectors = self.embed(chunks)?;

        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        for (vector, chunk) in vectors.iter().zip(chunks) {
            next.push(vector, chunk.clone());
        }
        store::write_snapshot(&self.files, &next)?;
        let total = next.len();
        *self.current.write() = Arc::new(next);
        tracing::info!(added = chunks.len(), total, "chunks indexed");
        Ok(())
    }

    fn embed(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).map_err(|e| Error::EmbeddingUnavailable(format!("{e:#}")))?;
        if vectors.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!("embedder returned {} vectors for {} texts", vectors.len(), chunks.len())));
        }
        check_dimensions(&vectors, self.dimension())?;
        Ok(vectors)
    }
}

pub(crate) fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(Error::DimensionMismatch { expected, actual: v.len() }),
        None => Ok(()),
    }
}
