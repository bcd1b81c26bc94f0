use std::cmp::Ordering;

use docqa_core::traits::Retriever;
use docqa_core::types::{OwnerId, ScoredChunk};
use docqa_core::{Error, Result};

use crate::store::IndexSnapshot;
use crate::writer::check_dimensions;
use crate::FlatIndex;

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| { let d = x - y; d * d }).sum()
}

impl FlatIndex {
    /// The `top_k` closest chunks to `query`, ascending by squared L2
    /// distance; ties go to the earlier insertion position.
    pub fn search(&self, query: &str, top_k: usize, owner_filter: Option<OwnerId>) -> Result<Vec<ScoredChunk>> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() || top_k == 0 { return Ok(Vec::new()); }
        let mut vectors = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| Error::EmbeddingUnavailable(format!("{e:#}")))?;
        check_dimensions(&vectors, snapshot.dimension())?;
        let query_vec = vectors.pop().ok_or_else(|| Error::EmbeddingUnavailable("embedder returned no vector for the query".into()))?;
        let hits = top_k_in(&snapshot, &query_vec, top_k, owner_filter);
        tracing::debug!(top_k, ?owner_filter, hits = hits.len(), "flat search");
        Ok(hits)
    }

    /// Same as `search` for a caller that already holds the query embedding.
    pub fn search_vector(&self, query_vec: &[f32], top_k: usize, owner_filter: Option<OwnerId>) -> Result<Vec<ScoredChunk>> {
        let snapshot = self.snapshot();
        if query_vec.len() != snapshot.dimension() {
            return Err(Error::DimensionMismatch { expected: snapshot.dimension(), actual: query_vec.len() });
        }
        Ok(top_k_in(&snapshot, query_vec, top_k, owner_filter))
    }
}

impl Retriever for FlatIndex {
    fn retrieve(&self, query: &str, top_k: usize, owner_filter: Option<OwnerId>) -> Result<Vec<ScoredChunk>> {
        self.search(query, top_k, owner_filter)
    }
}

fn top_k_in(snapshot: &IndexSnapshot, query_vec: &[f32], top_k: usize, owner_filter: Option<OwnerId>) -> Vec<ScoredChunk> {
    if top_k == 0 { return Vec::new(); }
    let mut candidates: Vec<(f32, usize)> = snapshot
        .chunks()
        .iter()
        .enumerate()
        .filter(|(_, c)| owner_filter.map_or(true, |owner| c.owner_id == owner))
        .map(|(pos, _)| (squared_l2(query_vec, snapshot.vector(pos)), pos))
        .collect();

    let by_distance = |a: &(f32, usize), b: &(f32, usize)| -> Ordering { a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)) };
    if candidates.len() > top_k {
        candidates.select_nth_unstable_by(top_k - 1, by_distance);
        candidates.truncate(top_k);
    }
    candidates.sort_unstable_by(by_distance);

    candidates
        .into_iter()
        .map(|(distance, pos)| ScoredChunk { chunk: snapshot.chunks()[pos].clone(), distance })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::Chunk;

    fn snapshot(rows: &[(Vec<f32>, u64)]) -> IndexSnapshot {
        let mut s = IndexSnapshot::empty(rows[0].0.len());
        for (i, (v, owner)) in rows.iter().enumerate() {
            s.push(v, Chunk::new(i, 1, *owner, format!("chunk {i}")));
        }
        s
    }

    #[test]
    fn squared_l2_is_not_square_rooted() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn ties_go_to_earlier_position() {
        let s = snapshot(&[(vec![1.0, 0.0], 1), (vec![0.0, 1.0], 1), (vec![1.0, 0.0], 1), (vec![1.0, 0.0], 1)]);
        let hits = top_k_in(&s, &[1.0, 0.0], 2, None);
        let ids: Vec<usize> = hits.iter().map(|h| h.chunk.chunk_id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn owner_filter_applies_before_top_k() {
        let s = snapshot(&[(vec![0.0, 0.0], 1), (vec![5.0, 5.0], 2), (vec![9.0, 9.0], 2)]);
        let hits = top_k_in(&s, &[0.0, 0.0], 1, Some(2));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, 1);
        assert_eq!(hits[0].distance, 50.0);
    }

    #[test]
    fn zero_top_k_is_empty() {
        let s = snapshot(&[(vec![0.0], 1)]);
        assert!(top_k_in(&s, &[0.0], 0, None).is_empty());
    }
}
