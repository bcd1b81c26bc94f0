//! Domain types shared by the chunker, the vector index and the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type DocId = u64;
pub type OwnerId = u64;

/// A bounded slice of one document's text.
///
/// - `chunk_id`: 0-based ordinal within the document, contiguous
/// - `doc_id` / `owner_id`: owning document and its owner
/// - `text`: exact substring of the source text (overlap included)
/// - `char_count`: length of `text` in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: usize,
    pub doc_id: DocId,
    pub owner_id: OwnerId,
    pub text: String,
    pub char_count: usize,
}

impl Chunk {
    pub fn new(chunk_id: usize, doc_id: DocId, owner_id: OwnerId, text: impl Into<String>) -> Self {
        let text = text.into();
        let char_count = text.chars().count();
        Self { chunk_id, doc_id, owner_id, text, char_count }
    }
}

/// A retrieved chunk and its squared L2 distance to the query.
/// Lower is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Shape returned to API callers by `search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub chunk_id: usize,
    pub text: String,
    pub similarity_score: f32,
}

impl From<ScoredChunk> for SearchResult {
    fn from(hit: ScoredChunk) -> Self {
        Self {
            doc_id: hit.chunk.doc_id,
            chunk_id: hit.chunk.chunk_id,
            text: hit.chunk.text,
            similarity_score: hit.distance,
        }
    }
}

/// Pointer back to the passage an answer was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: DocId,
    pub chunk_id: usize,
    pub similarity_score: f32,
}

impl From<&ScoredChunk> for Citation {
    fn from(hit: &ScoredChunk) -> Self {
        Self { doc_id: hit.chunk.doc_id, chunk_id: hit.chunk.chunk_id, similarity_score: hit.distance }
    }
}

/// Whether a query needs document retrieval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Search,
    Generate,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Search => "search",
            Intent::Generate => "generate",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Final result of `ask`. Always structurally valid, even when degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub query: String,
    pub answer: String,
    pub sources: Vec<Citation>,
    pub intent: Intent,
}
