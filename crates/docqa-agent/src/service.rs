use serde::{Deserialize, Serialize};
use std::sync::Arc;

use docqa_core::config::AgentSettings;
use docqa_core::traits::Generator;
use docqa_core::types::{Answer, DocId, OwnerId, SearchResult};
use docqa_core::{Chunker, Result};
use docqa_vector::FlatIndex;

use crate::orchestrator::Orchestrator;

/// A document handed over for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub doc_id: DocId,
    pub owner_id: OwnerId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOutcome {
    /// False when the text was blank and nothing was chunked.
    pub indexed: bool,
    pub chunks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub indexed_count: usize,
    pub failed_ids: Vec<DocId>,
    pub skipped_ids: Vec<DocId>,
}

/// Chunker, index and orchestrator behind one `index` / `search` / `ask`
/// surface.
pub struct DocumentQa<G> where G: Generator {
    chunker: Chunker,
    index: Arc<FlatIndex>,
    agent: Orchestrator<Arc<FlatIndex>, G>,
}

impl<G> DocumentQa<G> where G: Generator {
    pub fn new(chunker: Chunker, index: Arc<FlatIndex>, generator: G, settings: AgentSettings) -> Self {
        let agent = Orchestrator::new(index.clone(), generator, settings);
        Self { chunker, index, agent }
    }

    pub fn index_handle(&self) -> &Arc<FlatIndex> { &self.index }

    /// Chunk, embed and persist one document. Indexing the same `doc_id`
    /// twice duplicates its entries; `index_many` guards against that.
    pub fn index(&self, doc_id: DocId, owner_id: OwnerId, text: &str) -> Result<IndexOutcome> {
        let chunks = self.chunker.chunk(text, doc_id, owner_id);
        if chunks.is_empty() {
            tracing::info!(doc_id, "document is blank; nothing indexed");
            return Ok(IndexOutcome { indexed: false, chunks: 0 });
        }
        self.index.add_chunks(&chunks)?;
        tracing::info!(doc_id, owner_id, chunks = chunks.len(), "document indexed");
        Ok(IndexOutcome { indexed: true, chunks: chunks.len() })
    }

    pub fn index_many(&self, docs: &[SourceDocument]) -> Result<IndexReport> { self.index_many_with(docs, |_| {}) }

    /// Index `docs` in order, calling `on_done` after each one. Documents
    /// already in the index are skipped but counted as indexed. Per-document
    /// failures are collected; persistence failures abort the batch.
    pub fn index_many_with<F>(&self, docs: &[SourceDocument], mut on_done: F) -> Result<IndexReport>
    where
        F: FnMut(&SourceDocument),
    {
        let mut report = IndexReport::default();
        for doc in docs {
            if self.index.contains_doc(doc.doc_id) {
                report.skipped_ids.push(doc.doc_id);
                report.indexed_count += 1;
            } else {
                match self.index(doc.doc_id, doc.owner_id, &doc.text) {
                    Ok(outcome) if outcome.indexed => report.indexed_count += 1,
                    Ok(_) => report.failed_ids.push(doc.doc_id),
                    Err(e) if e.needs_reload() => return Err(e),
                    Err(e) => {
                        tracing::warn!(doc_id = doc.doc_id, error = %e, "document failed to index");
                        report.failed_ids.push(doc.doc_id);
                    }
                }
            }
            on_done(doc);
        }
        tracing::info!(indexed = report.indexed_count, failed = report.failed_ids.len(), skipped = report.skipped_ids.len(), "batch indexed");
        Ok(report)
    }

    pub fn search(&self, query: &str, top_k: usize, owner_filter: Option<OwnerId>) -> Result<Vec<SearchResult>> {
        Ok(self.index.search(query, top_k, owner_filter)?.into_iter().map(SearchResult::from).collect())
    }

    pub fn ask(&self, query: &str, owner_filter: Option<OwnerId>) -> Answer { self.agent.ask(query, owner_filter) }
}
