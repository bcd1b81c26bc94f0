use crate::types::{OwnerId, ScoredChunk};

/// Text to fixed-length vector.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Prompt to text. Implementations are expected to bound each call with a timeout.
pub trait Generator: Send + Sync {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Top-k chunk retrieval, ordered closest first.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, query: &str, top_k: usize, owner_filter: Option<OwnerId>) -> crate::Result<Vec<ScoredChunk>>;
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dim(&self) -> usize { (**self).dim() }
    fn max_len(&self) -> usize { (**self).max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
}

impl<T: Embedder + ?Sized> Embedder for std::sync::Arc<T> {
    fn dim(&self) -> usize { (**self).dim() }
    fn max_len(&self) -> usize { (**self).max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { (**self).embed_batch(texts) }
}

impl<T: Generator + ?Sized> Generator for Box<T> {
    fn complete(&self, prompt: &str) -> anyhow::Result<String> { (**self).complete(prompt) }
}

impl<T: Generator + ?Sized> Generator for std::sync::Arc<T> {
    fn complete(&self, prompt: &str) -> anyhow::Result<String> { (**self).complete(prompt) }
}

impl<T: Retriever + ?Sized> Retriever for std::sync::Arc<T> {
    fn retrieve(&self, query: &str, top_k: usize, owner_filter: Option<OwnerId>) -> crate::Result<Vec<ScoredChunk>> {
        (**self).retrieve(query, top_k, owner_filter)
    }
}
