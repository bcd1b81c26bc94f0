use docqa_core::types::{Answer, Citation, Intent, OwnerId, ScoredChunk};

/// Workflow position. `Search` is only entered when the query was
/// classified as needing retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step { Classify, Search, Generate, Done }

/// Per-query scratch state, owned by a single `ask` call and dropped after
/// the answer is built.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub query: String,
    pub owner_filter: Option<OwnerId>,
    pub intent: Intent,
    pub retrieved: Vec<ScoredChunk>,
    pub answer: String,
    pub sources: Vec<Citation>,
}

impl AgentState {
    pub fn new(query: impl Into<String>, owner_filter: Option<OwnerId>) -> Self {
        Self { query: query.into(), owner_filter, intent: Intent::default(), retrieved: Vec::new(), answer: String::new(), sources: Vec::new() }
    }

    pub fn into_answer(self) -> Answer {
        Answer { query: self.query, answer: self.answer, sources: self.sources, intent: self.intent }
    }
}
