use docqa_core::config::AgentSettings;
use docqa_core::traits::{Generator, Retriever};
use docqa_core::types::{Answer, Citation, Intent, OwnerId};
use docqa_core::{Error, Result};

use crate::prompts;
use crate::state::{AgentState, Step};

pub const DEGRADED_ANSWER: &str = "Sorry, I encountered an error while processing your request.";

/// Classify, optionally retrieve, then generate. One pass per query with no
/// retries; the only branch is whether `Search` runs.
pub struct Orchestrator<R, G> where R: Retriever, G: Generator {
    retriever: R,
    generator: G,
    settings: AgentSettings,
}

impl<R, G> Orchestrator<R, G> where R: Retriever, G: Generator {
    pub fn new(retriever: R, generator: G, settings: AgentSettings) -> Self { Self { retriever, generator, settings } }

    pub fn retriever(&self) -> &R { &self.retriever }
    pub fn settings(&self) -> &AgentSettings { &self.settings }

    /// Always returns a well-formed answer. Failures in any step are logged
    /// and replaced by `DEGRADED_ANSWER` with no sources.
    pub fn ask(&self, query: &str, owner_filter: Option<OwnerId>) -> Answer {
        let mut state = AgentState::new(query, owner_filter);
        match self.run(&mut state) {
            Ok(()) => state.into_answer(),
            Err(e) => {
                tracing::warn!(error = %e, intent = %state.intent, "answer degraded");
                Answer { query: state.query, answer: DEGRADED_ANSWER.to_string(), sources: Vec::new(), intent: state.intent }
            }
        }
    }

    fn run(&self, state: &mut AgentState) -> Result<()> {
        let mut step = Step::Classify;
        while step != Step::Done {
            let next = self.advance(step, state)?;
            tracing::debug!(from = ?step, to = ?next, "agent step");
            step = next;
        }
        Ok(())
    }

    /// Execute `step` against `state` and return the step that follows it.
    pub fn advance(&self, step: Step, state: &mut AgentState) -> Result<Step> {
        match step {
            Step::Classify => {
                let reply = self.complete(&prompts::classify_prompt(&state.query))?;
                state.intent = prompts::parse_intent(&reply);
                tracing::info!(intent = %state.intent, "query classified");
                Ok(match state.intent { Intent::Search => Step::Search, Intent::Generate => Step::Generate })
            }
            Step::Search => {
                state.retrieved = self.retriever.retrieve(&state.query, self.settings.top_k, state.owner_filter)?;
                tracing::debug!(hits = state.retrieved.len(), owner = ?state.owner_filter, "context retrieved");
                Ok(Step::Generate)
            }
            Step::Generate => {
                let prompt = prompts::answer_prompt(&state.query, state.intent, &state.retrieved);
                state.answer = self.complete(&prompt)?.trim().to_string();
                if state.intent == Intent::Search {
                    state.sources = state.retrieved.iter().take(self.settings.max_citations).map(Citation::from).collect();
                }
                Ok(Step::Done)
            }
            Step::Done => Ok(Step::Done),
        }
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.generator.complete(prompt).map_err(|e| Error::Generation(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{Chunk, ScoredChunk};
    use std::sync::Mutex;

    struct Hits(Vec<ScoredChunk>);
    impl Retriever for Hits {
        fn retrieve(&self, _q: &str, top_k: usize, _o: Option<OwnerId>) -> Result<Vec<ScoredChunk>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    struct Scripted(Mutex<Vec<&'static str>>);
    impl Generator for Scripted {
        fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            let mut replies = self.0.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
            if replies.is_empty() { anyhow::bail!("script exhausted") }
            Ok(replies.remove(0).to_string())
        }
    }

    fn hits(n: usize) -> Vec<ScoredChunk> {
        (0..n).map(|i| ScoredChunk { chunk: Chunk::new(i, 10, 1, format!("text {i}")), distance: i as f32 }).collect()
    }

    #[test]
    fn transitions_follow_intent() {
        let agent = Orchestrator::new(Hits(hits(1)), Scripted(Mutex::new(vec!["generate"])), AgentSettings::default());
        let mut state = AgentState::new("hi", None);
        assert_eq!(agent.advance(Step::Classify, &mut state).unwrap(), Step::Generate);

        let agent = Orchestrator::new(Hits(hits(1)), Scripted(Mutex::new(vec!["search"])), AgentSettings::default());
        let mut state = AgentState::new("contract?", None);
        assert_eq!(agent.advance(Step::Classify, &mut state).unwrap(), Step::Search);
        assert_eq!(agent.advance(Step::Search, &mut state).unwrap(), Step::Generate);
        assert_eq!(state.retrieved.len(), 1);
    }

    #[test]
    fn citations_are_capped_at_max_citations() {
        let agent = Orchestrator::new(Hits(hits(5)), Scripted(Mutex::new(vec!["search", "  the answer \n"])), AgentSettings::default());
        let answer = agent.ask("q", None);
        assert_eq!(answer.answer, "the answer");
        assert_eq!(answer.sources.iter().map(|c| c.chunk_id).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn failure_after_classification_keeps_intent() {
        let agent = Orchestrator::new(Hits(hits(2)), Scripted(Mutex::new(vec!["search"])), AgentSettings::default());
        let answer = agent.ask("q", None);
        assert_eq!(answer.answer, DEGRADED_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(answer.intent, Intent::Search);
    }
}
