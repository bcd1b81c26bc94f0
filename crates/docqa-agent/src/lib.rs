//! docqa-agent
//!
//! Retrieval orchestration over a `docqa_vector::FlatIndex`: intent
//! classification, optional search, grounded generation and citations.
//! `DocumentQa` bundles chunker, index and orchestrator into the
//! `index` / `search` / `ask` surface.
#![deny(unused_imports)]

pub mod generator;
pub mod orchestrator;
pub mod prompts;
pub mod service;
pub mod state;

pub use generator::ChatCompletionsGenerator;
pub use orchestrator::{Orchestrator, DEGRADED_ANSWER};
pub use service::{DocumentQa, IndexOutcome, IndexReport, SourceDocument};
pub use state::{AgentState, Step};
