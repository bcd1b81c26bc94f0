//! Prompt text for each orchestration step and parsing of the classifier
//! reply.
use docqa_core::types::{Intent, ScoredChunk};

pub fn classify_prompt(query: &str) -> String {
    format!(
        "Decide whether answering the user query requires looking up the user's uploaded documents.\n\n\
         Reply \"search\" if the query asks about specific documents, contracts, reports, company data or other uploaded content.\n\
         Reply \"generate\" if it is a greeting, small talk or a general knowledge question.\n\n\
         User query: \"{query}\"\n\n\
         Respond with exactly one word: search or generate."
    )
}

/// Anything other than the literal `generate` (case-insensitive, surrounding
/// whitespace ignored) routes to retrieval.
pub fn parse_intent(reply: &str) -> Intent {
    match reply.trim().to_lowercase().as_str() {
        "generate" => Intent::Generate,
        _ => Intent::Search,
    }
}

pub fn context_block(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|h| format!("[Document {}, Chunk {}]:\n{}", h.chunk.doc_id, h.chunk.chunk_id, h.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn grounded_prompt(query: &str, chunks: &[ScoredChunk]) -> String {
    format!(
        "Answer the user's question using ONLY the information in these document chunks.\n\
         If the answer is not in the chunks, say so explicitly.\n\n\
         Document chunks:\n{}\n\n\
         User question: {query}\n\n\
         Answer:",
        context_block(chunks)
    )
}

pub fn fallback_prompt(query: &str) -> String {
    format!(
        "No relevant information was found in the user's documents for this question.\n\
         Start by saying that nothing relevant was found in the documents, then answer from general knowledge.\n\n\
         User question: {query}\n\n\
         Answer:"
    )
}

pub fn conversational_prompt(query: &str) -> String {
    format!("You are a helpful assistant. Reply concisely to the user.\n\nUser: {query}\n\nAssistant:")
}

/// Generation prompt for the classified intent and whatever was retrieved.
pub fn answer_prompt(query: &str, intent: Intent, retrieved: &[ScoredChunk]) -> String {
    match intent {
        Intent::Search if retrieved.is_empty() => fallback_prompt(query),
        Intent::Search => grounded_prompt(query, retrieved),
        Intent::Generate => conversational_prompt(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::Chunk;

    fn hit(doc_id: u64, chunk_id: usize, text: &str) -> ScoredChunk {
        ScoredChunk { chunk: Chunk::new(chunk_id, doc_id, 1, text), distance: 0.5 }
    }

    #[test]
    fn intent_parsing_is_lenient_on_case_and_whitespace_only() {
        assert_eq!(parse_intent("generate"), Intent::Generate);
        assert_eq!(parse_intent("  GENERATE\n"), Intent::Generate);
        assert_eq!(parse_intent("Search"), Intent::Search);
        assert_eq!(parse_intent("generate."), Intent::Search);
        assert_eq!(parse_intent("I think generate"), Intent::Search);
        assert_eq!(parse_intent(""), Intent::Search);
    }

    #[test]
    fn classify_prompt_embeds_query() {
        let p = classify_prompt("what is in my lease?");
        assert!(p.contains("\"what is in my lease?\""));
        assert!(p.contains("search or generate"));
    }

    #[test]
    fn grounded_prompt_labels_every_chunk() {
        let p = grounded_prompt("q?", &[hit(4, 0, "alpha text"), hit(9, 2, "beta text")]);
        assert!(p.contains("[Document 4, Chunk 0]:\nalpha text\n\n[Document 9, Chunk 2]:\nbeta text"));
        assert!(p.contains("ONLY"));
        assert!(p.ends_with("User question: q?\n\nAnswer:"));
    }

    #[test]
    fn prompt_choice_follows_intent_and_results() {
        let hits = [hit(1, 0, "ctx")];
        assert_eq!(answer_prompt("q", Intent::Search, &hits), grounded_prompt("q", &hits));
        assert_eq!(answer_prompt("q", Intent::Search, &[]), fallback_prompt("q"));
        assert_eq!(answer_prompt("q", Intent::Generate, &hits), conversational_prompt("q"));
    }
}
