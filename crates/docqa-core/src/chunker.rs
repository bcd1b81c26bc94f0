//! Recursive, overlap-aware document chunking.
//!
//! Text is cut at the coarsest separator that yields pieces no longer than
//! `target_len` characters (paragraph, line, sentence, word), falling back to
//! raw character boundaries. Separators stay attached to the piece they end,
//! so the pieces always concatenate back to the source. Pieces are then
//! merged greedily into windows, and the trailing pieces of each window (up
//! to `overlap` characters) start the next one.
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{Error, Result};
use crate::types::{Chunk, DocId, OwnerId};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub target_len: usize,
    /// Characters of trailing context repeated at the start of the next chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { target_len: 2000, overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_len == 0 {
            return Err(Error::InvalidConfig("chunking.target_len must be positive".into()));
        }
        if self.overlap > self.target_len {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) exceeds chunking.target_len ({})",
                self.overlap, self.target_len
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Split one document into chunks. Blank text yields no chunks.
    pub fn chunk(&self, text: &str, doc_id: DocId, owner_id: OwnerId) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .spans(text)
            .into_iter()
            .enumerate()
            .map(|(chunk_id, span)| Chunk::new(chunk_id, doc_id, owner_id, &text[span]))
            .collect();
        tracing::debug!(doc_id, owner_id, chunks = chunks.len(), chars = text.chars().count(), "chunked document");
        chunks
    }

    /// Byte ranges of each chunk within `text`, in document order.
    ///
    /// Consecutive ranges overlap by at most `overlap` characters and never
    /// leave a gap, except where a whitespace-only window was dropped.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        self.split_into(text, 0, 0, &mut pieces);
        self.merge(&pieces)
            .into_iter()
            .filter(|span| !text[span.clone()].trim().is_empty())
            .collect()
    }

    fn split_into(&self, text: &str, offset: usize, level: usize, out: &mut Vec<Piece>) {
        let chars = text.chars().count();
        if chars <= self.config.target_len {
            if !text.is_empty() {
                out.push(Piece { start: offset, end: offset + text.len(), chars });
            }
            return;
        }
        let Some(found) = SEPARATORS[level.min(SEPARATORS.len())..].iter().position(|sep| text.contains(sep)) else {
            self.split_chars(text, offset, out);
            return;
        };
        let level = level + found;
        let sep = SEPARATORS[level];
        let mut start = 0;
        for (idx, _) in text.match_indices(sep) {
            let end = idx + sep.len();
            self.split_into(&text[start..end], offset + start, level + 1, out);
            start = end;
        }
        if start < text.len() {
            self.split_into(&text[start..], offset + start, level + 1, out);
        }
    }

    fn split_chars(&self, text: &str, offset: usize, out: &mut Vec<Piece>) {
        let mut start = 0;
        let mut chars = 0;
        for (idx, _) in text.char_indices() {
            if chars == self.config.target_len {
                out.push(Piece { start: offset + start, end: offset + idx, chars });
                start = idx;
                chars = 0;
            }
            chars += 1;
        }
        if chars > 0 {
            out.push(Piece { start: offset + start, end: offset + text.len(), chars });
        }
    }

    fn merge(&self, pieces: &[Piece]) -> Vec<Range<usize>> {
        let ChunkingConfig { target_len, overlap } = self.config;
        let mut spans = Vec::new();
        let (mut lo, mut total) = (0usize, 0usize);
        for (hi, piece) in pieces.iter().enumerate() {
            if lo < hi && total + piece.chars > target_len {
                spans.push(pieces[lo].start..pieces[hi - 1].end);
                while lo < hi && (total > overlap || total + piece.chars > target_len) {
                    total -= pieces[lo].chars;
                    lo += 1;
                }
            }
            total += piece.chars;
        }
        if lo < pieces.len() {
            spans.push(pieces[lo].start..pieces[pieces.len() - 1].end);
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(target_len: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig { target_len, overlap }).expect("valid config")
    }

    /// Rebuild the source by appending only the part of each span past the previous end.
    fn stitch(text: &str, spans: &[Range<usize>]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for span in spans {
            assert!(span.start <= covered, "gap before span {:?} (covered up to {})", span, covered);
            if span.end > covered {
                out.push_str(&text[covered..span.end]);
                covered = span.end;
            }
        }
        out
    }

    #[test]
    fn blank_text_yields_nothing() {
        let c = Chunker::default();
        assert!(c.chunk("", 1, 1).is_empty());
        assert!(c.chunk("   ", 1, 1).is_empty());
        assert!(c.chunk("\n\n\t ", 1, 1).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = Chunker::default().chunk("Short text.", 7, 3);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short text.");
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].doc_id, 7);
        assert_eq!(chunks[0].owner_id, 3);
        assert_eq!(chunks[0].char_count, 11);
    }

    #[test]
    fn paragraphs_are_preferred_over_finer_separators() {
        let para = "word ".repeat(8); // 40 chars
        let text = format!("{para}\n\n{para}\n\n{para}");
        let c = chunker(45, 0);
        let chunks = c.chunk(&text, 1, 1);
        assert_eq!(chunks.len(), 3);
        for ch in &chunks {
            assert!(ch.text.starts_with("word"), "chunk starts mid-paragraph: {:?}", ch.text);
        }
    }

    #[test]
    fn chunks_respect_target_and_reconstruct_source() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(60)
            + "\n\nSecond paragraph with more words in it.\nAnd a line.\n\n"
            + &"Lorem ipsum dolor sit amet. ".repeat(40);
        let c = chunker(300, 60);
        let spans = c.spans(&text);
        assert!(spans.len() > 1);
        for span in &spans {
            assert!(text[span.clone()].chars().count() <= 300);
        }
        assert_eq!(stitch(&text, &spans), text);
    }

    #[test]
    fn consecutive_chunks_share_overlap() {
        let text = (0..200).map(|i| format!("w{i:03}")).collect::<Vec<_>>().join(" ");
        let c = chunker(100, 20);
        let spans = c.spans(&text);
        assert!(spans.len() > 2);
        for pair in spans.windows(2) {
            let shared = pair[0].end.saturating_sub(pair[1].start);
            assert!(shared > 0, "expected overlap between {:?} and {:?}", pair[0], pair[1]);
            assert!(text[pair[1].start..pair[0].end].chars().count() <= 20);
        }
    }

    #[test]
    fn unbroken_runs_fall_back_to_character_cuts() {
        let text = "é".repeat(250);
        let c = chunker(100, 0);
        let chunks = c.chunk(&text, 1, 1);
        assert_eq!(chunks.iter().map(|ch| ch.char_count).collect::<Vec<_>>(), vec![100, 100, 50]);
        assert_eq!(chunks.iter().map(|ch| ch.text.as_str()).collect::<String>(), text);
    }

    #[test]
    fn chunk_ids_are_contiguous_and_deterministic() {
        let text = "Alpha beta gamma. Delta epsilon.\nZeta eta theta.\n\n".repeat(50);
        let c = chunker(120, 30);
        let a = c.chunk(&text, 9, 2);
        let b = c.chunk(&text, 9, 2);
        assert_eq!(a, b);
        for (i, ch) in a.iter().enumerate() {
            assert_eq!(ch.chunk_id, i);
        }
    }

    #[test]
    fn overlap_equal_to_target_still_progresses() {
        let text = "one two three four five six seven eight nine ten ".repeat(10);
        let c = chunker(20, 20);
        let spans = c.spans(&text);
        assert!(!spans.is_empty());
        assert_eq!(stitch(&text, &spans), text);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(Chunker::new(ChunkingConfig { target_len: 0, overlap: 0 }).is_err());
        assert!(Chunker::new(ChunkingConfig { target_len: 10, overlap: 11 }).is_err());
    }
}
