use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to write index file {}: {source}", path.display())]
    IndexWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read index file {}: {source}", path.display())]
    IndexRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl Error {
    /// Persistence failures leave the on-disk index in an unknown state;
    /// callers should reload before trusting it again.
    pub fn needs_reload(&self) -> bool {
        matches!(self, Error::IndexWrite { .. } | Error::IndexCorrupt(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
