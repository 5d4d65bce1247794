use serde::{Deserialize, Serialize};

/// A bounded segment of page text with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Trimmed chunk text
    pub text: String,

    /// URL (or other identifier) of the page the text came from
    pub source: String,

    /// Page title
    pub title: String,

    /// Dense 0-based position in the chunk sequence
    pub chunk_id: usize,

    /// Byte offset of `text` within the chunked input
    pub start: usize,
}

impl Chunk {
    /// Create a new chunk
    #[must_use]
    pub const fn new(
        text: String,
        source: String,
        title: String,
        chunk_id: usize,
        start: usize,
    ) -> Self {
        Self {
            text,
            source,
            title,
            chunk_id,
            start,
        }
    }

    /// Byte offset one past the end of the chunk in the input
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Length in characters
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Summary numbers for a chunk sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub min_chars: usize,
    pub max_chars: usize,
}

impl ChunkingStats {
    #[must_use]
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let lengths: Vec<usize> = chunks.iter().map(Chunk::char_len).collect();
        Self {
            total_chunks: chunks.len(),
            total_chars: lengths.iter().sum(),
            min_chars: lengths.iter().copied().min().unwrap_or(0),
            max_chars: lengths.iter().copied().max().unwrap_or(0),
        }
    }

    #[must_use]
    pub fn avg_chars(&self) -> usize {
        if self.total_chunks == 0 {
            0
        } else {
            self.total_chars / self.total_chunks
        }
    }
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} chunks, {} chars (avg {}, min {}, max {})",
            self.total_chunks,
            self.total_chars,
            self.avg_chars(),
            self.min_chars,
            self.max_chars
        )
    }
}
