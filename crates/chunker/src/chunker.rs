use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::splitter::RecursiveSplitter;
use crate::types::{Chunk, ChunkingStats};

/// Main chunker interface for page text
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a new chunker. Fails when the configuration is inconsistent
    /// (for example `chunk_overlap >= chunk_size`).
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self { config })
    }

    /// Split cleaned page text into overlapping chunks tagged with `source` and `title`.
    ///
    /// Chunk ids are assigned densely from 0 in output order.
    pub fn create_chunks(&self, text: &str, source: &str, title: &str) -> Result<Vec<Chunk>> {
        let trimmed_len = text.trim().chars().count();
        if trimmed_len == 0 {
            return Err(ChunkerError::EmptyContent);
        }
        if trimmed_len < self.config.min_text_chars {
            return Err(ChunkerError::TooShort {
                actual: trimmed_len,
                minimum: self.config.min_text_chars,
            });
        }

        let splitter = RecursiveSplitter::new(
            text,
            self.config.chunk_size,
            self.config.chunk_overlap,
            &self.config.separators,
        );

        let chunks: Vec<Chunk> = splitter
            .split()
            .into_iter()
            .enumerate()
            .map(|(chunk_id, segment)| {
                Chunk::new(
                    segment.text.to_string(),
                    source.to_string(),
                    title.to_string(),
                    chunk_id,
                    segment.start,
                )
            })
            .collect();

        if chunks.is_empty() {
            return Err(ChunkerError::NoChunks);
        }

        log::debug!(
            "Chunked '{source}': {}",
            ChunkingStats::from_chunks(&chunks)
        );
        Ok(chunks)
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }
}
