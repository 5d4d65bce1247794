use serde::{Deserialize, Serialize};

/// Separators tried from coarsest to finest: paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ".", " ", ""];

/// Configuration for text chunking behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters carried over from the end of one chunk into the next
    pub chunk_overlap: usize,

    /// Inputs shorter than this (after trimming) are rejected
    pub min_text_chars: usize,

    /// Split points, coarsest first. An empty string means "between characters".
    pub separators: Vec<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 80,
            min_text_chars: 200,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ChunkerConfig {
    /// Config with explicit size and overlap, defaults elsewhere
    #[must_use]
    pub fn with_size(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }

        if self.separators.is_empty() {
            return Err("at least one separator is required".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 80);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ChunkerConfig::with_size(100, 100);
        assert!(config.validate().is_err());

        config.chunk_overlap = 150;
        assert!(config.validate().is_err());

        config.chunk_size = 0;
        config.chunk_overlap = 0;
        assert!(config.validate().is_err());

        config.chunk_size = 100;
        config.chunk_overlap = 99;
        assert!(config.validate().is_ok());

        config.separators.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ChunkerConfig = serde_json::from_str(r#"{"chunk_size": 300}"#).unwrap();
        assert_eq!(config.chunk_size, 300);
        assert_eq!(config.chunk_overlap, 80);
        assert_eq!(config.separators.len(), DEFAULT_SEPARATORS.len());
    }
}
