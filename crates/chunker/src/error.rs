use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur during text chunking
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input text is empty or whitespace only
    #[error("Empty content provided")]
    EmptyContent,

    /// Input text is shorter than the configured minimum
    #[error("Text is too short for chunking: {actual} chars (minimum {minimum})")]
    TooShort { actual: usize, minimum: usize },

    /// Splitting produced nothing usable
    #[error("No chunks were created from the text")]
    NoChunks,
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
