use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Malformed URL or unsupported scheme
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// DNS, connect or timeout failure
    #[error("Failed to connect to the website: {0}")]
    Unreachable(String),

    #[error("Website returned status code {status}")]
    BadResponse { status: u16 },

    /// Page (or cleaned text) has too little content to index
    #[error("Not enough text content: {0}")]
    EmptyContent(String),
}

impl SourceError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}
