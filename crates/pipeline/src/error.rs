use serde::Serialize;
use std::fmt;
use thiserror::Error;
use webqa_chunker::ChunkerError;
use webqa_search::SearchError;
use webqa_source::SourceError;
use webqa_vector_store::VectorStoreError;

pub type Result<T> = std::result::Result<T, QaError>;

/// Failures reported by the generative model client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Missing or malformed settings (e.g. no API key)
    #[error("Generation is not configured: {0}")]
    Configuration(String),

    #[error("Generation service rejected credentials: {0}")]
    Authentication(String),

    #[error("Generation quota exceeded: {0}")]
    Quota(String),

    /// Timeout, connection failure or 5xx
    #[error("Generation service unreachable: {0}")]
    Connectivity(String),

    #[error("Unexpected generation response: {0}")]
    BadResponse(String),
}

impl GenerationError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

/// Coarse classification of [`QaError`] for callers and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Connectivity,
    State,
    Corruption,
    NotFound,
    Incompatible,
    Generation,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Connectivity => "connectivity",
            Self::State => "state",
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Incompatible => "incompatible",
            Self::Generation => "generation",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Chunker(#[from] ChunkerError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QaError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Chunker(_) => ErrorKind::Validation,
            Self::VectorStore(err) => vector_store_kind(err),
            Self::Search(SearchError::Index(err)) => vector_store_kind(err),
            Self::Search(SearchError::EmptyQuery | SearchError::InvalidConfig(_)) => {
                ErrorKind::Validation
            }
            Self::Source(err) => match err {
                SourceError::InvalidInput(_) | SourceError::EmptyContent(_) => {
                    ErrorKind::Validation
                }
                SourceError::Unreachable(_) | SourceError::BadResponse { .. } => {
                    ErrorKind::Connectivity
                }
            },
            Self::Generation(err) => match err {
                GenerationError::Configuration(_) => ErrorKind::Validation,
                GenerationError::Connectivity(_) => ErrorKind::Connectivity,
                GenerationError::Authentication(_)
                | GenerationError::Quota(_)
                | GenerationError::BadResponse(_) => ErrorKind::Generation,
            },
            Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Transient failures that may succeed on a later attempt
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::VectorStore(err) => err.is_retryable(),
            Self::Search(err) => err.is_retryable(),
            Self::Source(err) => err.is_retryable(),
            Self::Generation(err) => err.is_retryable(),
            Self::Config(_) | Self::Chunker(_) | Self::Io(_) => false,
        }
    }
}

fn vector_store_kind(err: &VectorStoreError) -> ErrorKind {
    match err {
        VectorStoreError::InvalidInput(_) => ErrorKind::Validation,
        VectorStoreError::InvalidState(_) => ErrorKind::State,
        VectorStoreError::Corrupted(_) => ErrorKind::Corruption,
        VectorStoreError::NotFound(_) => ErrorKind::NotFound,
        VectorStoreError::InvalidDimension { .. } | VectorStoreError::Incompatible { .. } => {
            ErrorKind::Incompatible
        }
        VectorStoreError::EmbeddingUnavailable(_)
        | VectorStoreError::EmbeddingAuth(_)
        | VectorStoreError::EmbeddingQuota(_) => ErrorKind::Connectivity,
        VectorStoreError::EmbeddingError(_)
        | VectorStoreError::IoError(_)
        | VectorStoreError::SerializationError(_) => ErrorKind::Internal,
    }
}
