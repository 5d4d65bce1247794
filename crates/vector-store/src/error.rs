use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// Network failure or timeout talking to the embedding service
    #[error("Embedding service unreachable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding service rejected credentials: {0}")]
    EmbeddingAuth(String),

    #[error("Embedding quota exceeded: {0}")]
    EmbeddingQuota(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Lifecycle misuse: search before build/load, or overlapping writers
    #[error("Invalid index state: {0}")]
    InvalidState(String),

    /// Persisted index and metadata disagree
    #[error("Index corrupted: {0}")]
    Corrupted(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error(
        "Index was built with '{index_model}' ({index_dimension} dims) but the embedder \
         '{embedder_model}' produces {embedder_dimension} dims; rebuild the index"
    )]
    Incompatible {
        index_model: String,
        index_dimension: usize,
        embedder_model: String,
        embedder_dimension: usize,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VectorStoreError {
    /// Transient failures a caller may retry (timeouts, connection drops)
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable(_))
    }
}
