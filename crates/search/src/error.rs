use thiserror::Error;
use webqa_vector_store::VectorStoreError;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Index(#[from] VectorStoreError),

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Invalid retrieval settings: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Index(err) => err.is_retryable(),
            Self::EmptyQuery | Self::InvalidConfig(_) => false,
        }
    }
}
