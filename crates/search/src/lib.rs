//! # WebQA Search
//!
//! Relevance-thresholded retrieval on top of the vector index.
//!
//! ```text
//! query ──> VectorIndex::search(top_k) ──> distance <= threshold ──> RetrievalResult[]
//! ```
//!
//! Candidates keep the index's ascending-distance order; nothing is re-ranked.

mod error;
mod retriever;

pub use error::{Result, SearchError};
pub use retriever::{
    filter_hits, RetrievalResult, Retriever, RetrieverConfig, DEFAULT_DISTANCE_THRESHOLD,
    DEFAULT_TOP_K,
};
