//! # WebQA Vector Store
//!
//! Embeds page chunks, keeps them in an exact nearest-neighbour index, and
//! persists the index together with its chunk records.
//!
//! ## Architecture
//!
//! ```text
//! Chunk[]
//!     │
//!     ├──> Embedder (remote OpenAI-compatible | lexical hashing)
//!     │      └─> Vector[d]
//!     │
//!     ├──> FlatIndex (squared L2, brute force)
//!     │      └─> SearchHits { indices, distances }
//!     │
//!     └──> Persisted pair (one generation digest)
//!            ├─> index.bin      (WQV1 header + f32 rows)
//!            └─> metadata.json  (ordered chunk records)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use webqa_vector_store::{IndexPaths, LexicalEmbedder, VectorIndex};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = Arc::new(LexicalEmbedder::new(384)?);
//!     let index = VectorIndex::new(embedder, IndexPaths::default());
//!
//!     let chunks = vec![/* Chunk instances */];
//!     index.rebuild(chunks).await?;
//!
//!     let hits = index.search("opening hours", 5).await?;
//!     for (chunk, distance) in hits.iter() {
//!         println!("{:.3} {}", distance, chunk.title);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod paths;
pub mod persist;
mod remote;
mod store;
mod types;

pub use embeddings::{
    squared_l2, Embedder, EmbeddingConfig, EmbeddingMode, EmbeddingModel, LexicalEmbedder,
    DEFAULT_BASE_URL, DEFAULT_LEXICAL_DIMENSION, DEFAULT_REMOTE_MODEL,
};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use paths::{IndexPaths, DEFAULT_INDEX_DIR, INDEX_FILE_NAME, METADATA_FILE_NAME};
pub use remote::{describe_transport_error, RemoteEmbedder};
pub use store::VectorIndex;
pub use types::{IndexPhase, SearchHits};

// Re-export chunk type for convenience
pub use webqa_chunker::Chunk;
