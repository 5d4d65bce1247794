//! # WebQA Chunker
//!
//! Splits cleaned page text into overlapping chunks for embedding and retrieval.
//!
//! ## Algorithm
//!
//! ```text
//! Cleaned text
//!     │
//!     ├──> Pick the coarsest separator present
//!     │      "\n\n" → "\n" → "." → " " → ""
//!     │
//!     ├──> Split, keeping separators on the following piece
//!     │      └─> pieces that are still too long recurse with finer separators
//!     │
//!     └──> Merge pieces into windows of ≤ chunk_size chars
//!            └─> carry ≤ chunk_overlap chars into the next window
//! ```
//!
//! ## Example
//!
//! ```rust
//! use webqa_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::with_size(120, 20)).unwrap();
//! let text = "Rust is a systems programming language. ".repeat(10);
//!
//! let chunks = chunker
//!     .create_chunks(&text, "https://example.com", "Example")
//!     .unwrap();
//! for chunk in &chunks {
//!     assert!(chunk.text.chars().count() <= 120);
//! }
//! ```

mod chunker;
mod config;
mod error;
mod splitter;
mod types;

pub use chunker::Chunker;
pub use config::{ChunkerConfig, DEFAULT_SEPARATORS};
pub use error::{ChunkerError, Result};
pub use types::{Chunk, ChunkingStats};
