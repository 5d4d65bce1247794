//! # WebQA Pipeline
//!
//! Grounded question answering over a single web page.
//!
//! ## Architecture
//!
//! ```text
//! index:  URL ──> WebsiteLoader ──> TextCleaner ──> Chunker ──> VectorIndex::rebuild
//!                                                                   │
//!                                                   .webqa/index.bin + metadata.json
//!
//! ask:    question ──> Retriever (top_k, distance <= threshold)
//!                         │
//!                         ├─ nothing relevant ──> "The answer is not available on the provided website."
//!                         │
//!                         └─ chunks ──> ContextAssembler ──> Generator ──> answer
//! ```
//!
//! The generator only ever sees retrieved page text; when retrieval comes back
//! empty it is not called at all.
//!
//! ## Example
//!
//! ```no_run
//! use webqa_pipeline::{IndexSource, QaConfig, QaPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), webqa_pipeline::QaError> {
//!     let config = QaConfig::load(None)?;
//!     let pipeline = QaPipeline::from_config(&config)?;
//!
//!     pipeline
//!         .index(IndexSource::Url("https://example.com/about".to_string()))
//!         .await?;
//!     println!("{}", pipeline.ask("When was the company founded?").await?);
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod error;
mod generator;
mod pipeline;
mod prompt;

pub use config::{
    GenerationConfig, IndexConfig, QaConfig, DEFAULT_CONFIG_FILE, DEFAULT_GENERATION_MODEL,
};
pub use context::ContextAssembler;
pub use error::{ErrorKind, GenerationError, QaError, Result};
pub use generator::{Generator, OpenAiGenerator};
pub use pipeline::{Answer, IndexReport, IndexSource, QaPipeline};
pub use prompt::{build_user_prompt, NOT_FOUND_ANSWER, SYSTEM_PROMPT};

// Re-exports for callers wiring their own components
pub use webqa_search::RetrievalResult;
pub use webqa_source::{DocumentSource, FetchedDocument};
pub use webqa_vector_store::{Embedder, EmbeddingMode, LexicalEmbedder};
