//! # WebQA Source
//!
//! Turns a URL into clean, indexable text.
//!
//! ```text
//! URL ──> WebsiteLoader::fetch ──> (title, raw text) ──> TextCleaner::clean ──> text
//!            │                                               │
//!            └─ drops script/style/noscript                  └─ drops boilerplate + duplicates
//! ```

mod cleaner;
mod error;
mod loader;

use async_trait::async_trait;

pub use cleaner::{CleanerConfig, TextCleaner, NOISE_PATTERNS};
pub use error::{Result, SourceError};
pub use loader::{
    extract_page, parse_url, FetchedDocument, SourceConfig, WebsiteLoader, DEFAULT_USER_AGENT,
    UNTITLED_PAGE,
};

/// Anything that can produce the raw text of a page.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument>;
}
