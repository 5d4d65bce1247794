use crate::error::{Result, VectorStoreError};
use crate::remote::RemoteEmbedder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_LEXICAL_DIMENSION: usize = 384;
pub const DEFAULT_REMOTE_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Turns text into fixed-length vectors.
///
/// The same embedder must be used to build an index and to query it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier recorded alongside persisted indexes
    fn model_id(&self) -> &str;

    /// Output dimension, when known before the first call
    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// OpenAI-compatible `/embeddings` endpoint
    Remote,
    /// Offline feature hashing; deterministic, no network
    Lexical,
}

impl EmbeddingMode {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "lexical" => Ok(Self::Lexical),
            other => Err(VectorStoreError::InvalidInput(format!(
                "Unsupported embedding mode '{other}' (expected 'remote' or 'lexical')"
            ))),
        }
    }

    /// Reads `WEBQA_EMBEDDING_MODE`, if set.
    pub fn from_env() -> Result<Option<Self>> {
        match env::var("WEBQA_EMBEDDING_MODE") {
            Ok(raw) if !raw.trim().is_empty() => Self::parse(&raw).map(Some),
            _ => Ok(None),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Lexical => "lexical",
        }
    }
}

impl Default for EmbeddingMode {
    fn default() -> Self {
        Self::Remote
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub model: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Requests are split into batches of at most this many texts
    pub batch_size: usize,
    pub timeout_secs: u64,
    /// Only used by the lexical embedder
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::default(),
            model: DEFAULT_REMOTE_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            batch_size: 64,
            timeout_secs: 30,
            dimension: DEFAULT_LEXICAL_DIMENSION,
        }
    }
}

impl EmbeddingConfig {
    #[must_use]
    pub fn lexical() -> Self {
        Self {
            mode: EmbeddingMode::Lexical,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Embedder selected from configuration
pub struct EmbeddingModel {
    backend: EmbeddingBackend,
}

enum EmbeddingBackend {
    Remote(RemoteEmbedder),
    Lexical(LexicalEmbedder),
}

impl EmbeddingModel {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let backend = match config.mode {
            EmbeddingMode::Lexical => {
                EmbeddingBackend::Lexical(LexicalEmbedder::new(config.dimension)?)
            }
            EmbeddingMode::Remote => {
                let api_key = config
                    .api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        VectorStoreError::InvalidInput(
                            "remote embeddings require an API key (set OPENAI_API_KEY)"
                                .to_string(),
                        )
                    })?;
                EmbeddingBackend::Remote(RemoteEmbedder::new(
                    &api_key,
                    &config.base_url,
                    &config.model,
                    config.timeout(),
                    config.batch_size,
                )?)
            }
        };
        log::debug!("Embedding backend: {}", config.mode.as_str());
        Ok(Self { backend })
    }

    #[must_use]
    pub const fn mode(&self) -> EmbeddingMode {
        match &self.backend {
            EmbeddingBackend::Remote(_) => EmbeddingMode::Remote,
            EmbeddingBackend::Lexical(_) => EmbeddingMode::Lexical,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str {
        match &self.backend {
            EmbeddingBackend::Remote(remote) => remote.model_id(),
            EmbeddingBackend::Lexical(lexical) => lexical.model_id(),
        }
    }

    fn dimension(&self) -> Option<usize> {
        match &self.backend {
            EmbeddingBackend::Remote(remote) => remote.dimension(),
            EmbeddingBackend::Lexical(lexical) => lexical.dimension(),
        }
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match &self.backend {
            EmbeddingBackend::Remote(remote) => remote.embed_batch(texts).await,
            EmbeddingBackend::Lexical(lexical) => lexical.embed_batch(texts).await,
        }
    }
}

/// Signed feature hashing over lower-cased word tokens.
///
/// Texts that share vocabulary end up close under Euclidean distance, which is enough for
/// offline use and deterministic tests.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimension: usize,
    model_id: String,
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "with", "that", "this", "from", "into", "how",
    "what", "does", "did", "which", "who", "when", "where", "why", "has", "have", "its", "their",
    "there", "about", "can", "you", "your", "not", "but", "all", "any", "our",
];

impl LexicalEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(VectorStoreError::InvalidInput(
                "lexical embedding dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            model_id: format!("lexical-hash-{dimension}"),
        })
    }

    #[must_use]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        let mut terms = content_terms(text);
        if terms.is_empty() {
            terms = text.unicode_words().map(str::to_lowercase).collect();
        }
        if terms.is_empty() && !text.trim().is_empty() {
            terms.push(text.trim().to_lowercase());
        }

        for term in &terms {
            let hash = fnv1a_64(term.as_bytes());
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
            vec[bucket] += sign;
        }
        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for LexicalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn content_terms(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() >= 3 && !STOPWORDS.contains(&word.as_str()))
        .map(|word| stem(&word))
        .collect()
}

/// Folds the most common plural forms together.
fn stem(word: &str) -> String {
    if word.len() > 4 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lexical_embeddings_are_deterministic_and_normalized() {
        let embedder = LexicalEmbedder::new(64).unwrap();
        let a = embedder.embed("Rivers carry sediment to the sea").await.unwrap();
        let b = embedder.embed("Rivers carry sediment to the sea").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_is_closer_than_unrelated_text() {
        let embedder = LexicalEmbedder::new(DEFAULT_LEXICAL_DIMENSION).unwrap();
        let doc = embedder.embed_text("Volcanic eruptions release sulfur dioxide into the stratosphere");
        let related = embedder.embed_text("How much sulfur dioxide do volcanic eruptions release?");
        let unrelated = embedder.embed_text("Quarterly revenue grew in European markets");
        assert!(squared_l2(&doc, &related) < 1.0);
        assert!(squared_l2(&doc, &unrelated) > 1.5);
    }

    #[test]
    fn stopword_only_text_still_embeds() {
        let embedder = LexicalEmbedder::new(32).unwrap();
        let vec = embedder.embed_text("what is the");
        assert!(vec.iter().any(|v| *v != 0.0));
        let punct = embedder.embed_text("???");
        assert!(punct.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn embedding_mode_parsing() {
        assert_eq!(EmbeddingMode::parse("Lexical").unwrap(), EmbeddingMode::Lexical);
        assert_eq!(EmbeddingMode::parse(" remote ").unwrap(), EmbeddingMode::Remote);
        assert!(EmbeddingMode::parse("gpu").is_err());
    }

    #[test]
    fn remote_mode_requires_api_key() {
        let config = EmbeddingConfig::default();
        let Err(err) = EmbeddingModel::from_config(&config) else {
            panic!("expected missing api key to fail");
        };
        assert!(err.to_string().contains("API key"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn model_dispatches_to_lexical_backend() {
        let model = EmbeddingModel::from_config(&EmbeddingConfig::lexical()).unwrap();
        assert_eq!(model.mode(), EmbeddingMode::Lexical);
        assert_eq!(model.dimension(), Some(DEFAULT_LEXICAL_DIMENSION));
        assert_eq!(model.model_id(), "lexical-hash-384");
        let out = model.embed_batch(&["one", "two"]).await.unwrap();
        assert_eq!(out.len(), 2);
    }
}
