use crate::error::{QaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use webqa_chunker::ChunkerConfig;
use webqa_search::RetrieverConfig;
use webqa_source::{CleanerConfig, SourceConfig};
use webqa_vector_store::{EmbeddingConfig, EmbeddingMode, IndexPaths, DEFAULT_INDEX_DIR};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "webqa.toml";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding `index.bin` and `metadata.json`
    pub dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_INDEX_DIR),
        }
    }
}

impl IndexConfig {
    #[must_use]
    pub fn paths(&self) -> IndexPaths {
        IndexPaths::in_dir(&self.dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_GENERATION_MODEL.to_string(),
            base_url: webqa_vector_store::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

impl GenerationConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything the pipeline needs, one section per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    pub chunking: ChunkerConfig,
    pub index: IndexConfig,
    pub retrieval: RetrieverConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub source: SourceConfig,
    pub cleaner: CleanerConfig,
}

impl QaConfig {
    /// Explicit file, else `webqa.toml` if present, else defaults; then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            QaError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        let config = Self::from_toml(&raw)
            .map_err(|err| QaError::Config(format!("{}: {err}", path.display())))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| QaError::Config(format!("invalid TOML: {err}")))
    }

    /// Environment overrides; `lookup` returns the value of a variable if set.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(mode) = get("WEBQA_EMBEDDING_MODE") {
            self.embedding.mode =
                EmbeddingMode::parse(&mode).map_err(|err| QaError::Config(err.to_string()))?;
        }
        if let Some(model) = get("WEBQA_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dir) = get("WEBQA_INDEX_DIR") {
            self.index.dir = PathBuf::from(dir);
        }
        if let Some(model) = get("WEBQA_GENERATION_MODEL") {
            self.generation.model = model;
        }
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            self.embedding.base_url.clone_from(&base_url);
            self.generation.base_url = base_url;
        }
        if let Some(api_key) = get("OPENAI_API_KEY") {
            self.embedding.api_key = Some(api_key.clone());
            self.generation.api_key = Some(api_key);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking
            .validate()
            .map_err(|err| QaError::Config(format!("chunking: {err}")))?;
        self.retrieval
            .validate()
            .map_err(|err| QaError::Config(format!("retrieval: {err}")))?;
        if self.embedding.batch_size == 0 {
            return Err(QaError::Config(
                "embedding: batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(QaError::Config(
                "embedding: dimension must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(QaError::Config(format!(
                "generation: temperature must be within 0..=2, got {}",
                self.generation.temperature
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn index_paths(&self) -> IndexPaths {
        self.index.paths()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let config = QaConfig::default();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 80);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.distance_threshold - 1.2).abs() < f32::EPSILON);
        assert_eq!(config.index_paths(), IndexPaths::in_dir(Path::new(".webqa")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = QaConfig::from_toml(
            r#"
            [chunking]
            chunk_size = 300

            [retrieval]
            distance_threshold = 0.9

            [embedding]
            mode = "lexical"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 300);
        assert_eq!(config.chunking.chunk_overlap, 80);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embedding.mode, EmbeddingMode::Lexical);
        assert_eq!(config.generation.model, DEFAULT_GENERATION_MODEL);
    }

    #[test]
    fn unreadable_toml_is_config_error() {
        assert!(matches!(
            QaConfig::from_toml("[chunking\nchunk_size = 1"),
            Err(QaError::Config(_))
        ));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("WEBQA_EMBEDDING_MODE", "lexical"),
            ("WEBQA_INDEX_DIR", "/tmp/webqa-index"),
            ("WEBQA_GENERATION_MODEL", "gpt-4o-mini"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1"),
            ("OPENAI_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();

        let mut config = QaConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.embedding.mode, EmbeddingMode::Lexical);
        assert_eq!(config.index.dir, PathBuf::from("/tmp/webqa-index"));
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert_eq!(config.generation.base_url, "http://localhost:9999/v1");
        assert_eq!(config.embedding.base_url, "http://localhost:9999/v1");
        assert_eq!(config.generation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn bad_environment_mode_is_rejected() {
        let mut config = QaConfig::default();
        let err = config
            .apply_env(|key| (key == "WEBQA_EMBEDDING_MODE").then(|| "quantum".to_string()))
            .unwrap_err();
        assert!(matches!(err, QaError::Config(_)));
    }

    #[test]
    fn validation_rejects_inconsistent_settings() {
        let mut config = QaConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());

        let mut config = QaConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = QaConfig::default();
        config.retrieval.distance_threshold = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_keys_are_never_serialized() {
        let mut config = QaConfig::default();
        config.generation.api_key = Some("sk-secret".to_string());
        config.embedding.api_key = Some("sk-secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("sk-secret"));
    }
}
