use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use webqa_chunker::Chunk;
use webqa_vector_store::{SearchHits, VectorIndex};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_DISTANCE_THRESHOLD: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Candidates requested from the index
    pub top_k: usize,
    /// Largest squared distance still counted as relevant
    pub distance_threshold: f32,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

impl RetrieverConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.top_k == 0 {
            return Err("top_k must be at least 1".to_string());
        }
        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err(format!(
                "distance_threshold must be a non-negative number, got {}",
                self.distance_threshold
            ));
        }
        Ok(())
    }
}

/// A chunk that passed the relevance threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    /// Squared Euclidean distance to the query; lower is closer
    pub score: f32,
}

/// Thresholded top-k retrieval over a [`VectorIndex`]
pub struct Retriever {
    index: Arc<VectorIndex>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, config: RetrieverConfig) -> Result<Self> {
        config.validate().map_err(SearchError::InvalidConfig)?;
        Ok(Self { index, config })
    }

    #[must_use]
    pub const fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    #[must_use]
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Relevant chunks for `query`, nearest first. An empty result is not an error.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        self.retrieve_top(query, self.config.top_k).await
    }

    /// Same as [`Self::retrieve`] with an explicit candidate count
    pub async fn retrieve_top(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(SearchError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }

        let hits = self.index.search(query, top_k).await?;
        let candidates = hits.len();
        let results = filter_hits(&hits, self.config.distance_threshold);
        log::debug!(
            "Retrieved {} of {candidates} candidates within distance {}",
            results.len(),
            self.config.distance_threshold
        );
        Ok(results)
    }
}

/// Keep hits whose distance is at most `threshold`, in search order.
#[must_use]
pub fn filter_hits(hits: &SearchHits, threshold: f32) -> Vec<RetrievalResult> {
    hits.iter()
        .filter(|(_, distance)| *distance <= threshold)
        .map(|(chunk, distance)| RetrievalResult {
            chunk: chunk.clone(),
            score: distance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation() {
        assert!(RetrieverConfig::default().validate().is_ok());

        let zero = RetrieverConfig {
            top_k: 0,
            ..RetrieverConfig::default()
        };
        assert!(zero.validate().is_err());

        for threshold in [-0.1, f32::NAN, f32::INFINITY] {
            let bad = RetrieverConfig {
                distance_threshold: threshold,
                ..RetrieverConfig::default()
            };
            assert!(bad.validate().is_err(), "{threshold} accepted");
        }
    }
}
