//! OpenAI-compatible embeddings client.

use crate::embeddings::Embedder;
use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    batch_size: usize,
    /// Learned from the first response
    dimension: OnceLock<usize>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl RemoteEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
        batch_size: usize,
    ) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(VectorStoreError::InvalidInput(
                "missing embedding model name".to_string(),
            ));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| VectorStoreError::InvalidInput("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                VectorStoreError::EmbeddingError(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            batch_size: batch_size.max(1),
            dimension: OnceLock::new(),
        })
    }

    async fn embed_one_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| VectorStoreError::EmbeddingUnavailable(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(classify_status(status, &body));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            VectorStoreError::EmbeddingError(format!("invalid embeddings response: {e}"))
        })?;
        let mut data = parsed.data;
        data.sort_by_key(|item| item.index);
        if data.len() != inputs.len() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "embeddings response has {} vectors for {} inputs",
                data.len(),
                inputs.len()
            )));
        }

        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();
        for vector in &vectors {
            self.check_dimension(vector.len())?;
        }
        Ok(vectors)
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual == 0 {
            return Err(VectorStoreError::EmbeddingError(
                "embedding service returned an empty vector".to_string(),
            ));
        }
        let expected = *self.dimension.get_or_init(|| actual);
        if expected != actual {
            return Err(VectorStoreError::InvalidDimension { expected, actual });
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            log::debug!("Embedding batch of {} texts via {}", batch.len(), self.endpoint);
            out.extend(self.embed_one_batch(batch).await?);
        }
        Ok(out)
    }
}

/// One-line description of a failed HTTP exchange, naming timeouts and refused connections.
pub fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

fn classify_status(status: StatusCode, body: &str) -> VectorStoreError {
    let message = format!("{status}: {}", body.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => VectorStoreError::EmbeddingAuth(message),
        StatusCode::TOO_MANY_REQUESTS => VectorStoreError::EmbeddingQuota(message),
        s if s.is_server_error() => VectorStoreError::EmbeddingUnavailable(message),
        _ => VectorStoreError::EmbeddingError(message),
    }
}
