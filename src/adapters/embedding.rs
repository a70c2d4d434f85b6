//! Query embeddings from an OpenAI-compatible `/embeddings` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{QueryEmbedder, http};
use crate::error::{RagError, Result};

#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http: Client,
}

impl EmbeddingClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = http::build_client(timeout).map_err(RagError::Config)?;
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl QueryEmbedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = http::endpoint(&self.base_url, "embeddings");
        let body = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };
        let request = http::bearer(self.http.post(&url).json(&body), self.api_key.as_deref());
        let response: EmbeddingResponse = http::send_json(request)
            .await
            .map_err(RagError::EmbeddingUnavailable)?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| RagError::EmbeddingUnavailable("empty embedding response".into()))?;
        debug!(model = %self.model, dims = vector.len(), "query embedded");
        Ok(vector)
    }
}
