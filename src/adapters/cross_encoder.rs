//! Cross-encoder scoring through a text-embeddings-inference `/rerank` route.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{RerankInput, Reranker, http};
use crate::error::{RagError, Result};
use crate::search::rerank::RerankScore;

#[derive(Debug, Clone)]
pub struct CrossEncoderClient {
    base_url: String,
    model: Option<String>,
    api_key: Option<String>,
    http: Client,
}

impl CrossEncoderClient {
    pub fn new(
        base_url: impl Into<String>,
        model: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = http::build_client(timeout).map_err(RagError::Config)?;
        Ok(Self {
            base_url: base_url.into(),
            model,
            api_key,
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    truncate: bool,
}

#[derive(Debug, Deserialize)]
struct IndexedScore {
    index: usize,
    score: f64,
}

#[async_trait]
impl Reranker for CrossEncoderClient {
    async fn score(&self, query: &str, candidates: &[RerankInput]) -> Result<Vec<RerankScore>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let url = http::endpoint(&self.base_url, "rerank");
        let body = RerankRequest {
            query,
            texts: candidates.iter().map(|c| c.text.as_str()).collect(),
            model: self.model.as_deref(),
            truncate: true,
        };
        let request = http::bearer(self.http.post(&url).json(&body), self.api_key.as_deref());
        let response: Vec<IndexedScore> = http::send_json(request)
            .await
            .map_err(RagError::RerankUnavailable)?;

        let scores = map_scores(candidates, response);
        debug!(candidates = candidates.len(), scored = scores.len(), "rerank complete");
        Ok(scores)
    }
}

fn map_scores(candidates: &[RerankInput], response: Vec<IndexedScore>) -> Vec<RerankScore> {
    response
        .into_iter()
        .filter_map(|scored| match candidates.get(scored.index) {
            Some(input) => Some(RerankScore::new(input.id.clone(), scored.score)),
            None => {
                warn!(index = scored.index, "reranker returned out-of-range index");
                None
            }
        })
        .collect()
}
