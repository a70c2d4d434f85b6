//! Lexical search over a Meilisearch index.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{LexicalSearch, http};
use crate::config::LexicalConfig;
use crate::core::{Element, ResolvedFilters, SearchHit};
use crate::error::{Branch, RagError, Result};

#[derive(Debug, Clone)]
pub struct MeilisearchClient {
    base_url: String,
    index: String,
    api_key: Option<String>,
    http: Client,
}

impl MeilisearchClient {
    pub fn new(config: &LexicalConfig, timeout: Duration) -> Result<Self> {
        let http = http::build_client(timeout).map_err(RagError::Config)?;
        Ok(Self {
            base_url: config.url.clone(),
            index: config.index.clone(),
            api_key: config.api_key.clone(),
            http,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    q: &'a str,
    limit: usize,
    filter: Vec<String>,
    show_ranking_score: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Map<String, Value>>,
}

/// Filter expressions for the hard filters, one `IN` clause per field so
/// each value's generic fallback is admitted.
pub fn filter_expressions(filters: &ResolvedFilters) -> Vec<String> {
    let audience: Vec<&str> = filters
        .audience_levels()
        .into_iter()
        .map(|level| level.as_str())
        .collect();
    vec![
        in_clause("audience_level", audience),
        in_clause(
            "robot_model",
            filters.robot_models().iter().map(String::as_str),
        ),
    ]
}

fn in_clause<'a>(field: &str, values: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|value| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{field} IN [{}]", quoted.join(", "))
}

#[async_trait]
impl LexicalSearch for MeilisearchClient {
    async fn search(
        &self,
        query: &str,
        filters: &ResolvedFilters,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let url = http::endpoint(&self.base_url, &format!("indexes/{}/search", self.index));
        let body = SearchRequest {
            q: query,
            limit: top_k,
            filter: filter_expressions(filters),
            show_ranking_score: true,
        };

        let request = http::bearer(self.http.post(&url).json(&body), self.api_key.as_deref());
        let response: SearchResponse = http::send_json(request)
            .await
            .map_err(|reason| RagError::search(Branch::Lexical, reason))?;

        let hits = parse_hits(response.hits);
        debug!(index = %self.index, hits = hits.len(), "lexical search complete");
        Ok(hits)
    }
}

/// Ranks follow response order. Engine bookkeeping fields (`_rankingScore`,
/// `_formatted`) are dropped before decoding.
fn parse_hits(raw: Vec<Map<String, Value>>) -> Vec<SearchHit> {
    let mut hits = Vec::with_capacity(raw.len());
    for mut doc in raw {
        doc.retain(|key, _| !key.starts_with('_'));
        match serde_json::from_value::<Element>(Value::Object(doc)) {
            Ok(element) => {
                let rank = u32::try_from(hits.len() + 1).unwrap_or(u32::MAX);
                hits.push(SearchHit { element, rank });
            }
            Err(err) => warn!(error = %err, "skipping malformed lexical hit"),
        }
    }
    hits
}
