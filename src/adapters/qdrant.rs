//! Dense retrieval over a Qdrant collection with named text and image vectors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{VectorSearch, VectorSpace, http};
use crate::config::VectorConfig;
use crate::core::{Element, ResolvedFilters, SearchHit};
use crate::error::{Branch, RagError, Result};

#[derive(Debug, Clone)]
pub struct QdrantClient {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    text_vector: String,
    image_vector: String,
    http: Client,
}

impl QdrantClient {
    pub fn new(config: &VectorConfig, timeout: Duration) -> Result<Self> {
        let http = http::build_client(timeout).map_err(RagError::Config)?;
        Ok(Self {
            base_url: config.url.clone(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
            text_vector: config.text_vector.clone(),
            image_vector: config.image_vector.clone(),
            http,
        })
    }

    fn vector_name(&self, space: VectorSpace) -> &str {
        match space {
            VectorSpace::Text => &self.text_vector,
            VectorSpace::Image => &self.image_vector,
        }
    }
}

const fn branch_for(space: VectorSpace) -> Branch {
    match space {
        VectorSpace::Text => Branch::TextVector,
        VectorSpace::Image => Branch::ImageVector,
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: NamedVector<'a>,
    limit: usize,
    with_payload: bool,
    filter: Value,
}

#[derive(Debug, Serialize)]
struct NamedVector<'a> {
    name: &'a str,
    vector: &'a [f32],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    #[serde(default)]
    payload: Option<serde_json::Map<String, Value>>,
}

/// `must` clauses for the hard filters. A single accepted value uses an
/// exact match; fallbacks widen it to `match.any`.
pub fn filter_clause(filters: &ResolvedFilters) -> Value {
    let audience: Vec<&str> = filters
        .audience_levels()
        .into_iter()
        .map(|level| level.as_str())
        .collect();
    let models = filters.robot_models();
    let models: Vec<&str> = models.iter().map(String::as_str).collect();

    json!({
        "must": [
            field_match("audience_level", &audience),
            field_match("robot_model", &models),
        ]
    })
}

fn field_match(key: &str, values: &[&str]) -> Value {
    match values {
        [single] => json!({"key": key, "match": {"value": single}}),
        _ => json!({"key": key, "match": {"any": values}}),
    }
}

#[async_trait]
impl VectorSearch for QdrantClient {
    async fn search(
        &self,
        space: VectorSpace,
        vector: &[f32],
        filters: &ResolvedFilters,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let branch = branch_for(space);
        let url = http::endpoint(
            &self.base_url,
            &format!("collections/{}/points/search", self.collection),
        );
        let body = SearchRequest {
            vector: NamedVector {
                name: self.vector_name(space),
                vector,
            },
            limit: top_k,
            with_payload: true,
            filter: filter_clause(filters),
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.header("api-key", key);
        }
        let response: SearchResponse = http::send_json(request)
            .await
            .map_err(|reason| RagError::search(branch, reason))?;

        let hits = parse_points(response.result, space);
        debug!(
            collection = %self.collection,
            branch = %branch,
            hits = hits.len(),
            "vector search complete"
        );
        Ok(hits)
    }
}

/// Decode scored points in response order. The point id fills in a missing
/// payload `id`; image-space hits without an attached image are dropped.
fn parse_points(points: Vec<ScoredPoint>, space: VectorSpace) -> Vec<SearchHit> {
    let mut hits = Vec::with_capacity(points.len());
    for point in points {
        let mut payload = point.payload.unwrap_or_default();
        if !payload.contains_key("id") {
            let id = match point.id {
                Value::String(id) => id,
                other => other.to_string(),
            };
            payload.insert("id".to_string(), Value::String(id));
        }

        let element = match serde_json::from_value::<Element>(Value::Object(payload)) {
            Ok(element) => element,
            Err(err) => {
                warn!(error = %err, "skipping malformed vector hit");
                continue;
            }
        };
        if space == VectorSpace::Image && element.media.is_empty() {
            debug!(id = %element.id, "image hit without media dropped");
            continue;
        }

        let rank = u32::try_from(hits.len() + 1).unwrap_or(u32::MAX);
        hits.push(SearchHit { element, rank });
    }
    hits
}
