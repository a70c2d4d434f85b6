//! Clients for the external services the retrieval core orchestrates.
//!
//! The core never holds index state. It only sees these traits, which the
//! HTTP clients below implement for production and
//! [`crate::test_utils::fakes`] implements in memory.
//!
//! Contract shared by both search traits: every returned hit already
//! satisfies the hard filters, hits are ordered best first, and ranks start
//! at 1.

use async_trait::async_trait;

use crate::core::{ElementId, ResolvedFilters, SearchHit};
use crate::error::Result;
use crate::search::rerank::RerankScore;

pub mod cross_encoder;
pub mod embedding;
pub(crate) mod http;
pub mod meilisearch;
pub mod qdrant;

pub use cross_encoder::CrossEncoderClient;
pub use embedding::EmbeddingClient;
pub use meilisearch::MeilisearchClient;
pub use qdrant::QdrantClient;

/// Named vector field in the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorSpace {
    Text,
    Image,
}

/// BM25-family keyword search.
#[async_trait]
pub trait LexicalSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filters: &ResolvedFilters,
        top_k: usize,
    ) -> Result<Vec<SearchHit>>;
}

/// Approximate nearest-neighbour search over one named vector.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search(
        &self,
        space: VectorSpace,
        vector: &[f32],
        filters: &ResolvedFilters,
        top_k: usize,
    ) -> Result<Vec<SearchHit>>;
}

/// Turns query text into a vector for one embedding space.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Text handed to the cross-encoder for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerankInput {
    pub id: ElementId,
    pub text: String,
}

/// Joint query/candidate relevance scoring.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn score(&self, query: &str, candidates: &[RerankInput]) -> Result<Vec<RerankScore>>;
}
