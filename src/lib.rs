//! robot-rag - hybrid retrieval over robot documentation
//!
//! Lexical and vector search fused with Reciprocal Rank Fusion, boosted by
//! priority and recency, reranked by a cross-encoder, and assembled into
//! citations with the figures of the cited documents.

pub mod adapters;
pub mod answer;
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod search;
pub mod server;
pub mod test_utils;

pub use error::{Branch, RagError, Result};
