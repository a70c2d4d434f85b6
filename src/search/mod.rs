//! Hybrid retrieval policy layer
//!
//! Lexical + text-vector (+ optional image-vector) search, fused with RRF,
//! boosted by priority and recency, reranked by a cross-encoder.

pub mod boost;
pub mod figures;
pub mod fusion;
pub mod orchestrator;
pub mod policy;
pub mod rerank;

pub use boost::{Clock, FixedClock, SystemClock};
pub use fusion::{RrfConfig, fuse};
pub use orchestrator::Retriever;
pub use policy::RetrievalPolicy;
pub use rerank::{RerankScore, apply_rerank};
