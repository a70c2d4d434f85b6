//! Error types for robot-rag.
//!
//! Adapter failures are ordinary values of [`RagError`]. The retrieval
//! orchestrator catches them at its boundary and turns them into degradation
//! notes on the result set; only configuration, I/O and request validation
//! errors ever reach a caller.

use std::fmt;

use thiserror::Error;

/// Which retrieval branch produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    Lexical,
    TextVector,
    ImageVector,
}

impl Branch {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::TextVector => "text_vector",
            Self::ImageVector => "image_vector",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("{branch} search unavailable: {reason}")]
    SearchUnavailable { branch: Branch, reason: String },

    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("reranker unavailable: {0}")]
    RerankUnavailable(String),

    #[error("answer generation unavailable: {0}")]
    AnswerUnavailable(String),

    #[error("all retrieval branches unavailable")]
    AllBranchesUnavailable,
}

impl RagError {
    pub fn search(branch: Branch, reason: impl Into<String>) -> Self {
        Self::SearchUnavailable {
            branch,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code used in robot output and HTTP error bodies.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::MissingConfig(_) => "missing_config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::InvalidQuery(_) => "invalid_query",
            Self::SearchUnavailable { .. } => "search_unavailable",
            Self::EmbeddingUnavailable(_) => "embedding_unavailable",
            Self::RerankUnavailable(_) => "rerank_unavailable",
            Self::AnswerUnavailable(_) => "answer_unavailable",
            Self::AllBranchesUnavailable => "all_branches_unavailable",
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
