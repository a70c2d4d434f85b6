//! The output of one retrieval call.

use serde::Serialize;

use super::candidate::Candidate;
use super::query::ResolvedFilters;
use crate::error::Branch;

/// Overall outcome of a retrieval call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Every issued branch answered and reranking ran (or was disabled).
    Complete,
    /// Results are best-effort: a branch or the reranker failed.
    Degraded,
    /// Branches answered but nothing satisfied the hard filters.
    NoEvidence,
    /// Lexical and text-vector search both failed; nothing is returned.
    AllBranchesUnavailable,
}

impl ResultStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "ok",
            Self::Degraded => "degraded",
            Self::NoEvidence => "no_evidence",
            Self::AllBranchesUnavailable => "all_branches_unavailable",
        }
    }
}

/// A recoverable failure absorbed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    SearchUnavailable { branch: String, reason: String },
    RerankSkipped { reason: String },
}

impl Degradation {
    pub fn search(branch: Branch, reason: impl Into<String>) -> Self {
        Self::SearchUnavailable {
            branch: branch.as_str().to_string(),
            reason: reason.into(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::SearchUnavailable { branch, reason } => {
                format!("{} search unavailable ({reason})", branch.replace('_', " "))
            }
            Self::RerankSkipped { reason } => format!("results not reranked ({reason})"),
        }
    }
}

/// Ranked text candidates plus the figures riding along with them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub request_id: String,
    pub query: String,
    pub filters: ResolvedFilters,
    pub status: ResultStatus,
    pub reranked: bool,
    pub degradations: Vec<Degradation>,
    pub text: Vec<Candidate>,
    pub figures: Vec<Candidate>,
    /// Size of the fused ranking before any truncation.
    pub fused_total: usize,
}

impl ResultSet {
    pub fn empty(
        request_id: impl Into<String>,
        query: impl Into<String>,
        filters: ResolvedFilters,
        status: ResultStatus,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            query: query.into(),
            filters,
            status,
            reranked: false,
            degradations: Vec::new(),
            text: Vec::new(),
            figures: Vec::new(),
            fused_total: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.figures.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Human-readable status line; `None` when nothing needs saying.
    pub fn status_note(&self) -> Option<String> {
        match self.status {
            ResultStatus::Complete => None,
            ResultStatus::NoEvidence if self.is_degraded() => Some(format!(
                "no documents matched the query and filters; {}",
                self.degradation_summary()
            )),
            ResultStatus::NoEvidence => {
                Some("no documents matched the query and filters".to_string())
            }
            ResultStatus::AllBranchesUnavailable => {
                Some("search is unavailable: lexical and vector indexes both failed".to_string())
            }
            ResultStatus::Degraded => Some(self.degradation_summary()),
        }
    }

    fn degradation_summary(&self) -> String {
        let parts: Vec<String> = self.degradations.iter().map(Degradation::describe).collect();
        format!("degraded: {}", parts.join("; "))
    }
}
