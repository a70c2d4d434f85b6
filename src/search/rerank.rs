//! Second-stage ordering by cross-encoder relevance.
//!
//! The cross-encoder call itself lives behind [`crate::adapters::Reranker`];
//! this module only merges its scores back into the candidate list.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::{Candidate, ElementId};

/// One relevance score returned by the reranker.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankScore {
    pub id: ElementId,
    pub score: f64,
}

impl RerankScore {
    pub fn new(id: impl Into<ElementId>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Final ordering: rerank score descending, then boosted score descending,
/// then id. Candidates the reranker did not score sort after scored ones.
pub fn by_rerank_score(a: &Candidate, b: &Candidate) -> Ordering {
    let rerank = match (a.rerank_score, b.rerank_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    rerank
        .then_with(|| b.boosted_score.total_cmp(&a.boosted_score))
        .then_with(|| a.id().cmp(b.id()))
}

/// Write reranker scores onto the pool and re-sort it.
///
/// Scores for ids outside the pool are ignored, as are non-finite scores.
/// When the reranker returns an id twice the last score wins.
pub fn apply_rerank(mut pool: Vec<Candidate>, scores: &[RerankScore]) -> Vec<Candidate> {
    let lookup: HashMap<&ElementId, f64> = scores
        .iter()
        .filter(|s| s.score.is_finite())
        .map(|s| (&s.id, s.score))
        .collect();

    for candidate in &mut pool {
        candidate.rerank_score = lookup.get(candidate.id()).copied();
    }
    pool.sort_by(by_rerank_score);
    pool
}
