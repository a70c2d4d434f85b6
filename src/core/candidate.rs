//! Per-query candidates and the ranked hits they are built from.

use std::cmp::Ordering;

use serde::Serialize;

use super::element::{Element, ElementId};
use crate::error::Branch;

/// One hit from a search branch. Rank 1 is the best hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub element: Element,
    pub rank: u32,
}

impl SearchHit {
    pub const fn new(element: Element, rank: u32) -> Self {
        Self { element, rank }
    }
}

/// Ranked output of one branch, ready for fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchHits {
    pub branch: Branch,
    pub hits: Vec<SearchHit>,
}

impl BranchHits {
    pub const fn new(branch: Branch, hits: Vec<SearchHit>) -> Self {
        Self { branch, hits }
    }

    /// Assign ranks 1..=n in list order.
    pub fn from_ordered(branch: Branch, elements: Vec<Element>) -> Self {
        let hits = elements
            .into_iter()
            .zip(1u32..)
            .map(|(element, rank)| SearchHit::new(element, rank))
            .collect();
        Self { branch, hits }
    }
}

/// An element moving through fuse → boost → rerank.
///
/// Scores are overwritten in place as the candidate advances; a candidate is
/// identified by its element id alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub element: Element,
    pub lexical_rank: Option<u32>,
    pub vector_rank: Option<u32>,
    pub image_vector_rank: Option<u32>,
    pub fused_score: f64,
    pub priority_boost: f64,
    pub recency_boost: f64,
    pub boosted_score: f64,
    pub rerank_score: Option<f64>,
}

impl Candidate {
    pub const fn new(element: Element) -> Self {
        Self {
            element,
            lexical_rank: None,
            vector_rank: None,
            image_vector_rank: None,
            fused_score: 0.0,
            priority_boost: 0.0,
            recency_boost: 0.0,
            boosted_score: 0.0,
            rerank_score: None,
        }
    }

    pub const fn id(&self) -> &ElementId {
        &self.element.id
    }

    pub const fn rank(&self, branch: Branch) -> Option<u32> {
        match branch {
            Branch::Lexical => self.lexical_rank,
            Branch::TextVector => self.vector_rank,
            Branch::ImageVector => self.image_vector_rank,
        }
    }

    /// Record a branch rank, keeping the better one if already set.
    pub fn record_rank(&mut self, branch: Branch, rank: u32) {
        let slot = match branch {
            Branch::Lexical => &mut self.lexical_rank,
            Branch::TextVector => &mut self.vector_rank,
            Branch::ImageVector => &mut self.image_vector_rank,
        };
        *slot = Some(slot.map_or(rank, |existing| existing.min(rank)));
    }

    fn ranks(&self) -> [Option<u32>; 3] {
        [self.lexical_rank, self.vector_rank, self.image_vector_rank]
    }

    /// Number of branches that returned this element.
    pub fn list_count(&self) -> usize {
        self.ranks().iter().flatten().count()
    }

    /// Best rank across branches.
    pub fn min_rank(&self) -> Option<u32> {
        self.ranks().iter().flatten().copied().min()
    }
}

/// Tie-break chain shared by every ranking stage: more lists first, then the
/// lower best rank, then element id.
pub fn tiebreak(a: &Candidate, b: &Candidate) -> Ordering {
    b.list_count()
        .cmp(&a.list_count())
        .then_with(|| {
            let a_min = a.min_rank().unwrap_or(u32::MAX);
            let b_min = b.min_rank().unwrap_or(u32::MAX);
            a_min.cmp(&b_min)
        })
        .then_with(|| a.id().cmp(b.id()))
}

/// Descending by fused score, then [`tiebreak`].
pub fn by_fused_score(a: &Candidate, b: &Candidate) -> Ordering {
    b.fused_score
        .total_cmp(&a.fused_score)
        .then_with(|| tiebreak(a, b))
}

/// Descending by boosted score, then [`tiebreak`].
pub fn by_boosted_score(a: &Candidate, b: &Candidate) -> Ordering {
    b.boosted_score
        .total_cmp(&a.boosted_score)
        .then_with(|| tiebreak(a, b))
}
