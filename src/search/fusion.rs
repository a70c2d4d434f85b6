//! Reciprocal Rank Fusion across the lexical, text-vector and image-vector
//! branches.
//!
//! Only rank positions enter the score; engine-native scores (BM25, cosine)
//! are not comparable across engines and are dropped before this stage.

use std::collections::HashMap;

use crate::core::{BranchHits, Candidate, ElementId, by_fused_score};
use crate::error::Branch;

use super::policy::RrfPolicy;

/// RRF parameters resolved for one fusion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrfConfig {
    /// K parameter (default: 60)
    pub k: u32,
    pub lexical_weight: f64,
    pub vector_weight: f64,
    pub image_weight: f64,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self::from(&RrfPolicy::default())
    }
}

impl From<&RrfPolicy> for RrfConfig {
    fn from(policy: &RrfPolicy) -> Self {
        Self {
            k: policy.k,
            lexical_weight: policy.lexical_weight,
            vector_weight: policy.vector_weight,
            image_weight: policy.image_weight,
        }
    }
}

impl RrfConfig {
    pub const fn with_k(k: u32) -> Self {
        Self {
            k,
            lexical_weight: 1.0,
            vector_weight: 1.0,
            image_weight: 1.0,
        }
    }

    const fn weight(&self, branch: Branch) -> f64 {
        match branch {
            Branch::Lexical => self.lexical_weight,
            Branch::TextVector => self.vector_weight,
            Branch::ImageVector => self.image_weight,
        }
    }

    /// Contribution of one list position: `weight / (k + rank)`.
    pub fn contribution(&self, branch: Branch, rank: u32) -> f64 {
        self.weight(branch) / (f64::from(self.k) + f64::from(rank))
    }
}

/// Fuse ranked branch lists into one full ranking (no truncation).
///
/// An element missing from a list contributes nothing for that list. Per-branch
/// contributions are summed in a fixed branch order, so the score (and thus the
/// ranking) does not depend on the order the lists are passed in. Ties fall
/// through to [`crate::core::tiebreak`].
pub fn fuse(lists: &[BranchHits], config: &RrfConfig) -> Vec<Candidate> {
    let mut by_id: HashMap<ElementId, Candidate> = HashMap::new();

    for list in lists {
        for hit in &list.hits {
            by_id
                .entry(hit.element.id.clone())
                .or_insert_with(|| Candidate::new(hit.element.clone()))
                .record_rank(list.branch, hit.rank);
        }
    }

    let mut fused: Vec<Candidate> = by_id
        .into_values()
        .map(|mut candidate| {
            candidate.fused_score = fused_score(&candidate, config);
            candidate.boosted_score = candidate.fused_score;
            candidate
        })
        .collect();

    fused.sort_by(by_fused_score);
    fused
}

fn fused_score(candidate: &Candidate, config: &RrfConfig) -> f64 {
    [Branch::Lexical, Branch::TextVector, Branch::ImageVector]
        .into_iter()
        .filter_map(|branch| {
            candidate
                .rank(branch)
                .map(|rank| config.contribution(branch, rank))
        })
        .sum()
}
