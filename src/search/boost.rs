//! Deterministic metadata boosts applied to fused candidates.
//!
//! Each candidate is adjusted on its own; the result depends only on the
//! candidate, the policy and the supplied `now`, which makes the stage
//! testable with a frozen clock.

use chrono::{DateTime, NaiveDate, Utc};

use crate::core::{Candidate, Priority, by_boosted_score};

use super::policy::BoostPolicy;

/// Source of "now" for recency scoring.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn priority_boost(priority: Priority, policy: &BoostPolicy) -> f64 {
    match priority {
        Priority::High => policy.priority_high,
        Priority::Normal => 0.0,
    }
}

/// Decreasing logistic curve over document age in days.
///
/// Approaches `recency_max` for brand-new documents and 0 for old ones.
/// Future effective dates count as age 0; a missing date contributes nothing.
pub fn recency_boost(
    effective_date: Option<NaiveDate>,
    now: DateTime<Utc>,
    policy: &BoostPolicy,
) -> f64 {
    let Some(date) = effective_date else {
        return 0.0;
    };
    let age_days = (now.date_naive() - date).num_days().max(0) as f64;
    let exponent = policy.recency_steepness * (age_days - policy.recency_midpoint_days);
    policy.recency_max / (1.0 + exponent.exp())
}

/// Set priority/recency boosts and `boosted_score` on one candidate.
pub fn apply_boost(candidate: &mut Candidate, now: DateTime<Utc>, policy: &BoostPolicy) {
    candidate.priority_boost = priority_boost(candidate.element.priority, policy);
    candidate.recency_boost = recency_boost(candidate.element.effective_date, now, policy);
    candidate.boosted_score =
        candidate.fused_score + candidate.priority_boost + candidate.recency_boost;
}

/// Boost every candidate and re-sort by boosted score.
pub fn boost(
    mut candidates: Vec<Candidate>,
    now: DateTime<Utc>,
    policy: &BoostPolicy,
) -> Vec<Candidate> {
    for candidate in &mut candidates {
        apply_boost(candidate, now, policy);
    }
    candidates.sort_by(by_boosted_score);
    candidates
}
