//! Retrieval policy: every tunable of the fuse → boost → rerank pipeline.
//!
//! Loaded from YAML. Every key is optional and falls back to the defaults
//! below, so a policy file only needs to name what it changes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::FilterDefaults;
use crate::error::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPolicy {
    pub prefilter: FilterDefaults,
    pub rrf: RrfPolicy,
    pub candidates: CandidatePolicy,
    pub image_search: ImageSearchPolicy,
    pub boost: BoostPolicy,
    pub rerank: RerankPolicy,
    pub result: ResultPolicy,
    pub timeouts: TimeoutPolicy,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            prefilter: FilterDefaults::default(),
            rrf: RrfPolicy::default(),
            candidates: CandidatePolicy::default(),
            image_search: ImageSearchPolicy::default(),
            boost: BoostPolicy::default(),
            rerank: RerankPolicy::default(),
            result: ResultPolicy::default(),
            timeouts: TimeoutPolicy::default(),
        }
    }
}

/// Reciprocal Rank Fusion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrfPolicy {
    /// Smoothing constant (default: 60)
    pub k: u32,
    pub lexical_weight: f64,
    pub vector_weight: f64,
    pub image_weight: f64,
}

impl Default for RrfPolicy {
    fn default() -> Self {
        Self {
            k: 60,
            lexical_weight: 1.0,
            vector_weight: 1.0,
            image_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidatePolicy {
    pub lexical_top_k: usize,
    pub vector_top_k: usize,
}

impl Default for CandidatePolicy {
    fn default() -> Self {
        Self {
            lexical_top_k: 100,
            vector_top_k: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSearchPolicy {
    pub enabled: bool,
    pub top_k: usize,
    /// Case-insensitive substrings that switch the image branch on.
    pub trigger_terms: Vec<String>,
}

impl Default for ImageSearchPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            top_k: 40,
            trigger_terms: [
                "diagram",
                "figure",
                "wiring",
                "port",
                "schematic",
                "image",
                "photo",
                "picture",
                "layout",
                "connector",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ImageSearchPolicy {
    /// Whether the image-vector branch runs for this query text.
    pub fn triggered_by(&self, query: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let lowered = query.to_lowercase();
        self.trigger_terms
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .any(|term| lowered.contains(&term))
    }
}

/// Additive score adjustments applied after fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostPolicy {
    pub priority_high: f64,
    /// Ceiling approached by brand-new documents.
    pub recency_max: f64,
    /// Age in days at which the recency boost is half of `recency_max`.
    pub recency_midpoint_days: f64,
    /// Sigmoid slope per day; larger values make the drop-off sharper.
    pub recency_steepness: f64,
}

impl Default for BoostPolicy {
    fn default() -> Self {
        Self {
            priority_high: 0.15,
            recency_max: 0.10,
            recency_midpoint_days: 180.0,
            recency_steepness: 0.03,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankPolicy {
    pub enabled: bool,
    /// Number of boosted candidates sent to the cross-encoder.
    pub top_n: usize,
}

impl Default for RerankPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            top_n: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultPolicy {
    pub final_k: usize,
    pub max_figures: usize,
    /// Drop elements that another retrieved element declares it replaces.
    pub suppress_superseded: bool,
}

impl Default for ResultPolicy {
    fn default() -> Self {
        Self {
            final_k: 8,
            max_figures: 3,
            suppress_superseded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    #[serde(with = "humantime_serde")]
    pub search: Duration,
    #[serde(with = "humantime_serde")]
    pub rerank: Duration,
    #[serde(with = "humantime_serde")]
    pub answer: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(3),
            rerank: Duration::from_secs(5),
            answer: Duration::from_secs(30),
        }
    }
}

impl RetrievalPolicy {
    /// Load a policy file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|err| RagError::Config(format!("read policy {}: {err}", path.display())))?;
        Self::from_yaml(&raw)
            .map_err(|err| RagError::Config(format!("policy {}: {err}", path.display())))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let policy: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw).map_err(|err| RagError::Config(format!("parse: {err}")))?
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|err| RagError::Serialization(err.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.rrf.k == 0 {
            problems.push("rrf.k must be greater than 0".to_string());
        }
        for (name, weight) in [
            ("rrf.lexical_weight", self.rrf.lexical_weight),
            ("rrf.vector_weight", self.rrf.vector_weight),
            ("rrf.image_weight", self.rrf.image_weight),
            ("boost.priority_high", self.boost.priority_high),
            ("boost.recency_max", self.boost.recency_max),
            ("boost.recency_steepness", self.boost.recency_steepness),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                problems.push(format!("{name} must be a finite non-negative number"));
            }
        }
        if !self.boost.recency_midpoint_days.is_finite() {
            problems.push("boost.recency_midpoint_days must be finite".to_string());
        }
        if self.candidates.lexical_top_k == 0 || self.candidates.vector_top_k == 0 {
            problems.push("candidates top_k values must be greater than 0".to_string());
        }
        if self.result.final_k == 0 {
            problems.push("result.final_k must be greater than 0".to_string());
        }
        if self.rerank.enabled && self.rerank.top_n == 0 {
            problems.push("rerank.top_n must be greater than 0 when rerank is enabled".to_string());
        }
        for (name, timeout) in [
            ("timeouts.search", self.timeouts.search),
            ("timeouts.rerank", self.timeouts.rerank),
            ("timeouts.answer", self.timeouts.answer),
        ] {
            if timeout.is_zero() {
                problems.push(format!("{name} must be non-zero"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RagError::Config(problems.join("; ")))
        }
    }
}
