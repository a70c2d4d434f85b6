//! Query context and hard-filter resolution.

use serde::{Deserialize, Serialize};

use super::element::{AudienceLevel, Element, GENERIC_ROBOT_MODEL};
use crate::error::{RagError, Result};

/// Input to a single retrieval call. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audience_level: Option<AudienceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    robot_model: Option<String>,
}

impl QueryContext {
    /// Build a context, rejecting blank query text.
    pub fn new(query: impl Into<String>) -> Result<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(RagError::InvalidQuery("query text is empty".to_string()));
        }
        Ok(Self {
            query,
            audience_level: None,
            robot_model: None,
        })
    }

    /// Build a context from raw request strings. Blank filters count as
    /// unset; an unknown audience level is rejected.
    pub fn parse(
        query: impl Into<String>,
        audience_level: Option<&str>,
        robot_model: Option<&str>,
    ) -> Result<Self> {
        let audience_level = match audience_level.map(str::trim).filter(|v| !v.is_empty()) {
            Some(raw) => Some(AudienceLevel::parse(raw).ok_or_else(|| {
                RagError::InvalidQuery(format!(
                    "unknown audience_level {raw:?} (expected operator or technician)"
                ))
            })?),
            None => None,
        };
        Ok(Self::new(query)?
            .with_audience_level(audience_level)
            .with_robot_model(robot_model))
    }

    #[must_use]
    pub const fn with_audience_level(mut self, level: Option<AudienceLevel>) -> Self {
        self.audience_level = level;
        self
    }

    /// Blank model strings are treated as unset.
    #[must_use]
    pub fn with_robot_model(mut self, model: Option<impl Into<String>>) -> Self {
        self.robot_model = model
            .map(Into::into)
            .map(|value: String| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub const fn audience_level(&self) -> Option<AudienceLevel> {
        self.audience_level
    }

    pub fn robot_model(&self) -> Option<&str> {
        self.robot_model.as_deref()
    }

    /// Apply the policy defaults to unset filters.
    pub fn resolve(&self, defaults: &FilterDefaults) -> ResolvedFilters {
        ResolvedFilters {
            audience_level: self.audience_level.unwrap_or(defaults.audience_level),
            robot_model: self
                .robot_model
                .clone()
                .unwrap_or_else(|| defaults.robot_model.clone()),
        }
    }
}

/// Values substituted for filters the caller left unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    #[serde(rename = "default_audience_level")]
    pub audience_level: AudienceLevel,
    #[serde(rename = "default_robot_model")]
    pub robot_model: String,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            audience_level: AudienceLevel::Operator,
            robot_model: GENERIC_ROBOT_MODEL.to_string(),
        }
    }
}

/// Hard filters sent to every search branch.
///
/// A filter value also admits its generic fallback: content tagged
/// `generic` applies to every robot model, and operator-level content is
/// valid reading for technicians.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFilters {
    pub audience_level: AudienceLevel,
    pub robot_model: String,
}

impl ResolvedFilters {
    /// Accepted audience levels, requested value first.
    pub fn audience_levels(&self) -> Vec<AudienceLevel> {
        if self.audience_level == AudienceLevel::Operator {
            vec![AudienceLevel::Operator]
        } else {
            vec![self.audience_level, AudienceLevel::Operator]
        }
    }

    /// Accepted robot model tags, requested value first.
    pub fn robot_models(&self) -> Vec<String> {
        if self.robot_model == GENERIC_ROBOT_MODEL {
            vec![self.robot_model.clone()]
        } else {
            vec![self.robot_model.clone(), GENERIC_ROBOT_MODEL.to_string()]
        }
    }

    pub fn accepts(&self, element: &Element) -> bool {
        let audience_ok = element.audience_level == self.audience_level
            || element.audience_level == AudienceLevel::Operator;
        let model_ok = element.robot_model == self.robot_model
            || element.robot_model == GENERIC_ROBOT_MODEL;
        audience_ok && model_ok
    }
}
