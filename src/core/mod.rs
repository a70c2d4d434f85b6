//! Data model shared by every retrieval stage.

pub mod candidate;
pub mod element;
pub mod query;
pub mod result;

pub use candidate::{BranchHits, Candidate, SearchHit, by_boosted_score, by_fused_score, tiebreak};
pub use element::{
    AudienceLevel, Category, DocType, Element, ElementId, ElementType, GENERIC_ROBOT_MODEL,
    MediaRef, Priority, SourceLocator,
};
pub use query::{FilterDefaults, QueryContext, ResolvedFilters};
pub use result::{Degradation, ResultSet, ResultStatus};
