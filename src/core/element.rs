//! Retrievable document elements as stored in the external indexes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Robot model tag that applies to every model.
pub const GENERIC_ROBOT_MODEL: &str = "generic";

/// Globally unique, re-index stable element identifier.
///
/// Ordering is plain byte-lexicographic and serves as the final ranking
/// tiebreak.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceLevel {
    #[default]
    Operator,
    Technician,
}

impl AudienceLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Technician => "technician",
        }
    }

    /// Parse a user-supplied level, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "operator" => Some(Self::Operator),
            "technician" => Some(Self::Technician),
            _ => None,
        }
    }
}

impl fmt::Display for AudienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    #[default]
    Text,
    Step,
    TableRow,
    Figure,
    Note,
}

impl ElementType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Step => "step",
            Self::TableRow => "table_row",
            Self::Figure => "figure",
            Self::Note => "note",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Pdf,
    Pptx,
    Xlsx,
    Docx,
    Image,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sop,
    Safety,
    Hardware,
    Software,
    Maintenance,
    Troubleshooting,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

/// Where an element lives in its source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocator {
    #[serde(rename = "source_uri", default)]
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

/// Extracted image attached to a figure element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(
        default,
        rename = "image_mime_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
    #[serde(default, rename = "image_width", skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, rename = "image_height", skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, rename = "image_sha256", skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl MediaRef {
    pub fn is_empty(&self) -> bool {
        self.media_path.is_none() && self.image_path.is_none()
    }

    /// Path served to clients, preferring the derived media asset.
    pub fn served_path(&self) -> Option<&str> {
        self.media_path.as_deref().or(self.image_path.as_deref())
    }
}

/// A retrievable unit: paragraph, step, table row, figure or slide note.
///
/// The fixed fields are required by ranking and filtering; anything else the
/// ingestion pipeline attached lands in `extensions` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub doc_id: String,
    #[serde(default)]
    pub doc_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,
    #[serde(default)]
    pub element_type: ElementType,
    #[serde(default)]
    pub content_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default = "default_robot_model")]
    pub robot_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_rev: Option<String>,
    #[serde(default)]
    pub audience_level: AudienceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,
    #[serde(flatten)]
    pub source: SourceLocator,
    #[serde(flatten)]
    pub media: MediaRef,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_json::Value>,
}

fn default_robot_model() -> String {
    GENERIC_ROBOT_MODEL.to_string()
}

impl Element {
    pub fn new(id: impl Into<ElementId>, doc_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            doc_id: doc_id.into(),
            doc_title: String::new(),
            doc_type: None,
            element_type: ElementType::Text,
            content_text: String::new(),
            ocr_text: None,
            caption: None,
            robot_model: default_robot_model(),
            software_version: None,
            hardware_rev: None,
            audience_level: AudienceLevel::Operator,
            category: None,
            priority: Priority::Normal,
            effective_date: None,
            replaces: None,
            source: SourceLocator::default(),
            media: MediaRef::default(),
            extensions: BTreeMap::new(),
        }
    }

    pub fn is_figure(&self) -> bool {
        self.element_type == ElementType::Figure
    }

    /// Best text representation: body, then caption, then OCR output.
    pub fn display_text(&self) -> &str {
        [
            Some(self.content_text.as_str()),
            self.caption.as_deref(),
            self.ocr_text.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or("")
    }
}
