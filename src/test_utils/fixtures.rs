use std::path::PathBuf;

use chrono::NaiveDate;
use tempfile::TempDir;

use crate::core::{AudienceLevel, Element, ElementType, Priority};

/// Fluent builder for index elements.
#[derive(Debug, Clone)]
pub struct ElementBuilder {
    element: Element,
}

/// Start a text element in document `doc`.
#[must_use]
pub fn element(id: &str, doc: &str) -> ElementBuilder {
    let mut element = Element::new(id, doc);
    element.doc_title = format!("{doc} manual");
    element.content_text = format!("content of {id}");
    element.source.uri = format!("manuals/{doc}.pdf");
    ElementBuilder { element }
}

/// Start a figure element with an image under `<doc>/<id>.png`.
#[must_use]
pub fn figure(id: &str, doc: &str) -> ElementBuilder {
    let mut builder = element(id, doc).kind(ElementType::Figure);
    builder.element.content_text = String::new();
    builder.element.caption = Some(format!("figure {id}"));
    builder.element.media.media_path = Some(format!("{doc}/{id}.png"));
    builder.element.media.mime_type = Some("image/png".to_string());
    builder
}

impl ElementBuilder {
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.element.content_text = text.to_string();
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: ElementType) -> Self {
        self.element.element_type = kind;
        self
    }

    #[must_use]
    pub fn robot_model(mut self, model: &str) -> Self {
        self.element.robot_model = model.to_string();
        self
    }

    #[must_use]
    pub fn technician(mut self) -> Self {
        self.element.audience_level = AudienceLevel::Technician;
        self
    }

    #[must_use]
    pub fn high_priority(mut self) -> Self {
        self.element.priority = Priority::High;
        self
    }

    #[must_use]
    pub fn effective(mut self, year: i32, month: u32, day: u32) -> Self {
        self.element.effective_date = NaiveDate::from_ymd_opt(year, month, day);
        self
    }

    #[must_use]
    pub fn replaces(mut self, target: &str) -> Self {
        self.element.replaces = Some(target.to_string());
        self
    }

    #[must_use]
    pub fn sha256(mut self, hash: &str) -> Self {
        self.element.media.sha256 = Some(hash.to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> Element {
        self.element
    }
}

/// Test fixture providing isolated filesystem environment.
pub struct UnitTestFixture {
    pub temp_dir: TempDir,
    pub data_path: PathBuf,
}

impl Default for UnitTestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitTestFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_path = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            data_path,
        }
    }

    /// Create a test file with content.
    #[must_use]
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.data_path.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    #[must_use]
    pub fn create_config(&self, content: &str) -> PathBuf {
        self.create_file("robot-rag.toml", content)
    }

    #[must_use]
    pub fn create_policy(&self, content: &str) -> PathBuf {
        self.create_file("policy.yaml", content)
    }
}
