//! Citation-bearing response assembly and the answer-generation collaborator.
//!
//! "No evidence" and "no answer" are kept apart: when nothing was retrieved
//! the generator is never called, and when evidence exists but no answer
//! could be produced the citations are still returned as citations.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::{Candidate, Degradation, ResultSet};
use crate::error::{RagError, Result};

pub mod chat;
pub mod prompt;

pub use chat::ChatClient;

/// Longest excerpt handed to the generator or shown per citation.
pub const MAX_SNIPPET_CHARS: usize = 1200;

/// Produces a natural-language answer from numbered citations.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str, citations: &[Citation]) -> Result<String>;

    fn model(&self) -> &str;
}

/// One ranked text result, numbered for in-answer references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub citation_id: String,
    pub id: String,
    pub doc_id: String,
    pub doc_title: String,
    pub source_uri: String,
    pub element_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide: Option<u32>,
    pub fused_score: f64,
    pub boosted_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
}

/// A figure riding along with the cited documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FigureRef {
    pub id: String,
    pub doc_id: String,
    pub doc_title: String,
    pub source_uri: String,
    pub caption: String,
    pub media_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerStatus {
    Generated,
    NoEvidenceFound,
    NoAnswerGenerated { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub status: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Answer {
    const fn without_text(status: AnswerStatus) -> Self {
        Self {
            status,
            text: None,
            model: None,
        }
    }
}

/// Number the final text set as `[1]..[n]`. Elements with no displayable
/// text are skipped so every citation carries an excerpt.
pub fn citations(text: &[Candidate]) -> Vec<Citation> {
    text.iter()
        .filter(|c| !c.element.display_text().is_empty())
        .zip(1usize..)
        .map(|(c, n)| {
            let element = &c.element;
            Citation {
                citation_id: format!("[{n}]"),
                id: element.id.to_string(),
                doc_id: element.doc_id.clone(),
                doc_title: element.doc_title.clone(),
                source_uri: element.source.uri.clone(),
                element_type: element.element_type.as_str().to_string(),
                content: snippet(element.display_text()),
                page: element.source.page,
                slide: element.source.slide,
                fused_score: c.fused_score,
                boosted_score: c.boosted_score,
                rerank_score: c.rerank_score,
            }
        })
        .collect()
}

fn snippet(text: &str) -> String {
    text.chars().take(MAX_SNIPPET_CHARS).collect()
}

/// Figure payloads with media URLs under `media_base_url`.
pub fn figure_refs(figures: &[Candidate], media_base_url: &str) -> Vec<FigureRef> {
    figures
        .iter()
        .map(|c| {
            let element = &c.element;
            let caption = element
                .caption
                .as_deref()
                .map(str::trim)
                .filter(|caption| !caption.is_empty())
                .unwrap_or_else(|| element.content_text.trim());
            FigureRef {
                id: element.id.to_string(),
                doc_id: element.doc_id.clone(),
                doc_title: element.doc_title.clone(),
                source_uri: element.source.uri.clone(),
                caption: caption.to_string(),
                media_url: element
                    .media
                    .served_path()
                    .map(|path| media_url(media_base_url, path))
                    .unwrap_or_default(),
                mime_type: element.media.mime_type.clone(),
                width: element.media.width,
                height: element.media.height,
            }
        })
        .collect()
}

fn media_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Run the generator over the citations, mapping every way of not getting
/// an answer onto [`AnswerStatus`].
pub async fn answer(
    generator: Option<&dyn AnswerGenerator>,
    query: &str,
    citations: &[Citation],
    context_results: usize,
    timeout: Duration,
) -> Answer {
    if citations.is_empty() {
        return Answer::without_text(AnswerStatus::NoEvidenceFound);
    }
    let Some(generator) = generator else {
        return Answer::without_text(AnswerStatus::NoAnswerGenerated {
            reason: "answer generation disabled".to_string(),
        });
    };

    let context = &citations[..citations.len().min(context_results.max(1))];
    let outcome = match tokio::time::timeout(timeout, generator.generate(query, context)).await {
        Ok(result) => result,
        Err(_) => Err(RagError::AnswerUnavailable(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    };

    match outcome {
        Ok(text) => {
            info!(model = generator.model(), chars = text.len(), "answer generated");
            Answer {
                status: AnswerStatus::Generated,
                text: Some(text),
                model: Some(generator.model().to_string()),
            }
        }
        Err(err) => {
            warn!(error = %err, "answer generation failed");
            Answer::without_text(AnswerStatus::NoAnswerGenerated {
                reason: err.to_string(),
            })
        }
    }
}

/// JSON body of the query surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub request_id: String,
    pub query: String,
    pub audience_level: String,
    pub robot_model: String,
    /// `ok`, `degraded`, `no_evidence` or `all_branches_unavailable`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub reranked: bool,
    pub degradations: Vec<Degradation>,
    pub citations: Vec<Citation>,
    pub figures: Vec<FigureRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
}

impl QueryResponse {
    pub fn from_results(result: &ResultSet, media_base_url: &str) -> Self {
        Self {
            request_id: result.request_id.clone(),
            query: result.query.clone(),
            audience_level: result.filters.audience_level.to_string(),
            robot_model: result.filters.robot_model.clone(),
            status: result.status.as_str().to_string(),
            note: result.status_note(),
            reranked: result.reranked,
            degradations: result.degradations.clone(),
            citations: citations(&result.text),
            figures: figure_refs(&result.figures, media_base_url),
            answer: None,
        }
    }

    #[must_use]
    pub fn with_answer(mut self, answer: Answer) -> Self {
        self.answer = Some(answer);
        self
    }
}
