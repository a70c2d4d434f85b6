//! In-memory collaborators for driving the orchestrator without services.
//!
//! Each fake returns canned data and can be switched to fail or to stall
//! (for timeout tests under a paused tokio clock).

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::{
    LexicalSearch, QueryEmbedder, RerankInput, Reranker, VectorSearch, VectorSpace,
};
use crate::answer::{AnswerGenerator, Citation};
use crate::core::{Element, ElementId, ResolvedFilters, SearchHit};
use crate::error::{Branch, RagError, Result};
use crate::search::RerankScore;

/// How a fake responds to a call.
#[derive(Debug, Clone, Default)]
pub enum Behavior {
    #[default]
    Respond,
    Fail(String),
    /// Sleep, then respond normally.
    Stall(Duration),
}

impl Behavior {
    async fn run(&self) -> std::result::Result<(), String> {
        match self {
            Self::Respond => Ok(()),
            Self::Fail(reason) => Err(reason.clone()),
            Self::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
        }
    }
}

/// Rank `elements` in order, honoring the filter contract unless disabled.
fn ranked(
    elements: &[Element],
    filters: &ResolvedFilters,
    top_k: usize,
    filter: bool,
) -> Vec<SearchHit> {
    elements
        .iter()
        .filter(|e| !filter || filters.accepts(e))
        .take(top_k)
        .cloned()
        .zip(1u32..)
        .map(|(element, rank)| SearchHit::new(element, rank))
        .collect()
}

#[derive(Debug, Default)]
pub struct FakeLexical {
    elements: Vec<Element>,
    behavior: Behavior,
    apply_filters: bool,
    calls: AtomicUsize,
    last_filters: Mutex<Option<ResolvedFilters>>,
}

impl FakeLexical {
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            apply_filters: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing(reason: &str) -> Self {
        Self::new(Vec::new()).with_behavior(Behavior::Fail(reason.to_string()))
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Return hits regardless of filters, like a misconfigured index.
    #[must_use]
    pub const fn ignoring_filters(mut self) -> Self {
        self.apply_filters = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_filters(&self) -> Option<ResolvedFilters> {
        self.last_filters.lock().ok().and_then(|f| f.clone())
    }
}

#[async_trait]
impl LexicalSearch for FakeLexical {
    async fn search(
        &self,
        _query: &str,
        filters: &ResolvedFilters,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_filters.lock() {
            *last = Some(filters.clone());
        }
        self.behavior
            .run()
            .await
            .map_err(|reason| RagError::search(Branch::Lexical, reason))?;
        Ok(ranked(&self.elements, filters, top_k, self.apply_filters))
    }
}

/// Vector index with independent text and image spaces.
#[derive(Debug, Default)]
pub struct FakeVector {
    text: Vec<Element>,
    image: Vec<Element>,
    text_behavior: Behavior,
    image_behavior: Behavior,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl FakeVector {
    #[must_use]
    pub fn new(text: Vec<Element>) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing(reason: &str) -> Self {
        Self::new(Vec::new()).with_text_behavior(Behavior::Fail(reason.to_string()))
    }

    #[must_use]
    pub fn with_image(mut self, image: Vec<Element>) -> Self {
        self.image = image;
        self
    }

    #[must_use]
    pub fn with_text_behavior(mut self, behavior: Behavior) -> Self {
        self.text_behavior = behavior;
        self
    }

    #[must_use]
    pub fn with_image_behavior(mut self, behavior: Behavior) -> Self {
        self.image_behavior = behavior;
        self
    }

    pub fn calls(&self, space: VectorSpace) -> usize {
        match space {
            VectorSpace::Text => self.text_calls.load(Ordering::SeqCst),
            VectorSpace::Image => self.image_calls.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl VectorSearch for FakeVector {
    async fn search(
        &self,
        space: VectorSpace,
        _vector: &[f32],
        filters: &ResolvedFilters,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        let (elements, behavior, calls, branch) = match space {
            VectorSpace::Text => (
                &self.text,
                &self.text_behavior,
                &self.text_calls,
                Branch::TextVector,
            ),
            VectorSpace::Image => (
                &self.image,
                &self.image_behavior,
                &self.image_calls,
                Branch::ImageVector,
            ),
        };
        calls.fetch_add(1, Ordering::SeqCst);
        behavior
            .run()
            .await
            .map_err(|reason| RagError::search(branch, reason))?;
        Ok(ranked(elements, filters, top_k, true))
    }
}

#[derive(Debug, Default)]
pub struct FakeEmbedder {
    behavior: Behavior,
}

impl FakeEmbedder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing(reason: &str) -> Self {
        Self {
            behavior: Behavior::Fail(reason.to_string()),
        }
    }
}

#[async_trait]
impl QueryEmbedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.behavior
            .run()
            .await
            .map_err(RagError::EmbeddingUnavailable)?;
        Ok(vec![1.0, 0.5, 0.0])
    }
}

/// Scores candidates from a fixed table; ids missing from it are not scored.
#[derive(Debug, Default)]
pub struct FakeReranker {
    scores: HashMap<ElementId, f64>,
    behavior: Behavior,
    seen: Mutex<Vec<RerankInput>>,
}

impl FakeReranker {
    #[must_use]
    pub fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores
                .iter()
                .map(|(id, score)| (ElementId::from(*id), *score))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Inputs received by the last call.
    pub fn seen(&self) -> Vec<RerankInput> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Reranker for FakeReranker {
    async fn score(&self, _query: &str, candidates: &[RerankInput]) -> Result<Vec<RerankScore>> {
        if let Ok(mut seen) = self.seen.lock() {
            *seen = candidates.to_vec();
        }
        self.behavior
            .run()
            .await
            .map_err(RagError::RerankUnavailable)?;
        Ok(candidates
            .iter()
            .filter_map(|c| self.scores.get(&c.id).map(|s| RerankScore::new(c.id.clone(), *s)))
            .collect())
    }
}

/// Answers with the citation ids it was given.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerGenerator for FakeGenerator {
    async fn generate(&self, _query: &str, citations: &[Citation]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior
            .run()
            .await
            .map_err(RagError::AnswerUnavailable)?;
        let ids: Vec<&str> = citations.iter().map(|c| c.citation_id.as_str()).collect();
        Ok(format!("Answer citing {}", ids.join(" ")))
    }

    fn model(&self) -> &str {
        "fake"
    }
}
