//! Retrieval orchestration: parallel branch search, fusion, boosting,
//! reranking and figure assembly for one query.
//!
//! Every stage after the branch calls is a pure function over the candidate
//! list; this module only sequences them and absorbs collaborator failures
//! into [`Degradation`] notes.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{Span, debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    LexicalSearch, QueryEmbedder, RerankInput, Reranker, VectorSearch, VectorSpace,
};
use crate::core::{
    BranchHits, Candidate, Degradation, QueryContext, ResolvedFilters, ResultSet, ResultStatus,
    SearchHit, by_fused_score,
};
use crate::error::{Branch, RagError, Result};

use super::boost::{Clock, SystemClock, boost};
use super::figures::assemble_figures;
use super::fusion::{RrfConfig, fuse};
use super::policy::RetrievalPolicy;
use super::rerank::apply_rerank;

/// Composes the search collaborators under a [`RetrievalPolicy`].
///
/// Holds no per-query state, so one instance serves any number of
/// concurrent queries.
#[derive(Clone)]
pub struct Retriever {
    lexical: Arc<dyn LexicalSearch>,
    vector: Arc<dyn VectorSearch>,
    text_embedder: Arc<dyn QueryEmbedder>,
    image_embedder: Option<Arc<dyn QueryEmbedder>>,
    reranker: Option<Arc<dyn Reranker>>,
    policy: RetrievalPolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("image_branch", &self.image_embedder.is_some())
            .field("reranker", &self.reranker.is_some())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    pub fn new(
        lexical: Arc<dyn LexicalSearch>,
        vector: Arc<dyn VectorSearch>,
        text_embedder: Arc<dyn QueryEmbedder>,
        policy: RetrievalPolicy,
    ) -> Self {
        Self {
            lexical,
            vector,
            text_embedder,
            image_embedder: None,
            reranker: None,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Enable the image-vector branch with an embedder for the image space.
    #[must_use]
    pub fn with_image_embedder(mut self, embedder: Arc<dyn QueryEmbedder>) -> Self {
        self.image_embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub const fn policy(&self) -> &RetrievalPolicy {
        &self.policy
    }

    fn image_branch_wanted(&self, query: &str) -> bool {
        self.image_embedder.is_some()
            && self.policy.image_search.enabled
            && self.policy.image_search.triggered_by(query)
    }

    /// Run one retrieval. Collaborator failures never escape: they degrade the
    /// result and are listed on it.
    #[instrument(skip_all, fields(request_id = tracing::field::Empty))]
    pub async fn retrieve(&self, ctx: &QueryContext) -> ResultSet {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let query = ctx.query();
        let filters = ctx.resolve(&self.policy.prefilter);
        let with_images = self.image_branch_wanted(query);
        debug!(
            audience_level = %filters.audience_level,
            robot_model = %filters.robot_model,
            with_images,
            "retrieval started"
        );

        let (lexical, text, image) = tokio::join!(
            self.lexical_branch(query, &filters),
            self.vector_branch(VectorSpace::Text, query, &filters),
            async {
                if with_images {
                    Some(self.vector_branch(VectorSpace::Image, query, &filters).await)
                } else {
                    None
                }
            },
        );

        let mut degradations = Vec::new();
        let mut lists = Vec::with_capacity(3);
        let mut primary_ok = false;
        for (branch, outcome) in [
            (Branch::Lexical, Some(lexical)),
            (Branch::TextVector, Some(text)),
            (Branch::ImageVector, image),
        ] {
            match outcome {
                Some(Ok(hits)) => {
                    primary_ok |= branch != Branch::ImageVector;
                    lists.push(BranchHits::new(branch, enforce_filters(branch, hits, &filters)));
                }
                Some(Err(err)) => {
                    warn!(branch = %branch, error = %err, "search branch unavailable");
                    degradations.push(Degradation::search(branch, failure_reason(&err)));
                }
                None => {}
            }
        }

        if !primary_ok {
            error!("lexical and text-vector search both unavailable");
            let mut result = ResultSet::empty(
                request_id,
                query,
                filters,
                ResultStatus::AllBranchesUnavailable,
            );
            result.degradations = degradations;
            return result;
        }

        let fused = fuse(&lists, &RrfConfig::from(&self.policy.rrf));
        let fused = if self.policy.result.suppress_superseded {
            suppress_superseded(fused)
        } else {
            fused
        };
        let ranked = boost(fused, self.clock.now(), &self.policy.boost);
        let fused_total = ranked.len();
        debug!(fused = fused_total, "fused and boosted");

        let (text_pool, figure_pool): (Vec<Candidate>, Vec<Candidate>) =
            ranked.into_iter().partition(|c| !c.element.is_figure());

        let mut result = ResultSet::empty(request_id, query, filters, ResultStatus::Complete);
        result.fused_total = fused_total;

        if text_pool.is_empty() {
            result.status = ResultStatus::NoEvidence;
            result.degradations = degradations;
            info!(degraded = result.is_degraded(), "no evidence matched the filters");
            return result;
        }

        let (mut text, reranked) = self.rerank_stage(query, text_pool, &mut degradations).await;
        text.truncate(self.policy.result.final_k);

        let mut figures_by_fused = figure_pool;
        figures_by_fused.sort_by(by_fused_score);
        let figures = assemble_figures(&text, &figures_by_fused, self.policy.result.max_figures);

        result.status = if degradations.is_empty() {
            ResultStatus::Complete
        } else {
            ResultStatus::Degraded
        };
        result.reranked = reranked;
        result.degradations = degradations;
        result.text = text;
        result.figures = figures;

        info!(
            status = result.status.as_str(),
            text = result.text.len(),
            figures = result.figures.len(),
            reranked,
            "retrieval complete"
        );
        result
    }

    async fn lexical_branch(
        &self,
        query: &str,
        filters: &ResolvedFilters,
    ) -> Result<Vec<SearchHit>> {
        let top_k = self.policy.candidates.lexical_top_k;
        with_timeout(
            Branch::Lexical,
            self.policy.timeouts.search,
            self.lexical.search(query, filters, top_k),
        )
        .await
    }

    /// Embed then search one vector space; the timeout covers both calls.
    async fn vector_branch(
        &self,
        space: VectorSpace,
        query: &str,
        filters: &ResolvedFilters,
    ) -> Result<Vec<SearchHit>> {
        let (branch, embedder, top_k) = match space {
            VectorSpace::Text => (
                Branch::TextVector,
                Some(&self.text_embedder),
                self.policy.candidates.vector_top_k,
            ),
            VectorSpace::Image => (
                Branch::ImageVector,
                self.image_embedder.as_ref(),
                self.policy.image_search.top_k,
            ),
        };
        let embedder =
            embedder.ok_or_else(|| RagError::search(branch, "no embedder configured"))?;

        with_timeout(branch, self.policy.timeouts.search, async {
            let vector = embedder.embed(query).await?;
            self.vector.search(space, &vector, filters, top_k).await
        })
        .await
    }

    /// Rerank the head of the pool; the tail keeps its boosted order behind it.
    async fn rerank_stage(
        &self,
        query: &str,
        mut pool: Vec<Candidate>,
        degradations: &mut Vec<Degradation>,
    ) -> (Vec<Candidate>, bool) {
        let Some(reranker) = self.reranker.as_ref().filter(|_| self.policy.rerank.enabled) else {
            return (pool, false);
        };

        let tail = pool.split_off(pool.len().min(self.policy.rerank.top_n));
        let inputs: Vec<RerankInput> = pool
            .iter()
            .map(|c| RerankInput {
                id: c.id().clone(),
                text: c.element.display_text().to_string(),
            })
            .collect();

        let timeout = self.policy.timeouts.rerank;
        let outcome = match tokio::time::timeout(timeout, reranker.score(query, &inputs)).await {
            Ok(result) => result,
            Err(_) => Err(RagError::RerankUnavailable(timeout_reason(timeout))),
        };

        match outcome {
            Ok(scores) => {
                debug!(pool = inputs.len(), scores = scores.len(), "reranked");
                let mut ranked = apply_rerank(pool, &scores);
                ranked.extend(tail);
                (ranked, true)
            }
            Err(err) => {
                warn!(error = %err, "rerank skipped");
                degradations.push(Degradation::RerankSkipped {
                    reason: failure_reason(&err),
                });
                pool.extend(tail);
                (pool, false)
            }
        }
    }
}

async fn with_timeout<F>(branch: Branch, timeout: Duration, call: F) -> Result<Vec<SearchHit>>
where
    F: Future<Output = Result<Vec<SearchHit>>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or_else(|_| Err(RagError::search(branch, timeout_reason(timeout))))
}

fn timeout_reason(timeout: Duration) -> String {
    format!("timed out after {}ms", timeout.as_millis())
}

fn failure_reason(err: &RagError) -> String {
    match err {
        RagError::SearchUnavailable { reason, .. }
        | RagError::EmbeddingUnavailable(reason)
        | RagError::RerankUnavailable(reason) => reason.clone(),
        other => other.to_string(),
    }
}

/// Drop hits violating the resolved filters. Adapters are expected to filter
/// already; anything that slips through is logged and removed.
fn enforce_filters(
    branch: Branch,
    mut hits: Vec<SearchHit>,
    filters: &ResolvedFilters,
) -> Vec<SearchHit> {
    let before = hits.len();
    hits.retain(|hit| filters.accepts(&hit.element));
    let dropped = before - hits.len();
    if dropped > 0 {
        warn!(branch = %branch, dropped, "adapter returned hits outside the filters");
    }
    debug!(branch = %branch, hits = hits.len(), "branch hits");
    hits
}

/// Remove candidates that another candidate declares it replaces, matched by
/// element id or document id. Relative order is preserved.
///
/// Two candidates that each name the other keep both: the cycle gives no
/// newer version to prefer.
pub fn suppress_superseded(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let replacers: Vec<(&Candidate, &str)> = candidates
        .iter()
        .filter_map(|c| replaces_target(c).map(|target| (c, target)))
        .collect();
    if replacers.is_empty() {
        return candidates;
    }

    let superseded: HashSet<String> = candidates
        .iter()
        .filter(|c| {
            replacers.iter().any(|(replacer, target)| {
                names(c, target) && !replaces_target(c).is_some_and(|back| names(replacer, back))
            })
        })
        .map(|c| c.id().to_string())
        .collect();
    if superseded.is_empty() {
        return candidates;
    }

    let before = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| !superseded.contains(c.id().as_str()))
        .collect();
    debug!(suppressed = before - kept.len(), "superseded candidates removed");
    kept
}

/// The `replaces` target of a candidate, ignoring blanks and self references.
fn replaces_target(candidate: &Candidate) -> Option<&str> {
    candidate
        .element
        .replaces
        .as_deref()
        .map(str::trim)
        .filter(|target| !target.is_empty() && !names(candidate, target))
}

fn names(candidate: &Candidate, target: &str) -> bool {
    candidate.id().as_str() == target || candidate.element.doc_id == target
}
