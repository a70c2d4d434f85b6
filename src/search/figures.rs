//! Figures ride along with their parent document's text hits.
//!
//! A figure does not have to outrank text on its own: if any text element
//! from its document made the final cut, and the figure appeared anywhere in
//! the fused ranking, it is attached to the response.

use std::collections::HashSet;

use crate::core::Candidate;

/// Pick figures for the final text set.
///
/// `fused` is the full pre-truncation ranking in fused order; that order is
/// kept. Figures sharing an image (by hash, then media path) are reported once.
pub fn assemble_figures(
    text: &[Candidate],
    fused: &[Candidate],
    max_figures: usize,
) -> Vec<Candidate> {
    if max_figures == 0 {
        return Vec::new();
    }

    let docs: HashSet<&str> = text.iter().map(|c| c.element.doc_id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();

    fused
        .iter()
        .filter(|c| c.element.is_figure() && docs.contains(c.element.doc_id.as_str()))
        .filter(|c| seen.insert(dedupe_key(c)))
        .take(max_figures)
        .cloned()
        .collect()
}

fn dedupe_key(candidate: &Candidate) -> String {
    let media = &candidate.element.media;
    media
        .sha256
        .clone()
        .or_else(|| media.served_path().map(str::to_string))
        .unwrap_or_else(|| candidate.id().to_string())
}
