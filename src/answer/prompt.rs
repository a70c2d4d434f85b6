//! Prompt text for the answer generator.

use std::fmt::Write as _;

use super::Citation;

pub const SYSTEM_PROMPT: &str = "You answer strictly from supplied context.";

const INSTRUCTIONS: &str = "You are a robotics support assistant. Answer the user question using \
the provided context. Cite supporting passages in square brackets matching their citation id \
(for example [1]). If you are unsure or the context is insufficient, say so clearly. Keep the \
response concise (2-3 sentences) unless the query requires step-by-step guidance.";

/// User prompt: numbered excerpts, then the question, then instructions.
pub fn build_prompt(query: &str, citations: &[Citation]) -> String {
    let mut context = String::new();
    for (i, citation) in citations.iter().enumerate() {
        if i > 0 {
            context.push('\n');
        }
        let _ = writeln!(
            context,
            "{} Title: {}\nSource: {}\nExcerpt: {}",
            citation.citation_id, citation.doc_title, citation.source_uri, citation.content
        );
    }
    if context.is_empty() {
        context.push_str("No supporting context available.");
    }

    format!("Context:\n{context}\n\nQuestion: {query}\n\nInstructions: {INSTRUCTIONS}")
}
