//! robot-rag query - Run one query from the terminal

use clap::Args;
use console::style;

use crate::answer::{AnswerStatus, QueryResponse};
use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::core::{QueryContext, ResultStatus};
use crate::error::{RagError, Result};

const PREVIEW_CHARS: usize = 240;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Question to retrieve evidence for
    pub text: String,

    /// Audience filter: operator or technician
    #[arg(long)]
    pub audience_level: Option<String>,

    /// Robot model filter (e.g. S50)
    #[arg(long)]
    pub robot_model: Option<String>,

    /// Retrieve only; skip answer generation
    #[arg(long)]
    pub no_answer: bool,
}

pub async fn run(ctx: &AppContext, args: &QueryArgs) -> Result<()> {
    let query = QueryContext::parse(
        args.text.as_str(),
        args.audience_level.as_deref(),
        args.robot_model.as_deref(),
    )?;
    let response = ctx.run_query(&query, !args.no_answer).await;

    if response.status == ResultStatus::AllBranchesUnavailable.as_str()
        && response.citations.is_empty()
    {
        return Err(RagError::AllBranchesUnavailable);
    }

    if ctx.robot_mode {
        let warnings = response.note.iter().cloned().collect();
        emit_robot(&robot_ok(&response).with_warnings(warnings))
    } else {
        emit_human(&render(&response));
        Ok(())
    }
}

fn render(response: &QueryResponse) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&response.query);
    layout.kv(
        "Filters",
        &format!("{} / {}", response.audience_level, response.robot_model),
    );
    let status = match &response.note {
        Some(note) => format!("{} ({note})", response.status),
        None => response.status.clone(),
    };
    layout.kv("Status", &status);
    layout.kv("Reranked", if response.reranked { "yes" } else { "no" });

    if let Some(answer) = &response.answer {
        match (&answer.status, &answer.text) {
            (AnswerStatus::Generated, Some(text)) => {
                layout.blank().section("Answer").push_line(text.as_str());
            }
            (AnswerStatus::NoAnswerGenerated { reason }, _) => {
                layout.kv("Answer", &format!("not generated: {reason}"));
            }
            _ => {
                layout.kv("Answer", "no evidence found");
            }
        }
    }

    if !response.citations.is_empty() {
        layout.blank().section("Citations");
        for citation in &response.citations {
            layout.push_line(format!(
                "{} {} {}",
                style(&citation.citation_id).cyan(),
                style(&citation.doc_title).bold(),
                style(&citation.source_uri).dim()
            ));
            let preview: String = citation.content.chars().take(PREVIEW_CHARS).collect();
            layout.push_line(format!("    {preview}"));
        }
    }

    if !response.figures.is_empty() {
        layout.blank().section("Figures");
        for figure in &response.figures {
            layout.bullet(&format!("{} ({})", figure.caption, figure.media_url));
        }
    }

    layout
}
