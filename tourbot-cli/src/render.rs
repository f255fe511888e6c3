//! Terminal rendering of answers and citations.

use std::fmt::Write;

use tourbot_rag::{PipelineOutcome, QueryResult, RetrievedMatch};

/// Numbered source list, one line per match, relevance to two decimals.
pub fn citations(matches: &[RetrievedMatch]) -> String {
    if matches.is_empty() {
        return "No sources were used for this answer.".to_string();
    }

    let mut out = String::from("Sources:");
    for (index, m) in matches.iter().enumerate() {
        let position = index + 1;
        let _ = write!(
            out,
            "\n  {position}. {} ({}) relevance {:.2}",
            m.metadata.display_title(position),
            m.metadata.display_source(),
            m.score
        );
        if let Some(location) = &m.metadata.location {
            let _ = write!(out, ", {location}");
        }
    }
    out
}

/// Answer followed by warnings and citations.
pub fn answer(result: &QueryResult) -> String {
    let mut out = result.answer_text.trim().to_string();

    match result.outcome {
        PipelineOutcome::CompletedDegraded => {
            out.push_str(
                "\n\n(note: the document store was unavailable, \
                 so this answer uses general knowledge only)",
            );
        }
        PipelineOutcome::Failed => {
            out.push_str("\n\n(internal error: please report this)");
        }
        PipelineOutcome::Completed => {}
    }

    if !result.matches.is_empty() {
        out.push_str("\n\n");
        out.push_str(&citations(&result.matches));
    }
    out
}
