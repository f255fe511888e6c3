//! Formatting of retrieved documents into the prompt context block.

use crate::document::RetrievedMatch;

/// Context injected into the prompt when retrieval produced nothing.
///
/// The model sees this text verbatim, so it can say it is answering from
/// general knowledge.
pub const NO_DOCUMENTS_CONTEXT: &str = "No relevant tourism documents found for this query.";

/// Line closing every document block.
pub const DOCUMENT_DELIMITER: &str = "---";

/// Turns ranked matches into a single context string.
///
/// Each match becomes a numbered block:
///
/// ```text
///
/// Document 1 (Source: Meghalaya Tourism, Title: Living Root Bridges, Relevance Score: 0.873):
/// <content>
/// ---
/// ```
///
/// Blocks keep the input order and are joined with a newline. The formatter
/// is a pure function of its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFormatter;

impl ContextFormatter {
    /// Format `matches` into a context block, or [`NO_DOCUMENTS_CONTEXT`] if empty.
    pub fn format(&self, matches: &[RetrievedMatch]) -> String {
        if matches.is_empty() {
            return NO_DOCUMENTS_CONTEXT.to_string();
        }

        matches
            .iter()
            .enumerate()
            .map(|(index, m)| {
                let position = index + 1;
                format!(
                    "\nDocument {position} (Source: {source}, Title: {title}, \
                     Relevance Score: {score:.3}):\n{content}\n{DOCUMENT_DELIMITER}",
                    source = m.metadata.display_source(),
                    title = m.metadata.display_title(position),
                    score = m.score,
                    content = m.content,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
