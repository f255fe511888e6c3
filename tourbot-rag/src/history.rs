//! Conversation history held by the caller and the query enhancement that reads it.
//!
//! The pipeline owns no session state. Front ends keep a list of
//! [`ConversationTurn`]s and pass it into every
//! [`RagPipeline::process`](crate::RagPipeline::process) call.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::RetrievedMatch;
use crate::embedding::tokenize;

/// Number of most recent turns included in a summary.
pub const SUMMARY_TURNS: usize = 5;

/// Characters kept from each turn's content in a summary.
pub const SUMMARY_CONTENT_CHARS: usize = 100;

/// Summary used when there is no history.
pub const NO_HISTORY_SUMMARY: &str = "No previous conversation context.";

/// Words suggesting that a question refers back to earlier turns.
pub const ANAPHORIC_MARKERS: [&str; 8] =
    ["that", "this", "it", "there", "those", "above", "mentioned", "earlier"];

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    User,
    /// The tourism assistant.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
    /// When it was said.
    pub timestamp: DateTime<Utc>,
    /// Documents cited by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<RetrievedMatch>,
}

impl ConversationTurn {
    /// A user turn stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            matches: Vec::new(),
        }
    }

    /// An assistant turn stamped with the current time, carrying its citations.
    pub fn assistant(content: impl Into<String>, matches: Vec<RetrievedMatch>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: Utc::now(), matches }
    }
}

/// Whether `query` contains one of [`ANAPHORIC_MARKERS`] as a whole word.
///
/// Markers are compared against whole tokens rather than substrings, so
/// "visit" does not count as "it" and "therefore" does not count as "there".
/// This deliberately departs from a plain substring test.
pub fn refers_to_history(query: &str) -> bool {
    tokenize(query).any(|word| ANAPHORIC_MARKERS.contains(&word.as_str()))
}

/// Compact text summary of the last [`SUMMARY_TURNS`] turns.
///
/// Each turn becomes `"{role}: {content}"` with content cut to
/// [`SUMMARY_CONTENT_CHARS`] characters.
pub fn summarize_recent(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return NO_HISTORY_SUMMARY.to_string();
    }

    let start = history.len().saturating_sub(SUMMARY_TURNS);
    let lines: Vec<String> = history[start..]
        .iter()
        .map(|turn| {
            let content: String = turn.content.chars().take(SUMMARY_CONTENT_CHARS).collect();
            format!("{}: {content}", turn.role)
        })
        .collect();

    format!("Recent conversation:\n{}", lines.join("\n"))
}

/// Rewrite `query` for retrieval when it appears to refer to earlier turns.
///
/// This is a keyword heuristic, not coreference resolution: if the query
/// contains an anaphoric marker word and there is history, the recent-turn
/// summary is prepended so that retrieval sees the topic under discussion.
/// Otherwise the query is returned unchanged.
pub fn enhance_query(query: &str, history: &[ConversationTurn]) -> String {
    if history.is_empty() || !refers_to_history(query) {
        return query.to_string();
    }
    format!("Context: {}\n\nCurrent question: {query}", summarize_recent(history))
}
