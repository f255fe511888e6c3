//! Interactive chat loop.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tourbot_rag::{ConversationTurn, RagPipeline, RetrievedMatch};
use tracing::warn;

use crate::render;

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// Nothing but whitespace.
    Empty,
    /// Forget the conversation so far.
    Clear,
    /// Show the sources of the last answer.
    Sources,
    /// Leave the session.
    Quit,
    /// A slash command we do not know.
    Unknown(&'a str),
    /// A question for the assistant.
    Question(&'a str),
}

impl<'a> Input<'a> {
    /// Classify a raw input line.
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line {
            "" => Input::Empty,
            "/clear" => Input::Clear,
            "/sources" => Input::Sources,
            "/quit" | "/exit" | "quit" | "exit" => Input::Quit,
            command if command.starts_with('/') => Input::Unknown(command),
            question => Input::Question(question),
        }
    }
}

/// Conversation state kept by the front end and handed to the pipeline.
#[derive(Debug, Default)]
pub struct Session {
    history: Vec<ConversationTurn>,
}

impl Session {
    /// Turns so far, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Record a completed exchange.
    pub fn record(&mut self, question: &str, answer: &str, matches: Vec<RetrievedMatch>) {
        self.history.push(ConversationTurn::user(question));
        self.history.push(ConversationTurn::assistant(answer, matches));
    }

    /// Sources of the most recent assistant turn.
    pub fn last_sources(&self) -> Option<&[RetrievedMatch]> {
        self.history
            .iter()
            .rev()
            .find(|turn| !turn.matches.is_empty())
            .map(|turn| turn.matches.as_slice())
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

const BANNER: &str = "Meghalaya Tourism Bot. Ask about places, festivals, food or travel tips.\n\
Commands: /sources, /clear, /quit";

/// Run the read-eval-print loop until EOF or `/quit`.
pub async fn run(pipeline: &RagPipeline) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut session = Session::default();
    println!("{BANNER}\n");

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match Input::parse(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Clear => {
                session.clear();
                println!("Conversation cleared.\n");
            }
            Input::Sources => match session.last_sources() {
                Some(sources) => println!("{}\n", render::citations(sources)),
                None => println!("No sources yet.\n"),
            },
            Input::Unknown(command) => {
                println!("Unknown command {command}. Try /sources, /clear or /quit.\n")
            }
            Input::Question(question) => {
                if let Err(e) = editor.add_history_entry(question) {
                    warn!(error = %e, "could not record line history");
                }
                let result = pipeline.process(question, session.history()).await;
                println!("\nbot> {}\n", render::answer(&result));
                session.record(question, &result.answer_text, result.matches);
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
