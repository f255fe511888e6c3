//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Meghalaya tourism assistant
#[derive(Parser, Debug)]
#[command(name = "tourbot", version, about = "Ask questions about travelling in Meghalaya")]
pub struct Cli {
    /// Configuration file (defaults to ./tourbot.toml when present)
    #[arg(long, global = true, env = "TOURBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Embed locally with the hashing embedder instead of the embedding service
    #[arg(long, global = true)]
    pub offline: bool,

    /// JSON file of documents to ingest before running the command
    #[arg(long, global = true, value_name = "FILE")]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question and print the cited sources
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Interactive chat session
    Chat,
    /// Ingest a JSON array of documents into the configured store
    Ingest {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Validate configuration and report store health
    Check,
}
