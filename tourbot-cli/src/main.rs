//! `tourbot`: command-line front end for the Meghalaya tourism assistant.

mod app;
mod chat;
mod cli;
mod render;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tourbot_rag::{DocumentStore, NewDocument, Settings};
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("invalid configuration")?;
    telemetry::init(&settings.logging)?;
    info!(
        store = ?settings.store.backend,
        generation_model = %settings.rag.generation_model,
        top_k = settings.rag.top_k,
        offline = cli.offline,
        "starting tourbot"
    );

    let store = app::build_store(&settings, cli.offline).await?;
    seed(&cli, &settings, store.as_ref()).await?;

    match cli.command {
        Commands::Ask { question } => {
            let pipeline = app::build_pipeline(&settings, store)?;
            let result = pipeline.process(&question.join(" "), &[]).await;
            println!("{}", render::answer(&result));
        }
        Commands::Chat => {
            let pipeline = app::build_pipeline(&settings, store)?;
            chat::run(&pipeline).await?;
        }
        Commands::Ingest { file } => {
            let documents = app::load_documents(&file)?;
            let count = app::ingest(store.as_ref(), documents).await?;
            println!("Ingested {count} documents into {}.", store.backend_name());
            if app::is_ephemeral(&settings) {
                warn!("the configured store is in-memory; ingested documents are lost on exit");
            }
        }
        Commands::Check => check(&settings, store).await?,
    }

    Ok(())
}

/// Load `--seed`, or the bundled samples when the store starts empty in memory.
async fn seed(cli: &Cli, settings: &Settings, store: &dyn DocumentStore) -> anyhow::Result<()> {
    let documents: Vec<NewDocument> = match &cli.seed {
        Some(path) => app::load_documents(path)?,
        None if app::is_ephemeral(settings) && !matches!(cli.command, Commands::Ingest { .. }) => {
            app::parse_documents(app::SAMPLE_DOCUMENTS)?
        }
        None => return Ok(()),
    };
    let count = app::ingest(store, documents).await?;
    info!(count, "seeded document store");
    Ok(())
}

async fn check(settings: &Settings, store: Arc<dyn DocumentStore>) -> anyhow::Result<()> {
    let rag = &settings.rag;
    println!("configuration   ok");
    println!("  embedding     {} ({} dims)", rag.embedding_model, rag.embedding_dimensions);
    println!(
        "  generation    {} (temperature {}, max tokens {})",
        rag.generation_model, rag.temperature, rag.max_tokens
    );
    println!("  top k         {}", rag.top_k);
    let api_key = if settings.require_api_key().is_ok() { "set" } else { "missing" };
    println!("  api key       {api_key}");

    store.ping().await.with_context(|| format!("store {} is unreachable", store.backend_name()))?;
    let count = store.count().await?;
    println!("store           {} reachable, {count} documents", store.backend_name());

    let matches = store.search("living root bridges", 1).await?;
    match matches.first() {
        Some(top) => println!(
            "search          ok (top: {}, relevance {:.2})",
            top.metadata.display_title(1),
            top.score
        ),
        None => println!("search          ok (no documents matched)"),
    }
    Ok(())
}
