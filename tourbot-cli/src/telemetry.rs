//! Tracing subscriber setup for the CLI.
//!
//! `RUST_LOG` takes precedence over `logging.level`. Logs go to stderr so that
//! answers on stdout stay clean.

use anyhow::Context;
use tourbot_rag::{LogFormat, LoggingSettings};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn filter(settings: &LoggingSettings) -> anyhow::Result<EnvFilter> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(EnvFilter::from_default_env());
    }
    EnvFilter::try_new(&settings.level)
        .with_context(|| format!("invalid logging.level '{}'", settings.level))
}

/// Install the global subscriber. Call once at startup.
pub fn init(settings: &LoggingSettings) -> anyhow::Result<()> {
    let filter = filter(settings)?;
    let registry = tracing_subscriber::registry().with(filter);

    match settings.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    }
    .context("failed to install tracing subscriber")
}
