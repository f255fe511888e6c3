//! Startup settings resolved from layered configuration sources.
//!
//! Precedence (lowest to highest):
//! 1. Programmatic defaults
//! 2. `tourbot.toml` (or an explicit file)
//! 3. `TOURBOT_*` environment variables, nested with `__` (`TOURBOT_RAG__TOP_K=3`)
//! 4. Flat environment names kept from earlier deployments (`OPENAI_API_KEY`,
//!    `TOP_K_DOCUMENTS`, ...)
//!
//! The result is resolved once and then only read.

use std::fmt;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;
use crate::error::{RagError, Result};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "tourbot.toml";

/// Flat environment names and the settings key each one feeds.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "openai.api_key"),
    ("OPENAI_BASE_URL", "openai.base_url"),
    ("OPENAI_MODEL", "rag.generation_model"),
    ("OPENAI_EMBEDDING_MODEL", "rag.embedding_model"),
    ("TOP_K_DOCUMENTS", "rag.top_k"),
    ("TEMPERATURE", "rag.temperature"),
    ("MAX_TOKENS", "rag.max_tokens"),
    ("DATABASE_URL", "store.database_url"),
];

/// Credentials and endpoint of the OpenAI-compatible API.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Required whenever a remote provider is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL, without a trailing `/embeddings` or `/chat/completions`.
    pub base_url: String,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self { api_key: None, base_url: "https://api.openai.com/v1".to_string() }
    }
}

impl fmt::Debug for OpenAISettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAISettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Which [`DocumentStore`](crate::DocumentStore) variant to build.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Vector search over an in-process store.
    #[default]
    Memory,
    /// Keyword search over an in-process store (degraded mode).
    Text,
    /// Vector search in PostgreSQL with the pgvector extension.
    Pgvector,
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreSettings {
    /// Store variant.
    pub backend: StoreBackend,
    /// Connection string for database backed stores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Table holding the documents.
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            table: "tourism_documents".into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging settings, consumed by the binary that installs the subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (`info`, `tourbot_rag=debug`, ...). `RUST_LOG` wins when set.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Fully resolved application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Pipeline parameters.
    pub rag: RagConfig,
    /// Remote API settings.
    pub openai: OpenAISettings,
    /// Document store settings.
    pub store: StoreSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl Settings {
    /// Resolve settings from all sources, reading `config_file` or [`DEFAULT_CONFIG_FILE`].
    ///
    /// A missing file is not an error; its layer is simply empty.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if a source cannot be parsed or a
    /// value fails validation.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::from_figment(Self::figment(file))
    }

    /// The layered [`Figment`] used by [`load`](Settings::load).
    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed("TOURBOT_").split("__"))
            .merge(legacy_env())
    }

    /// Extract and validate settings from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] on extraction or validation failure.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings =
            figment.extract().map_err(|e| RagError::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        self.rag.validate()?;
        if self.store.backend == StoreBackend::Pgvector && self.store.database_url.is_none() {
            return Err(RagError::Configuration(
                "store.database_url (or DATABASE_URL) is required for the pgvector backend"
                    .to_string(),
            ));
        }
        if self.store.table.trim().is_empty() {
            return Err(RagError::Configuration("store.table must not be empty".to_string()));
        }
        if self.openai.base_url.trim().is_empty() {
            return Err(RagError::Configuration("openai.base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// The API key, or a configuration error when it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if no key is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.openai.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(RagError::Configuration(
                "OPENAI_API_KEY (or openai.api_key) is not set".to_string(),
            )),
        }
    }
}

fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        LEGACY_ENV_KEYS
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
    })
}
