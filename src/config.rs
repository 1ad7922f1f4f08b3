//! Configuration for the LearnPal service
//!
//! Settings are layered with the `config` crate:
//! 1. Built-in defaults
//! 2. Optional TOML file (`learnpal.toml` or `--config`)
//! 3. Process environment (`MAX_STREAK_ENTRIES`, `OPENAI_API_KEY`, ...)

use crate::error::{LearnPalError, Result};
use crate::services::LlmConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default bound on tracked wrong-answer streaks
pub const DEFAULT_MAX_STREAK_ENTRIES: usize = 1000;

/// Config file looked up in the working directory when none is given
const DEFAULT_CONFIG_FILE: &str = "learnpal.toml";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Maximum number of (learner, concept) streaks held in memory
    pub max_streak_entries: usize,

    /// SQLite database file
    pub database_path: PathBuf,

    /// OpenAI API key; empty means the text generator is not configured
    #[serde(default)]
    pub openai_api_key: String,

    /// Chat model used for tutor replies
    pub openai_model: String,

    /// Base URL of an OpenAI-compatible API
    pub openai_base_url: String,

    /// Upper bound on a single generation call
    pub llm_timeout_secs: u64,

    /// Max tokens for tutor replies
    pub llm_max_tokens: u32,

    /// HTTP listen address
    pub bind_addr: String,
}

/// Get the default database path using XDG_DATA_HOME standard
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("learnpal")
        .join("learnpal.db")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_streak_entries: DEFAULT_MAX_STREAK_ENTRIES,
            database_path: default_database_path(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            llm_timeout_secs: 10,
            llm_max_tokens: 150,
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional file, and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let file_source = match file {
            // An explicitly named file must exist
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .set_default("max_streak_entries", defaults.max_streak_entries as i64)?
            .set_default(
                "database_path",
                defaults.database_path.to_string_lossy().to_string(),
            )?
            .set_default("openai_api_key", defaults.openai_api_key)?
            .set_default("openai_model", defaults.openai_model)?
            .set_default("openai_base_url", defaults.openai_base_url)?
            .set_default("llm_timeout_secs", defaults.llm_timeout_secs as i64)?
            .set_default("llm_max_tokens", defaults.llm_max_tokens as i64)?
            .set_default("bind_addr", defaults.bind_addr)?
            .add_source(file_source)
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        debug!(
            "Loaded configuration (max_streak_entries={}, model={}, db={})",
            config.max_streak_entries,
            config.openai_model,
            config.database_path.display()
        );
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_streak_entries == 0 {
            return Err(LearnPalError::Config(config::ConfigError::Message(
                "max_streak_entries must be at least 1".to_string(),
            )));
        }
        if self.llm_timeout_secs == 0 {
            return Err(LearnPalError::Config(config::ConfigError::Message(
                "llm_timeout_secs must be at least 1".to_string(),
            )));
        }
        Ok(())
    }

    /// Settings for the text-generation collaborator
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_key: self.openai_api_key.clone(),
            model: self.openai_model.clone(),
            base_url: self.openai_base_url.clone(),
            max_tokens: self.llm_max_tokens,
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }
}
