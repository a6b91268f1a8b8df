//! Client configuration.

use crate::error::ConfigError;
use crate::model::{Difficulty, GameMode};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const BASE_URL_ENV: &str = "CONTEXTO_BASE_URL";
/// Environment variable overriding [`ClientConfig::mode`].
pub const MODE_ENV: &str = "CONTEXTO_MODE";
/// Environment variable overriding [`ClientConfig::difficulty`].
pub const DIFFICULTY_ENV: &str = "CONTEXTO_DIFFICULTY";

/// Settings for talking to the ranking service.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the ranking service, without a trailing slash.
    #[serde(default = "default_base_url")]
    base_url: String,

    /// Mode requested for every new game.
    #[serde(default)]
    mode: GameMode,

    /// Difficulty requested for every new game.
    #[serde(default)]
    difficulty: Difficulty,

    /// Neighbours requested from the similar-words endpoint.
    #[serde(default = "default_similar_top_k")]
    similar_top_k: u32,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_similar_top_k() -> u32 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mode: GameMode::default(),
            difficulty: Difficulty::default(),
            similar_top_k: default_similar_top_k(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration pointing at `base_url` with default game settings.
    #[instrument(skip(base_url))]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base_url(base_url.into()),
            ..Self::default()
        }
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let mut config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.base_url = trim_base_url(config.base_url);

        info!(base_url = %config.base_url, "Config loaded successfully");
        Ok(config)
    }

    /// Applies `CONTEXTO_*` environment overrides.
    #[instrument(skip(self))]
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`.
    ///
    /// Split out from [`Self::with_env_overrides`] so callers can supply
    /// values without touching the process environment.
    #[instrument(skip(self, lookup))]
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(BASE_URL_ENV) {
            debug!(base_url = %url, "Base URL overridden");
            self.base_url = trim_base_url(url);
        }
        if let Some(mode) = lookup(MODE_ENV) {
            self.mode = mode
                .trim()
                .parse()
                .map_err(|_| ConfigError::new(format!("Unknown game mode: {}", mode)))?;
        }
        if let Some(difficulty) = lookup(DIFFICULTY_ENV) {
            self.difficulty = difficulty
                .trim()
                .parse()
                .map_err(|_| ConfigError::new(format!("Unknown difficulty: {}", difficulty)))?;
        }
        Ok(self)
    }

    /// Replaces the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url.into());
        self
    }

    /// Replaces the mode and difficulty requested for new games.
    pub fn with_game_settings(mut self, mode: GameMode, difficulty: Difficulty) -> Self {
        self.mode = mode;
        self.difficulty = difficulty;
        self
    }
}

fn trim_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
