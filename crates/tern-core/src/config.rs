//! Configuration management.
//!
//! Loads configuration from ${TERN_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod paths {
    //! Path resolution for configuration files.
    //!
    //! TERN_HOME resolution order:
    //! 1. TERN_HOME environment variable (if set)
    //! 2. ~/.tern (default)

    use std::path::PathBuf;

    /// Returns the tern home directory.
    ///
    /// # Panics
    /// Panics if neither TERN_HOME nor the home directory can be resolved.
    pub fn tern_home() -> PathBuf {
        if let Ok(home) = std::env::var("TERN_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".tern"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        tern_home().join("config.toml")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The model to use.
    pub model: String,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Upper bound on model turns per submission.
    pub max_turns: u32,

    /// Transcript retention cap, in whole messages.
    pub max_history_messages: usize,

    /// Timeout for tool execution in seconds (0 disables).
    pub tool_timeout_secs: u32,

    /// Optional inline system prompt.
    pub system_prompt: Option<String>,

    /// Provider configuration (API key, base URL).
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Writes a default config file at `path` unless one already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("config already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    #[must_use]
    pub fn tool_timeout(&self) -> Option<Duration> {
        if self.tool_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.tool_timeout_secs)))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: crate::core::session::DEFAULT_MODEL.to_string(),
            max_tokens: crate::core::session::DEFAULT_MAX_TOKENS,
            max_turns: crate::core::session::DEFAULT_MAX_TURNS,
            max_history_messages: crate::core::history::DEFAULT_MAX_MESSAGES,
            tool_timeout_secs: 0,
            system_prompt: None,
            providers: ProvidersConfig::default(),
        }
    }
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderConfig,
}

/// Provider configuration entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Optional API key (overrides environment variable).
    pub api_key: Option<String>,
    /// Optional API base URL (for proxies).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Returns the API key if set and non-empty.
    #[must_use]
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Returns the base URL if set and non-empty.
    #[must_use]
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
