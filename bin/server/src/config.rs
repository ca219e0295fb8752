//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables.

use serde::Deserialize;
use stepwise_ai::LlmBackendConfig;
use stepwise_conversation::context::DEFAULT_MAX_HISTORY;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// LLM backend configuration.
    pub llm: LlmBackendConfig,

    /// Context window configuration.
    #[serde(default)]
    pub context: ContextConfig,
}

/// Context-window-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Upper bound on log messages included in one model invocation.
    /// Bounds request cost and respects the model's context limits.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
