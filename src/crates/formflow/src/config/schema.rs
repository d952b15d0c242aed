//! Configuration schema for formflow

use crate::error::{FormflowError, Result};
use crate::status::CompletionPolicy;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `database.url`
pub const ENV_DATABASE_URL: &str = "FORMFLOW_DATABASE_URL";

/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "FORMFLOW_LOG_LEVEL";

/// Main formflow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FormflowConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Task listing and status configuration
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL (supports `${VAR}` interpolation)
    pub url: String,

    /// Maximum pool connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://formflow.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,

    /// Log format: "compact" or "pretty"
    pub format: String,

    /// Colored output
    pub colored: bool,

    /// Show timestamps
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            colored: true,
            timestamps: true,
        }
    }
}

/// Task listing and status configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Page size used when the caller does not pick one
    pub default_page_size: u32,

    /// Upper bound for requested page sizes
    pub max_page_size: u32,

    /// `completed_at` handling when a task is completed again
    pub completion_policy: CompletionPolicy,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            completion_policy: CompletionPolicy::PreserveFirst,
        }
    }
}

impl FormflowConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| FormflowError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Resolve environment variables in configuration values
    ///
    /// Supports ${VAR_NAME} syntax in string fields
    pub fn resolve_env_vars(&mut self) {
        self.database.url = Self::expand_env_var(&self.database.url);
    }

    /// Expand environment variable in a string
    fn expand_env_var(value: &str) -> String {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            std::env::var(var_name).unwrap_or_else(|_| value.to_string())
        } else {
            value.to_string()
        }
    }

    /// Apply `FORMFLOW_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|v| !v.is_empty()) {
            self.database.url = url;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Reject values the services cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(FormflowError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.tasks.max_page_size == 0 {
            return Err(FormflowError::Config(
                "tasks.max_page_size must be at least 1".to_string(),
            ));
        }
        let default_size = self.tasks.default_page_size;
        if default_size == 0 || default_size > self.tasks.max_page_size {
            return Err(FormflowError::Config(format!(
                "tasks.default_page_size must be between 1 and {}",
                self.tasks.max_page_size
            )));
        }
        if !matches!(self.logging.format.as_str(), "compact" | "pretty") {
            return Err(FormflowError::Config(format!(
                "unknown logging.format '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}
