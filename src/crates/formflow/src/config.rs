//! Configuration management for formflow
//!
//! Supports dual-location configuration:
//! - User-level: ~/.formflow/formflow.toml
//! - Project-level: ./.formflow/formflow.toml
//!
//! Project-level config overrides user-level config.

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    DatabaseConfig, FormflowConfig, LoggingConfig, TasksConfig, ENV_DATABASE_URL, ENV_LOG_LEVEL,
};

use crate::Result;

/// Load configuration from both locations with project config taking precedence
pub async fn load_config() -> Result<FormflowConfig> {
    ConfigLoader::new().load().await
}
