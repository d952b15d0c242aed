//! Configuration loader with dual-location support
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: ~/.formflow/formflow.toml
//! 3. Project-level config: ./.formflow/formflow.toml
//!
//! Later files override earlier ones key by key, then `${VAR}` references
//! are expanded and `FORMFLOW_*` environment overrides applied.

use crate::config::schema::FormflowConfig;
use crate::error::{FormflowError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_DIR: &str = ".formflow";
const CONFIG_FILE: &str = "formflow.toml";

/// Configuration loader that handles both user and project configs
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader for the standard locations
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            project_config_path: Self::project_config_path(),
        }
    }

    /// Loader reading explicit paths
    pub fn with_paths(user_config_path: Option<PathBuf>, project_config_path: PathBuf) -> Self {
        Self {
            user_config_path,
            project_config_path,
        }
    }

    /// User-level config path (~/.formflow/formflow.toml), if there is a home directory
    fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Project-level config path (./.formflow/formflow.toml)
    fn project_config_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_default()
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Load configuration from both locations with project taking precedence
    pub async fn load(&self) -> Result<FormflowConfig> {
        let mut merged = toml::Table::new();
        info!("Loading configuration with defaults");

        let locations = self
            .user_config_path
            .iter()
            .map(|p| ("user", p.as_path()))
            .chain(std::iter::once(("project", self.project_config_path.as_path())));

        for (scope, path) in locations {
            match Self::load_table(path).await? {
                Some(table) => {
                    debug!(scope, path = %path.display(), "Loaded config file");
                    merge_tables(&mut merged, table);
                }
                None => {
                    debug!(scope, path = %path.display(), "Config file not found");
                }
            }
        }

        let mut config: FormflowConfig = toml::Value::Table(merged)
            .try_into()
            .map_err(|e| FormflowError::Config(format!("Invalid configuration: {}", e)))?;

        config.resolve_env_vars();
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load and fully resolve a single file
    pub async fn load_file(path: &Path) -> Result<FormflowConfig> {
        let table = Self::load_table(path).await?.ok_or_else(|| {
            FormflowError::Config(format!("Config file not found: {}", path.display()))
        })?;
        let mut config: FormflowConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e| FormflowError::Config(format!("Invalid configuration: {}", e)))?;
        config.resolve_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Parsed TOML table at `path`; `None` when the file does not exist
    async fn load_table(path: &Path) -> Result<Option<toml::Table>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| FormflowError::Config(format!("Failed to read config: {}", e)))?;
        let table = content.parse::<toml::Table>().map_err(|e| {
            FormflowError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(table))
    }

    pub fn get_user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn get_project_config_path(&self) -> &Path {
        &self.project_config_path
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively merge `overlay` into `base`; overlay values win
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
