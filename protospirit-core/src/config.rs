use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::{BackendType, DatabaseConfig};
use crate::samples::DEFAULT_EXAMPLE_COUNT;

/// Overrides the config file location
pub const CONFIG_ENV: &str = "PROTOSPIRIT_CONFIG";
/// Overrides `data_path`
pub const DB_ENV: &str = "PROTOSPIRIT_DB";
/// Overrides `default_user`
pub const USER_ENV: &str = "PROTOSPIRIT_USER";

/// Upper bound for generated sample records per entity
const MAX_SAMPLE_COUNT: usize = 50;

/// Application settings read from `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Where projects are stored
    pub data_path: PathBuf,
    /// `yaml` or `sqlite`; inferred from the data path extension when unset
    pub backend: Option<String>,
    /// Seed a demo project into an empty store
    pub seed_demo: bool,
    /// User recorded as `createdBy` and checked for ownership
    pub default_user: String,
    /// Claude CLI executable; auto-detected when unset
    pub claude_path: Option<PathBuf>,
    /// Sample records generated per entity
    pub sample_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            backend: None,
            seed_demo: true,
            default_user: "local".to_string(),
            claude_path: None,
            sample_count: DEFAULT_EXAMPLE_COUNT,
        }
    }
}

fn default_data_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("protospirit")
        .join("projects.yaml")
}

/// Gets the path to the config file
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir()
        .or_else(dirs::home_dir)
        .context("Failed to determine config directory")?;

    Ok(config_dir.join("protospirit").join("config.yaml"))
}

impl AppConfig {
    /// Loads the config from its default location, falling back to defaults
    /// when no file exists, then applies environment overrides
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            debug!("No config at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_overrides(std::env::var(DB_ENV).ok(), std::env::var(USER_ENV).ok());
        Ok(config)
    }

    /// Loads the config from the provided path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Writes the config, creating parent directories as needed
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))
    }

    /// Applies the data path and user overrides; blank values are ignored
    pub fn apply_overrides(&mut self, data_path: Option<String>, user: Option<String>) {
        if let Some(path) = data_path.filter(|p| !p.trim().is_empty()) {
            self.data_path = PathBuf::from(path.trim());
        }
        if let Some(user) = user.filter(|u| !u.trim().is_empty()) {
            self.default_user = user.trim().to_string();
        }
    }

    /// The configured backend, or the one implied by the data path
    pub fn backend_type(&self) -> Result<BackendType> {
        match &self.backend {
            Some(name) => BackendType::parse(name)
                .with_context(|| format!("Unknown backend '{}' (expected yaml or sqlite)", name)),
            None => Ok(BackendType::from_path(&self.data_path)),
        }
    }

    pub fn database_config(&self) -> Result<DatabaseConfig> {
        Ok(DatabaseConfig::new(
            self.data_path.clone(),
            Some(self.backend_type()?),
        ))
    }

    /// Rejects settings the application cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.data_path.as_os_str().is_empty() {
            anyhow::bail!("data_path must not be empty");
        }
        if self.default_user.trim().is_empty() {
            anyhow::bail!("default_user must not be empty");
        }
        if self.sample_count > MAX_SAMPLE_COUNT {
            anyhow::bail!(
                "sample_count {} exceeds the maximum of {}",
                self.sample_count,
                MAX_SAMPLE_COUNT
            );
        }
        self.backend_type()?;
        Ok(())
    }
}
