//! Configuration management for runcoachd.
//!
//! Loads settings from a TOML file (or defaults), then applies environment
//! overrides for secrets and deployment-specific values.

use anyhow::Result;
use runcoach_common::{AnalysisConfig, DbLocation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/runcoach/config.toml";

/// Environment variable naming an alternate config file
pub const CONFIG_PATH_ENV: &str = "RUNCOACH_CONFIG";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Origin allowed to make credentialed cross-origin requests
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origin: None,
        }
    }
}

/// Result store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(runcoach_common::store::db::DEFAULT_DB_PATH)
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    pub fn location(&self) -> DbLocation {
        if self.path.as_os_str() == ":memory:" {
            DbLocation::InMemory
        } else if self.path == default_db_path() {
            DbLocation::Default
        } else {
            DbLocation::Custom(self.path.clone())
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Load config from `explicit`, `$RUNCOACH_CONFIG` or the default path,
    /// falling back to defaults, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));

        let mut config = Self::load_from_path(&path).unwrap_or_else(|e| {
            warn!("Config not loaded from {}, using defaults: {}", path.display(), e);
            Config::default()
        });
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ANALYSIS_API_KEY").or_else(|| get("GROQ_API_KEY")) {
            self.analysis.api_key = Some(key);
        }
        if let Some(model) = get("ANALYSIS_MODEL") {
            self.analysis.model = model;
        }
        if let Some(endpoint) = get("ANALYSIS_ENDPOINT") {
            self.analysis.endpoint = endpoint;
        }
        if let Some(origin) = get("ALLOWED_ORIGIN") {
            self.server.allowed_origin = Some(origin);
        }
        if let Some(path) = get("RUNCOACH_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(bind) = get("RUNCOACH_BIND") {
            self.server.bind_addr = bind;
        }
    }
}
