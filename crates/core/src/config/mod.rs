//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFGRID_*)
//! 2. TOML config file (if OFFGRID_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFGRID_*)
/// 2. TOML config file (if OFFGRID_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the one live cache generation.
    ///
    /// Changing it is the only way to invalidate everything cached before.
    #[serde(default = "default_generation")]
    pub generation: String,

    /// Path to SQLite cache database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL that relative request and manifest paths resolve against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds. Enforced by the transport only.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Document served to failed navigations with no cache hit.
    ///
    /// Must be listed in `core_resources`.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Human-readable text placed in the synthetic 503 body.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Resources that must be cached for installation to succeed.
    #[serde(default = "default_core_resources")]
    pub core_resources: Vec<String>,

    /// Resources cached at install on a best-effort basis (fonts, styles).
    #[serde(default)]
    pub auxiliary_resources: Vec<String>,

    /// URL fragments marking responses that are written back into the cache.
    #[serde(default = "default_cache_markers")]
    pub cache_markers: Vec<String>,

    /// The background-sync tag this worker responds to.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

fn default_generation() -> String {
    "offgrid-v1.0.0".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offgrid-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_user_agent() -> String {
    "offgrid/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_offline_url() -> String {
    "/offline.html".into()
}

fn default_offline_message() -> String {
    "You are currently offline. Please check your network connection.".into()
}

fn default_core_resources() -> Vec<String> {
    vec!["/".into(), default_offline_url()]
}

fn default_cache_markers() -> Vec<String> {
    ["/assets/", "/icons/", "/api/", ".js", ".css", ".woff", ".woff2"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_sync_tag() -> String {
    "background-sync".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: default_generation(),
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            offline_url: default_offline_url(),
            offline_message: default_offline_message(),
            core_resources: default_core_resources(),
            auxiliary_resources: Vec::new(),
            cache_markers: default_cache_markers(),
            sync_tag: default_sync_tag(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var("OFFGRID_CONFIG_FILE").ok();
        Self::figment(config_file.as_deref()).extract_validated()
    }

    /// Build the layered figment without extracting it.
    pub fn figment(config_file: Option<&str>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(
            Env::prefixed("OFFGRID_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}

trait ExtractValidated {
    fn extract_validated(self) -> Result<AppConfig, ConfigError>;
}

impl ExtractValidated for Figment {
    fn extract_validated(self) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = self.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
