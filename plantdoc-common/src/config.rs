//! Bootstrap configuration loading and data folder resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing or unreadable TOML file is never fatal: the service logs a
//! warning and starts with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the inference API bearer token
pub const INFERENCE_TOKEN_ENV: &str = "PLANTDOC_INFERENCE_TOKEN";

/// Default hosted inference endpoint; the model identifier is appended as a path segment
pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// General-purpose ImageNet classifier used for the first validation pass
pub const DEFAULT_GENERAL_MODEL: &str = "google/vit-base-patch16-224";

/// Plant-disease classifier used for the fallback validation pass and for diagnosis
pub const DEFAULT_PLANT_MODEL: &str =
    "linkanjarad/mobilenet_v2_1.0_224-plant-disease-identification";

/// Bootstrap configuration loaded from TOML
///
/// Every section is optional; absent keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Folder holding the SQLite database (optional)
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Hosted inference settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InferenceConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token (the environment variable takes precedence)
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_general_model")]
    pub general_model: String,

    #[serde(default = "default_plant_model")]
    pub plant_model: String,

    #[serde(default = "default_plant_model")]
    pub disease_model: String,

    /// Retries after the first attempt on a service-unavailable response
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles on every retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            general_model: default_general_model(),
            plant_model: default_plant_model(),
            disease_model: default_plant_model(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_api_base_url() -> String {
    DEFAULT_INFERENCE_BASE_URL.to_string()
}

fn default_general_model() -> String {
    DEFAULT_GENERAL_MODEL.to_string()
}

fn default_plant_model() -> String {
    DEFAULT_PLANT_MODEL.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform default location of the TOML config file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("plantdoc").join("plantdoc-dx.toml"))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Load the TOML config, degrading to compiled defaults when it is missing or invalid
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        warn!("Could not determine config directory, using compiled defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        warn!(
            "Config file not found at {}, using compiled defaults",
            path.display()
        );
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Resolve the data folder: CLI argument, then environment, then TOML, then OS default
pub fn resolve_data_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.data_folder {
        return path.clone();
    }

    default_data_folder()
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("plantdoc"))
        .unwrap_or_else(|| PathBuf::from("./plantdoc_data"))
}

/// Resolve the inference API token from environment, then TOML
///
/// Warns when both sources are set; the environment wins.
pub fn resolve_inference_token(toml_config: &TomlConfig) -> Result<String> {
    let env_token = std::env::var(INFERENCE_TOKEN_ENV)
        .ok()
        .filter(|t| is_valid_key(t));
    let toml_token = toml_config
        .inference
        .api_token
        .as_ref()
        .filter(|t| is_valid_key(t));

    if env_token.is_some() && toml_token.is_some() {
        warn!(
            "Inference token found in both {} and TOML config. Using environment variable.",
            INFERENCE_TOKEN_ENV
        );
    }

    if let Some(token) = env_token {
        info!("Inference token loaded from environment variable");
        return Ok(token);
    }

    if let Some(token) = toml_token {
        info!("Inference token loaded from TOML config");
        return Ok(token.clone());
    }

    Err(Error::Config(format!(
        "Inference API token not configured. Set {} or add api_token under [inference] in the TOML config",
        INFERENCE_TOKEN_ENV
    )))
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
