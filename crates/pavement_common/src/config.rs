//! Pavement analyzer configuration
//!
//! Configuration lives in `$XDG_CONFIG_HOME/pavement/config.toml`. Every
//! field has a default, so a missing file or a partial file both work.
//!
//! The API key itself is never stored here: the file names the environment
//! variable to read it from, and the entry point resolves it once.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const CONFIG_DIR: &str = "pavement";
const CONFIG_FILE: &str = "config.toml";
const HISTORY_FILE: &str = "assessments.json";

/// Prompt sent alongside every image
pub const DEFAULT_PROMPT: &str = "Analyze this pavement image as a civil engineer. \
Provide assessment in JSON format with these exact keys: \
overall_condition (must be: excellent, good, fair, poor, or critical), \
distress_type (must be: none, transverse, longitudinal, alligator, pothole, or multiple), \
severity_score (0-100), crack_density (0-100), confidence_level (0-100). \
Return only valid JSON, no extra text.";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Vision model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionSettings {
    /// Base URL of the Gemini API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifiers, tried in this order
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Per-attempt HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_prompt")]
    pub prompt: String,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-2.5-pro".to_string(),
        "gemini-2.5-flash".to_string(),
        "gemini-pro".to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            models: default_models(),
            timeout_secs: default_timeout_secs(),
            prompt: default_prompt(),
        }
    }
}

impl VisionSettings {
    /// Read the API key from the configured environment variable.
    /// Empty values count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Assessment history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    /// Override for the history file location
    #[serde(default)]
    pub history_path: Option<PathBuf>,
}

impl StorageSettings {
    pub fn history_path(&self) -> PathBuf {
        self.history_path.clone().unwrap_or_else(default_history_path)
    }
}

/// Complete analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub vision: VisionSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl AnalyzerConfig {
    /// Load from the default location. Missing or unreadable config falls
    /// back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{} - using defaults", e);
                Self::default()
            }
        }
    }

    /// Load from an explicit path; errors are returned, not swallowed
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Write as TOML, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Default assessment history location
pub fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(HISTORY_FILE)
}
