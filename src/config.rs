use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{LuminaError, Result};

/// Environment variables consulted for the AI API key, in order
pub const API_KEY_VARS: [&str; 3] = ["LUMINA_API_KEY", "GEMINI_API_KEY", "API_KEY"];

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the key-value store
    pub data_dir: PathBuf,

    /// Model identifier sent with every AI request
    pub model: String,

    /// Base URL of the generative API
    pub endpoint: String,

    /// Sampling temperature for AI requests
    pub temperature: f32,

    /// Upper bound on a single AI request (in seconds)
    pub request_timeout_secs: u64,

    /// Idle time before the editor writes a draft (in milliseconds)
    pub autosave_delay_ms: u64,

    /// Maximum serialized size of one stored collection, unlimited when unset
    pub storage_quota_bytes: Option<usize>,

    /// API key, normally supplied through the environment
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("lumina-data"));

        Config {
            data_dir,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.7,
            request_timeout_secs: 60,
            autosave_delay_ms: 1000,
            storage_quota_bytes: None,
            api_key: None,
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, or from the default location when
    /// `path` is `None`, then applies environment overrides.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No configuration file found, using defaults");
                    Config::default()
                }
            },
        };

        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| LuminaError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&raw).map_err(|e| LuminaError::ConfigError {
            message: format!("invalid configuration in {}: {}", path.display(), e),
        })
    }

    /// `<config dir>/lumina/config.json` for the current platform
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    fn apply_env(&mut self) {
        if let Some(key) = API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
        {
            self.api_key = Some(key);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "lumina")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"model": "test-model", "autosave_delay_ms": 250}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.model, "test-model");
        assert_eq!(config.autosave_delay(), Duration::from_millis(250));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(LuminaError::ConfigError { .. })
        ));
    }

    #[test]
    fn api_key_is_never_written_out() {
        let config = Config {
            api_key: Some("secret".to_string()),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
