#![doc = include_str!("../README.md")]

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the audit log file.
pub const LOG_FILE_ENV: &str = "TX_LOG_FILE";
/// Environment variable enabling the unused-key audit.
pub const LOG_UNUSED_ENV: &str = "TX_LOG_UNUSED";
/// Name of the configuration file looked up in a directory.
pub const CONFIG_FILE_NAME: &str = "tx.toml";
/// Default hot-reload debounce interval.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum TxConfigError {
    /// Configuration file not found.
    #[error("tx.toml configuration file not found")]
    NotFound,
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// The configuration for a txlib engine.
///
/// ```toml
/// primary_culture = "en"
/// dictionary_dir = "lang"
/// file_prefix = "app"
/// watch = true
/// debounce_ms = 2000
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TxConfig {
    /// Culture tried after the current culture and its language.
    pub primary_culture: Option<String>,
    /// Directory scanned for dictionary files, relative to the config file.
    pub dictionary_dir: Option<PathBuf>,
    /// Only load `{prefix}.xml` and `{prefix}.{culture}.xml` from the directory.
    pub file_prefix: Option<String>,
    /// Reload dictionary files when they change on disk.
    pub watch: bool,
    /// Quiet period before a reload, in milliseconds.
    pub debounce_ms: u64,
    /// Append unresolved-text events to this file.
    pub log_file: Option<PathBuf>,
    /// Report primary-culture keys that were never requested.
    pub log_unused_keys: bool,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            primary_culture: None,
            dictionary_dir: None,
            file_prefix: None,
            watch: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            log_file: None,
            log_unused_keys: false,
        }
    }
}

impl TxConfig {
    /// Reads the configuration from a path.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TxConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TxConfigError::NotFound);
        }

        let content = fs_err::read_to_string(path)?;
        let config: TxConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// Reads `tx.toml` from a directory.
    pub fn read_from_dir(dir: &Path) -> Result<Self, TxConfigError> {
        Self::read_from_path(dir.join(CONFIG_FILE_NAME))
    }

    /// Returns the dictionary directory resolved against `base_dir`.
    pub fn dictionary_dir_from_base(&self, base_dir: &Path) -> Option<PathBuf> {
        self.dictionary_dir.as_ref().map(|dir| base_dir.join(dir))
    }

    /// Applies the process-level environment overrides.
    ///
    /// `TX_LOG_FILE` sets the log file; `TX_LOG_UNUSED` enables the unused-key
    /// audit. A value of `TX_LOG_UNUSED` that is not a boolean is logged and
    /// ignored.
    pub fn apply_env(mut self) -> Self {
        if let Some(path) = env::var_os(LOG_FILE_ENV).filter(|value| !value.is_empty()) {
            self.log_file = Some(PathBuf::from(path));
        }

        if let Ok(value) = env::var(LOG_UNUSED_ENV) {
            match parse_bool(&value) {
                Some(enabled) => self.log_unused_keys = enabled,
                None => tracing::warn!(
                    "Ignoring {}: '{}' is not a boolean value",
                    LOG_UNUSED_ENV,
                    value
                ),
            }
        }

        self
    }

    /// Returns the debounce interval as a `Duration`.
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

/// Parses the boolean spellings accepted in configuration and dictionary files.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
