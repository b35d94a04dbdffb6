//! Picker configuration: TOML table plus environment overrides.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub const BACKEND_ENV_VAR: &str = "ZEN_PICKER_BACKEND";
pub const BACKEND_PROGRAM_ENV_VAR: &str = "ZEN_PICKER_PROGRAM";
pub const SEARCH_PROGRAM_ENV_VAR: &str = "ZEN_SEARCH_PROGRAM";
pub const SEARCH_TIMEOUT_ENV_VAR: &str = "ZEN_SEARCH_TIMEOUT_SEC";

pub const DEFAULT_BACKEND_PROGRAM: &str = "fzf";
pub const DEFAULT_MAX_RESULTS: usize = 10_000;
pub const DEFAULT_SEARCH_TIMEOUT_SEC: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Whether the rich backend may be probed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Auto,
    Off,
}

impl FromStr for BackendMode {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" | "on" | "1" => Ok(Self::Auto),
            "off" | "none" | "0" => Ok(Self::Off),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Off => "off",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PickerConfig {
    pub backend: BackendMode,
    /// Executable probed on `PATH` for the rich backend.
    pub backend_program: String,
    /// Pins the external search tool; otherwise `rg`, then `grep`.
    pub search_program: Option<String>,
    /// Root-relative path fragments excluded from file enumeration.
    pub ignore_patterns: Vec<String>,
    pub max_results: usize,
    pub search_timeout_sec: u64,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::Auto,
            backend_program: DEFAULT_BACKEND_PROGRAM.to_string(),
            search_program: None,
            ignore_patterns: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
            ],
            max_results: DEFAULT_MAX_RESULTS,
            search_timeout_sec: DEFAULT_SEARCH_TIMEOUT_SEC,
        }
    }
}

impl PickerConfig {
    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_string_opt(BACKEND_ENV_VAR) {
            self.backend = value.parse().map_err(|()| ConfigError::InvalidValue {
                key: BACKEND_ENV_VAR,
                value: value.clone(),
            })?;
        }
        if let Some(program) = env_string_opt(BACKEND_PROGRAM_ENV_VAR) {
            self.backend_program = program;
        }
        if let Some(program) = env_string_opt(SEARCH_PROGRAM_ENV_VAR) {
            self.search_program = Some(program);
        }
        if let Some(value) = env_string_opt(SEARCH_TIMEOUT_ENV_VAR) {
            self.search_timeout_sec = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: SEARCH_TIMEOUT_ENV_VAR,
                    value: value.clone(),
                })?;
        }
        Ok(())
    }
}

pub fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

pub fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
