//! Application configuration: `<config_dir>/zen/config.toml`, then
//! environment overrides, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use session_store::{default_data_dir, SessionStoreError, DATA_DIR_ENV_VAR};
use tracing::debug;
use zen_pick::config::env_string_opt;
use zen_pick::logging::WRITE_LOG_ENV_VAR;
use zen_pick::{ConfigError, PickerConfig};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZenConfig {
    pub data_dir: Option<PathBuf>,
    pub write_log: Option<PathBuf>,
    pub picker: PickerConfig,
}

impl ZenConfig {
    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `explicit` (which must exist) or the default config file when
    /// present, then applies environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) if explicit.is_some() || path.is_file() => {
                let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                })?;
                debug!(path = %path.display(), "config loaded");
                Self::from_toml_str(&path, &text)?
            }
            _ => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = env_string_opt(WRITE_LOG_ENV_VAR) {
            self.write_log = Some(PathBuf::from(path));
        }
        if let Some(path) = env_string_opt(DATA_DIR_ENV_VAR) {
            self.data_dir = Some(PathBuf::from(path));
        }
        self.picker.apply_env()
    }

    /// `--data-dir`, else the configured directory, else the platform
    /// default.
    pub fn resolve_data_dir(&self, flag: Option<&Path>) -> Result<PathBuf, SessionStoreError> {
        if let Some(dir) = flag.or(self.data_dir.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        default_data_dir()
    }
}

#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("zen").join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::ZenConfig;
    use pretty_assertions::assert_eq;
    use session_store::DATA_DIR_ENV_VAR;
    use std::env;
    use std::path::{Path, PathBuf};
    use std::sync::{Mutex, OnceLock};
    use zen_pick::config::BACKEND_ENV_VAR;
    use zen_pick::logging::WRITE_LOG_ENV_VAR;
    use zen_pick::{BackendMode, ConfigError};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn picker_table_nests_under_picker() {
        let config = ZenConfig::from_toml_str(
            Path::new("config.toml"),
            "data_dir = \"/var/lib/zen\"\n[picker]\nbackend = \"off\"\n",
        )
        .expect("valid toml");
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/zen")));
        assert_eq!(config.picker.backend, BackendMode::Off);
        assert_eq!(config.picker.backend_program, "fzf");
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        let error = ZenConfig::from_toml_str(Path::new("config.toml"), "colour = \"blue\"\n")
            .expect_err("unknown key");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_explicit_config_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = ZenConfig::load(Some(dir.path().join("absent.toml").as_path()))
            .expect_err("explicit path must exist");
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn environment_overrides_file_and_flag_overrides_both() {
        let _lock = env_lock();
        let _g1 = set_env_guard(DATA_DIR_ENV_VAR, Some("/env/data"));
        let _g2 = set_env_guard(WRITE_LOG_ENV_VAR, Some("/tmp/zen.log"));
        let _g3 = set_env_guard(BACKEND_ENV_VAR, None);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/file/data\"\n").expect("config written");

        let config = ZenConfig::load(Some(path.as_path())).expect("config loads");
        assert_eq!(config.data_dir, Some(PathBuf::from("/env/data")));
        assert_eq!(config.write_log, Some(PathBuf::from("/tmp/zen.log")));
        assert_eq!(
            config.resolve_data_dir(None).expect("resolves"),
            PathBuf::from("/env/data")
        );
        assert_eq!(
            config
                .resolve_data_dir(Some(Path::new("/flag/data")))
                .expect("resolves"),
            PathBuf::from("/flag/data")
        );
    }
}
