use std::path::{Path, PathBuf};

use crate::error::SessionStoreError;

pub const DATA_DIR_ENV_VAR: &str = "ZEN_DATA_DIR";
pub const APP_DIR_NAME: &str = "zen";
pub const LAST_FILE_NAME: &str = "last_file";
pub const SNAPSHOT_FILE_NAME: &str = "session.json";

/// `ZEN_DATA_DIR`, else the platform data directory joined with `zen`,
/// else `~/.zen`.
pub fn default_data_dir() -> Result<PathBuf, SessionStoreError> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV_VAR).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(data) = dirs::data_dir() {
        return Ok(data.join(APP_DIR_NAME));
    }
    dirs::home_dir()
        .map(|home| home.join(format!(".{APP_DIR_NAME}")))
        .ok_or(SessionStoreError::NoDataDir)
}

#[must_use]
pub fn last_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LAST_FILE_NAME)
}

#[must_use]
pub fn snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SNAPSHOT_FILE_NAME)
}
