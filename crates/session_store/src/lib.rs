//! Last-file slot and layout snapshot persistence.

mod error;
mod paths;
mod schema;
mod store;

pub use error::SessionStoreError;
pub use paths::{
    default_data_dir, last_file_path, snapshot_path, DATA_DIR_ENV_VAR, LAST_FILE_NAME,
    SNAPSHOT_FILE_NAME,
};
pub use schema::{ResumeOutcome, SessionSnapshot, SNAPSHOT_VERSION};
pub use store::{SessionStore, NOTHING_TO_RESUME, SESSION_RESUMED};
