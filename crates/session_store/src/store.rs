use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use host_api::{escape_path, NoticeLevel, SessionHost};
use serde_json::Value;
use tempfile::NamedTempFile;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SessionStoreError;
use crate::paths::{default_data_dir, last_file_path, snapshot_path};
use crate::schema::{ResumeOutcome, SessionSnapshot, SNAPSHOT_VERSION};

pub const SESSION_RESUMED: &str = "Session resumed";
pub const NOTHING_TO_RESUME: &str = "Nothing to resume";

/// The two persisted slots: the last opened document and the layout
/// snapshot. Every write replaces the whole file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
    session_id: String,
}

impl SessionStore {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn open_default() -> Result<Self, SessionStoreError> {
        Ok(Self::new(default_data_dir()?))
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Records `path` as the last opened document. Empty paths are ignored;
    /// failures are logged.
    pub fn save_current(&self, path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }
        if let Err(error) = self.write_last_file(path) {
            warn!(%error, "failed to record last file");
        }
    }

    pub fn write_last_file(&self, path: &Path) -> Result<(), SessionStoreError> {
        let slot = last_file_path(&self.data_dir);
        write_atomic(&slot, path.to_string_lossy().as_bytes())?;
        debug!(slot = %slot.display(), file = %path.display(), "last file recorded");
        Ok(())
    }

    /// Contents of the last-file slot; `None` when absent or empty.
    pub fn read_last_file(&self) -> Result<Option<PathBuf>, SessionStoreError> {
        let slot = last_file_path(&self.data_dir);
        let raw = match fs::read_to_string(&slot) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SessionStoreError::io("reading last file slot", &slot, source)),
        };
        let trimmed = raw.strip_suffix('\n').unwrap_or(&raw);
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(trimmed)))
    }

    /// Captures the host layout and writes the snapshot; failures are logged.
    pub fn save_snapshot(&self, host: &dyn SessionHost) {
        if let Err(error) = self.write_snapshot(host.capture_layout()) {
            warn!(%error, "failed to save session snapshot");
        }
    }

    pub fn write_snapshot(&self, layout: Value) -> Result<PathBuf, SessionStoreError> {
        let path = snapshot_path(&self.data_dir);
        let saved_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(SessionStoreError::ClockFormat)?;
        let cwd = std::env::current_dir()
            .map(|cwd| cwd.display().to_string())
            .unwrap_or_default();
        let snapshot = SessionSnapshot::v1(&self.session_id, saved_at, cwd, layout);
        let payload = serde_json::to_vec_pretty(&snapshot)
            .map_err(|source| SessionStoreError::json_serialize(&path, source))?;
        write_atomic(&path, &payload)?;
        debug!(path = %path.display(), "session snapshot written");
        Ok(path)
    }

    /// Parsed snapshot; `None` when no snapshot file exists.
    pub fn load_snapshot(&self) -> Result<Option<SessionSnapshot>, SessionStoreError> {
        let path = snapshot_path(&self.data_dir);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SessionStoreError::io("reading session snapshot", &path, source)),
        };
        let snapshot: SessionSnapshot = serde_json::from_slice(&raw)
            .map_err(|source| SessionStoreError::json_parse(&path, source))?;
        validate_snapshot(&path, &snapshot)?;
        Ok(Some(snapshot))
    }

    /// Reopens the last document when it is still readable, otherwise
    /// restores the snapshot, otherwise warns.
    pub fn resume_last(&self, host: &mut dyn SessionHost) -> ResumeOutcome {
        match self.read_last_file() {
            Ok(Some(path)) if is_readable_file(&path) => {
                host.edit(&escape_path(&path));
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                host.notify(NoticeLevel::Info, &format!("Resumed: {name}"));
                return ResumeOutcome::ResumedFile(path);
            }
            Ok(Some(path)) => {
                debug!(file = %path.display(), "last file is no longer readable");
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "last file slot unreadable"),
        }

        match self.load_snapshot() {
            Ok(Some(snapshot)) => match host.restore_layout(snapshot.layout) {
                Ok(()) => {
                    host.notify(NoticeLevel::Info, SESSION_RESUMED);
                    ResumeOutcome::RestoredSnapshot
                }
                Err(message) => {
                    warn!(%message, "session layout could not be restored");
                    host.notify(
                        NoticeLevel::Warning,
                        &format!("Cannot restore session: {message}"),
                    );
                    ResumeOutcome::Nothing
                }
            },
            Ok(None) => {
                host.notify(NoticeLevel::Warning, NOTHING_TO_RESUME);
                ResumeOutcome::Nothing
            }
            Err(error) => {
                warn!(%error, "session snapshot unusable");
                host.notify(
                    NoticeLevel::Warning,
                    &format!("Cannot read session snapshot: {error}"),
                );
                ResumeOutcome::Nothing
            }
        }
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

fn validate_snapshot(path: &Path, snapshot: &SessionSnapshot) -> Result<(), SessionStoreError> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SessionStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: snapshot.version,
        });
    }
    if OffsetDateTime::parse(&snapshot.saved_at, &Rfc3339).is_err() {
        return Err(SessionStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            value: snapshot.saved_at.clone(),
        });
    }
    Ok(())
}

/// Writes to a sibling temp file, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), SessionStoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .map_err(|source| SessionStoreError::io("creating data directory", parent, source))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|source| SessionStoreError::io("creating temporary file", parent, source))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|source| SessionStoreError::io("writing temporary file", tmp.path(), source))?;
    tmp.persist(path)
        .map_err(|error| SessionStoreError::io("renaming into place", path, error.error))?;
    Ok(())
}
