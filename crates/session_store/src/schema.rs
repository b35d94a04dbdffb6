use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk envelope around the host's opaque layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSnapshot {
    pub version: u32,
    pub session_id: String,
    pub saved_at: String,
    pub cwd: String,
    pub layout: Value,
}

impl SessionSnapshot {
    #[must_use]
    pub fn v1(
        session_id: impl Into<String>,
        saved_at: impl Into<String>,
        cwd: impl Into<String>,
        layout: Value,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            session_id: session_id.into(),
            saved_at: saved_at.into(),
            cwd: cwd.into(),
            layout,
        }
    }
}

/// Which branch [`crate::SessionStore::resume_last`] took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    ResumedFile(std::path::PathBuf),
    RestoredSnapshot,
    /// Neither slot usable, or the snapshot was corrupt.
    Nothing,
}

#[cfg(test)]
mod tests {
    use super::SessionSnapshot;
    use serde_json::json;

    #[test]
    fn unknown_envelope_fields_are_rejected() {
        let raw = json!({
            "version": 1,
            "session_id": "s",
            "saved_at": "2026-02-14T00:00:00Z",
            "cwd": "/tmp",
            "layout": {},
            "extra": true,
        });
        assert!(serde_json::from_value::<SessionSnapshot>(raw).is_err());
    }
}
