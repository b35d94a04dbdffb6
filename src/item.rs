//! Selectable items and their open targets.

use std::path::{Path, PathBuf};

use host_api::{escape_path, BufferHandle, Host};

/// One candidate offered by a fallback prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectableItem {
    FileEntry {
        path: PathBuf,
    },
    BufferEntry {
        handle: BufferHandle,
        display_name: String,
    },
    GitFileEntry {
        path: PathBuf,
    },
}

/// What opening an item asks of the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// Escaped path spec for [`host_api::Documents::edit`].
    Edit(String),
    Buffer(BufferHandle),
}

impl SelectableItem {
    /// Human-readable label; file paths are shown relative to `root`.
    #[must_use]
    pub fn label(&self, root: &Path) -> String {
        match self {
            Self::FileEntry { path } | Self::GitFileEntry { path } => path
                .strip_prefix(root)
                .unwrap_or(path)
                .display()
                .to_string(),
            Self::BufferEntry { display_name, .. } => display_name.clone(),
        }
    }

    #[must_use]
    pub fn open_target(&self) -> OpenTarget {
        match self {
            Self::FileEntry { path } | Self::GitFileEntry { path } => {
                OpenTarget::Edit(escape_path(path))
            }
            Self::BufferEntry { handle, .. } => OpenTarget::Buffer(*handle),
        }
    }

    pub fn open(&self, host: &mut dyn Host) {
        match self.open_target() {
            OpenTarget::Edit(spec) => host.edit(&spec),
            OpenTarget::Buffer(handle) => host.switch_to(handle),
        }
    }
}

/// Display form of a buffer name: relative to `root` when beneath it,
/// `~/`-prefixed when beneath `home`, unchanged otherwise.
#[must_use]
pub fn relativize(name: &str, root: &Path, home: Option<&Path>) -> String {
    let path = Path::new(name);
    if let Ok(relative) = path.strip_prefix(root) {
        if !relative.as_os_str().is_empty() {
            return relative.display().to_string();
        }
    }
    if let Some(home) = home {
        if let Ok(relative) = path.strip_prefix(home) {
            return Path::new("~").join(relative).display().to_string();
        }
    }
    name.to_string()
}
