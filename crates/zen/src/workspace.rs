//! In-memory documents, cursor, recent history and the last match list.

use std::fs;
use std::path::{Path, PathBuf};

use host_api::{BufferHandle, BufferInfo, SearchMatch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

pub const RECENT_LIMIT: usize = 50;
pub const SCRATCH_NAME: &str = "[Scratch]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer {
    pub handle: BufferHandle,
    /// `None` for unnamed and scratch documents.
    pub path: Option<PathBuf>,
    pub lines: Vec<String>,
    /// 1-based line and column.
    pub cursor: (usize, usize),
    pub loaded: bool,
    pub listed: bool,
    pub scratch: bool,
}

impl Buffer {
    #[must_use]
    pub fn name(&self) -> String {
        match (&self.path, self.scratch) {
            (Some(path), _) => path.display().to_string(),
            (None, true) => SCRATCH_NAME.to_string(),
            (None, false) => String::new(),
        }
    }

    #[must_use]
    pub fn short_name(&self) -> String {
        match &self.path {
            Some(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            None if self.scratch => SCRATCH_NAME.to_string(),
            None => "[No Name]".to_string(),
        }
    }

    fn info(&self) -> BufferInfo {
        BufferInfo {
            handle: self.handle,
            name: self.name(),
            loaded: self.loaded,
            listed: self.listed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchList {
    pub title: String,
    pub matches: Vec<SearchMatch>,
}

/// Serialized form handed to the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    pub documents: Vec<LayoutDocument>,
    /// Index into `documents`.
    pub current: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutDocument {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Default)]
pub struct Workspace {
    buffers: Vec<Buffer>,
    current: Option<BufferHandle>,
    next_handle: u64,
    recent: Vec<PathBuf>,
    matches: Option<MatchList>,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> BufferHandle {
        self.next_handle += 1;
        BufferHandle(self.next_handle)
    }

    /// Opens `path` (absolute) into the current view, reusing an existing
    /// buffer. A missing file becomes a new empty document.
    pub fn open_path(&mut self, path: &Path) -> BufferHandle {
        if let Some(index) = self.position_of_path(path) {
            let handle = self.buffers[index].handle;
            self.ensure_loaded(index);
            self.buffers[index].listed = true;
            self.make_current(handle);
            return handle;
        }

        let handle = self.allocate();
        self.buffers.push(Buffer {
            handle,
            path: Some(path.to_path_buf()),
            lines: read_lines(path),
            cursor: (1, 1),
            loaded: true,
            listed: true,
            scratch: false,
        });
        self.make_current(handle);
        handle
    }

    pub fn new_unnamed(&mut self) -> BufferHandle {
        self.push_pathless(false, true)
    }

    pub fn new_scratch(&mut self) -> BufferHandle {
        self.push_pathless(true, false)
    }

    fn push_pathless(&mut self, scratch: bool, listed: bool) -> BufferHandle {
        let handle = self.allocate();
        self.buffers.push(Buffer {
            handle,
            path: None,
            lines: Vec::new(),
            cursor: (1, 1),
            loaded: true,
            listed,
            scratch,
        });
        self.current = Some(handle);
        handle
    }

    /// Makes `handle` current, reloading it from disk if it was unloaded.
    pub fn switch_to(&mut self, handle: BufferHandle) -> bool {
        let Some(index) = self.position_of(handle) else {
            return false;
        };
        self.ensure_loaded(index);
        self.make_current(handle);
        true
    }

    /// Unloads the current buffer; it stays in the list but is no longer
    /// offered for selection until reopened.
    pub fn close_current(&mut self) -> Option<BufferHandle> {
        let handle = self.current?;
        let index = self.position_of(handle)?;
        let buffer = &mut self.buffers[index];
        buffer.loaded = false;
        buffer.lines.clear();
        self.current = self
            .buffers
            .iter()
            .rev()
            .find(|buffer| buffer.loaded && buffer.listed)
            .map(|buffer| buffer.handle);
        Some(handle)
    }

    fn make_current(&mut self, handle: BufferHandle) {
        self.current = Some(handle);
        let path = self
            .position_of(handle)
            .and_then(|index| self.buffers[index].path.clone());
        if let Some(path) = path {
            self.recent.retain(|existing| existing != &path);
            self.recent.insert(0, path);
            self.recent.truncate(RECENT_LIMIT);
        }
    }

    fn ensure_loaded(&mut self, index: usize) {
        let buffer = &mut self.buffers[index];
        if buffer.loaded {
            return;
        }
        if let Some(path) = &buffer.path {
            buffer.lines = read_lines(path);
        }
        buffer.loaded = true;
    }

    fn position_of(&self, handle: BufferHandle) -> Option<usize> {
        self.buffers.iter().position(|buffer| buffer.handle == handle)
    }

    fn position_of_path(&self, path: &Path) -> Option<usize> {
        self.buffers
            .iter()
            .position(|buffer| buffer.path.as_deref() == Some(path))
    }

    #[must_use]
    pub fn current(&self) -> Option<&Buffer> {
        let handle = self.current?;
        self.buffers.iter().find(|buffer| buffer.handle == handle)
    }

    #[must_use]
    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    #[must_use]
    pub fn buffer_infos(&self) -> Vec<BufferInfo> {
        self.buffers.iter().map(Buffer::info).collect()
    }

    #[must_use]
    pub fn recent(&self) -> &[PathBuf] {
        &self.recent
    }

    /// Moves the cursor of the current buffer, clamped to its contents.
    pub fn set_cursor(&mut self, line: usize, column: usize) {
        let Some(handle) = self.current else {
            return;
        };
        let Some(index) = self.position_of(handle) else {
            return;
        };
        let buffer = &mut self.buffers[index];
        let line = line.clamp(1, buffer.lines.len().max(1));
        let width = buffer
            .lines
            .get(line - 1)
            .map_or(0, |text| text.chars().count());
        buffer.cursor = (line, column.clamp(1, width.max(1)));
    }

    /// The word-like segment at the cursor of the current buffer.
    #[must_use]
    pub fn word_under_cursor(&self) -> Option<String> {
        let buffer = self.current()?;
        let (line, column) = buffer.cursor;
        let text = buffer.lines.get(line.checked_sub(1)?)?;
        word_at(text, column)
    }

    pub fn set_matches(&mut self, title: &str, matches: Vec<SearchMatch>) {
        self.matches = Some(MatchList {
            title: title.to_string(),
            matches,
        });
    }

    #[must_use]
    pub fn matches(&self) -> Option<&MatchList> {
        self.matches.as_ref()
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        let documents: Vec<(BufferHandle, LayoutDocument)> = self
            .buffers
            .iter()
            .filter(|buffer| buffer.loaded && buffer.listed)
            .filter_map(|buffer| {
                let path = buffer.path.clone()?;
                Some((
                    buffer.handle,
                    LayoutDocument {
                        path,
                        line: buffer.cursor.0,
                        column: buffer.cursor.1,
                    },
                ))
            })
            .collect();
        let current = self
            .current
            .and_then(|handle| documents.iter().position(|(owner, _)| *owner == handle));
        Layout {
            documents: documents.into_iter().map(|(_, document)| document).collect(),
            current,
        }
    }

    #[must_use]
    pub fn capture_layout(&self) -> Value {
        serde_json::to_value(self.layout()).unwrap_or(Value::Null)
    }

    /// Reopens every document of a captured layout. The value is validated
    /// before anything changes.
    pub fn restore_layout(&mut self, value: Value) -> Result<(), String> {
        let layout: Layout =
            serde_json::from_value(value).map_err(|error| format!("invalid layout: {error}"))?;
        if let Some(current) = layout.current {
            if current >= layout.documents.len() {
                return Err(format!(
                    "layout current index {current} is out of range ({} documents)",
                    layout.documents.len()
                ));
            }
        }

        let mut handles = Vec::with_capacity(layout.documents.len());
        for document in &layout.documents {
            let handle = self.open_path(&document.path);
            self.set_cursor(document.line, document.column);
            handles.push(handle);
        }
        if let Some(handle) = layout.current.and_then(|index| handles.get(index)) {
            self.switch_to(*handle);
        }
        debug!(documents = handles.len(), "layout restored");
        Ok(())
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(error) => {
            debug!(path = %path.display(), %error, "opening as new document");
            Vec::new()
        }
    }
}

/// Word segment covering 1-based `column` (counted in chars), if it is
/// alphanumeric.
#[must_use]
pub fn word_at(text: &str, column: usize) -> Option<String> {
    let target = column.checked_sub(1)?;
    let mut offset = 0usize;
    for segment in text.split_word_bounds() {
        let len = segment.chars().count();
        if target < offset + len {
            return segment
                .chars()
                .any(char::is_alphanumeric)
                .then(|| segment.to_string());
        }
        offset += len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{word_at, Workspace};
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn word_at_follows_unicode_word_bounds() {
        let text = "let grüße = foo_bar(1);";
        assert_eq!(word_at(text, 1).as_deref(), Some("let"));
        assert_eq!(word_at(text, 6).as_deref(), Some("grüße"));
        assert_eq!(word_at(text, 4), None);
        assert_eq!(word_at(text, 13).as_deref(), Some("foo_bar"));
        assert_eq!(word_at(text, 99), None);
    }

    #[test]
    fn opening_twice_reuses_the_buffer_and_tracks_recent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "alpha\n").expect("write");

        let mut workspace = Workspace::new();
        let first = workspace.open_path(&a);
        workspace.open_path(&b);
        let again = workspace.open_path(&a);

        assert_eq!(first, again);
        assert_eq!(workspace.buffers().len(), 2);
        assert_eq!(workspace.recent(), &[a.clone(), b.clone()]);
        assert_eq!(workspace.current().expect("current").lines, vec!["alpha"]);
        assert!(workspace.buffers()[1].lines.is_empty());
    }

    #[test]
    fn closed_buffers_are_unloaded_but_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut workspace = Workspace::new();
        let handle = workspace.open_path(&dir.path().join("x.rs"));
        assert_eq!(workspace.close_current(), Some(handle));

        let info = &workspace.buffer_infos()[0];
        assert!(!info.loaded);
        assert!(workspace.current().is_none());
        assert!(workspace.switch_to(handle));
        assert!(workspace.current().expect("current").loaded);
    }

    #[test]
    fn layout_skips_pathless_documents_and_restores() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.txt");
        fs::write(&a, "one\ntwo words\n").expect("write");

        let mut workspace = Workspace::new();
        workspace.open_path(&a);
        workspace.set_cursor(2, 5);
        workspace.new_scratch();
        workspace.open_path(&a);

        let captured = workspace.capture_layout();
        let mut restored = Workspace::new();
        restored.restore_layout(captured).expect("restore");

        let current = restored.current().expect("current");
        assert_eq!(current.path.as_deref(), Some(a.as_path()));
        assert_eq!(current.cursor, (2, 5));
        assert_eq!(restored.word_under_cursor().as_deref(), Some("words"));
    }

    #[test]
    fn invalid_layout_changes_nothing() {
        let mut workspace = Workspace::new();
        let error = workspace
            .restore_layout(serde_json::json!({ "documents": [], "current": 3 }))
            .expect_err("out of range");
        assert!(error.contains("out of range"));
        assert!(workspace.buffers().is_empty());
    }
}
