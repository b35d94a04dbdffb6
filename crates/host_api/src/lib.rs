//! Minimal host contract shared by the picker facade and the session store.
//!
//! This crate defines only the primitives both components need from the
//! editor that embeds them: opening documents, enumerating buffers, prompting,
//! notifications and opaque layout capture. Rendering, key handling and the
//! selection backends themselves live elsewhere.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Severity attached to a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        })
    }
}

/// Stable identifier of one document loaded by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the host's buffer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    pub handle: BufferHandle,
    /// Full name of the document; empty for unnamed scratch buffers.
    pub name: String,
    pub loaded: bool,
    pub listed: bool,
}

impl BufferInfo {
    /// Whether the buffer may be offered by a selection prompt.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.loaded && self.listed && !self.name.is_empty()
    }
}

/// One line reported by an external search tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, when the tool reports one.
    pub column: Option<usize>,
    pub text: String,
}

impl SearchMatch {
    /// `path:line:col: text` label used by match lists, with `path` shown
    /// relative to `root` when beneath it.
    #[must_use]
    pub fn label(&self, root: &Path) -> String {
        let path = self.path.strip_prefix(root).unwrap_or(&self.path);
        match self.column {
            Some(column) => format!(
                "{}:{}:{}: {}",
                path.display(),
                self.line,
                column,
                self.text
            ),
            None => format!("{}:{}: {}", path.display(), self.line, self.text),
        }
    }
}

pub trait Notify {
    fn notify(&mut self, level: NoticeLevel, message: &str);
}

/// Document primitives: open, switch, enumerate.
pub trait Documents {
    /// Opens `spec` in the current view. `spec` is a path escaped with
    /// [`escape_path`]; a path that does not exist yet becomes a new document.
    fn edit(&mut self, spec: &str);

    /// Makes `handle` the current document without any path resolution.
    fn switch_to(&mut self, handle: BufferHandle);

    fn list_buffers(&self) -> Vec<BufferInfo>;

    /// Moves the cursor of the current document (1-based line and column).
    fn set_cursor(&mut self, _line: usize, _column: usize) {}
}

/// Everything the picker facade consumes from its host.
pub trait Host: Notify + Documents {
    /// Root that file enumeration and searches are scoped to.
    fn working_root(&self) -> PathBuf;

    /// Blocking single-choice prompt. Returns the index of the chosen label,
    /// or `None` when the user cancels. An empty list is valid input.
    fn select(&mut self, prompt: &str, labels: &[String]) -> Option<usize>;

    /// Blocking free-text prompt; `None` when cancelled.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Option<String>;

    fn word_under_cursor(&self) -> Option<String>;

    /// Loads search results into the host's navigable result list.
    fn load_matches(&mut self, title: &str, matches: Vec<SearchMatch>);

    /// Host-tracked history of opened files, most recent first.
    fn recent_files(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Everything the session store consumes from its host.
pub trait SessionHost: Notify + Documents {
    /// Host-specific serialization of the current window/buffer layout.
    fn capture_layout(&self) -> Value;

    /// Rebuilds a layout produced by [`SessionHost::capture_layout`].
    fn restore_layout(&mut self, layout: Value) -> Result<(), String>;
}

const SPECIAL_CHARS: &[char] = &[
    ' ', '\t', '\n', '*', '?', '[', '{', '`', '$', '\\', '%', '#', '\'', '"', '|', '!', '<',
];

/// Escapes characters the open primitive would otherwise interpret.
#[must_use]
pub fn escape_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw == "-" {
        return "\\-".to_string();
    }

    let mut out = String::with_capacity(raw.len() + 8);
    for (index, ch) in raw.chars().enumerate() {
        let leading = index == 0 && matches!(ch, '+' | '>');
        if leading || SPECIAL_CHARS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Inverse of [`escape_path`]: a backslash takes the next character literally.
#[must_use]
pub fn unescape_path(spec: &str) -> PathBuf {
    let mut out = String::with_capacity(spec.len());
    let mut chars = spec.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    PathBuf::from(out)
}

#[cfg(test)]
mod tests {
    use super::{escape_path, unescape_path, BufferHandle, BufferInfo, SearchMatch};
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};

    #[test]
    fn escape_covers_spaces_and_wildcards() {
        assert_eq!(
            escape_path(Path::new("/tmp/my notes/a*b%.txt")),
            "/tmp/my\\ notes/a\\*b\\%.txt"
        );
        assert_eq!(escape_path(Path::new("+cmd")), "\\+cmd");
        assert_eq!(escape_path(Path::new("-")), "\\-");
        assert_eq!(escape_path(Path::new("/plain/path.rs")), "/plain/path.rs");
    }

    #[test]
    fn unescape_reverses_escape() {
        for raw in ["/tmp/a b/#1.txt", "C:\\dir\\file", "weird'\"|!<name", "+x", "-"] {
            let escaped = escape_path(Path::new(raw));
            assert_eq!(unescape_path(&escaped), PathBuf::from(raw));
        }
    }

    #[test]
    fn selectable_requires_loaded_listed_and_named() {
        let base = BufferInfo {
            handle: BufferHandle(1),
            name: "src/main.rs".to_string(),
            loaded: true,
            listed: true,
        };
        assert!(base.is_selectable());
        assert!(!BufferInfo {
            loaded: false,
            ..base.clone()
        }
        .is_selectable());
        assert!(!BufferInfo {
            listed: false,
            ..base.clone()
        }
        .is_selectable());
        assert!(!BufferInfo {
            name: String::new(),
            ..base
        }
        .is_selectable());
    }

    #[test]
    fn match_label_includes_column_when_known() {
        let with_column = SearchMatch {
            path: PathBuf::from("/work/src/lib.rs"),
            line: 4,
            column: Some(9),
            text: "pub fn run()".to_string(),
        };
        assert_eq!(with_column.label(Path::new("/work")), "src/lib.rs:4:9: pub fn run()");

        let without = SearchMatch {
            column: None,
            ..with_column
        };
        assert_eq!(
            without.label(Path::new("/elsewhere")),
            "/work/src/lib.rs:4: pub fn run()"
        );
    }
}
