//! Line-oriented terminal host: numbered selection prompts, notices and
//! document primitives over a [`Workspace`].

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use host_api::{
    unescape_path, BufferHandle, BufferInfo, Documents, Host, NoticeLevel, Notify, SearchMatch,
    SessionHost,
};
use serde_json::Value;
use session_store::SessionStore;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;
use zen_pick::rank_labels;

use crate::workspace::Workspace;

pub const DEFAULT_COLUMNS: usize = 80;
/// Candidates shown per prompt page; the rest are reachable by filtering.
pub const MAX_VISIBLE: usize = 20;

#[cfg(unix)]
fn read_winsize(fd: libc::c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}

/// Width of the controlling terminal, or [`DEFAULT_COLUMNS`].
#[must_use]
pub fn terminal_columns() -> usize {
    #[cfg(unix)]
    {
        read_winsize(libc::STDOUT_FILENO)
            .map(|(columns, _)| usize::from(columns))
            .unwrap_or(DEFAULT_COLUMNS)
    }
    #[cfg(not(unix))]
    {
        DEFAULT_COLUMNS
    }
}

/// Cuts `text` to `max_width` display columns, ending in `…` when cut.
#[must_use]
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }

    let target = max_width - 1;
    let mut truncated = String::new();
    let mut width = 0;
    for grapheme in text.graphemes(true) {
        let grapheme_width = UnicodeWidthStr::width(grapheme);
        if width + grapheme_width > target {
            break;
        }
        truncated.push_str(grapheme);
        width += grapheme_width;
    }
    truncated.push('…');
    truncated
}

pub struct TerminalHost<R, W> {
    input: R,
    output: W,
    columns: usize,
    root: PathBuf,
    workspace: Workspace,
    store: SessionStore,
}

impl<R: BufRead, W: Write> TerminalHost<R, W> {
    pub fn new(input: R, output: W, root: PathBuf, store: SessionStore) -> Self {
        Self {
            input,
            output,
            columns: terminal_columns(),
            root,
            workspace: Workspace::new(),
            store,
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: usize) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    #[must_use]
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Next input line without its terminator; `None` at end of input.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);
                Some(line)
            }
            Err(error) => {
                warn!(%error, "failed to read terminal input");
                None
            }
        }
    }

    /// Writes one line; output errors are logged, not propagated.
    pub fn say(&mut self, text: &str) {
        if let Err(error) = writeln!(self.output, "{text}").and_then(|()| self.output.flush()) {
            warn!(%error, "failed to write terminal output");
        }
    }

    fn prompt(&mut self, text: &str) {
        let result = write!(self.output, "{text}").and_then(|()| self.output.flush());
        if let Err(error) = result {
            warn!(%error, "failed to write terminal prompt");
        }
    }

    /// Resolves a user-typed path against the working root.
    #[must_use]
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn render_choices(&mut self, prompt: &str, labels: &[String], view: &[usize]) {
        self.say(&format!("{prompt}:"));
        if view.is_empty() {
            self.say("  (no candidates)");
            return;
        }
        let number_width = view.len().min(MAX_VISIBLE).to_string().len();
        let label_width = self.columns.saturating_sub(number_width + 4);
        for (position, index) in view.iter().take(MAX_VISIBLE).enumerate() {
            let label = truncate_to_width(&labels[*index], label_width);
            self.say(&format!("  {:>number_width$}. {label}", position + 1));
        }
        if view.len() > MAX_VISIBLE {
            self.say(&format!("  … {} more, type to filter", view.len() - MAX_VISIBLE));
        }
    }

    pub fn jump_to_match(&mut self, number: usize) {
        let found = self
            .workspace
            .matches()
            .and_then(|list| number.checked_sub(1).and_then(|index| list.matches.get(index)))
            .cloned();
        match found {
            Some(found) => {
                self.open_absolute(&found.path);
                self.workspace
                    .set_cursor(found.line, found.column.unwrap_or(1));
            }
            None => self.notify(NoticeLevel::Warning, &format!("No match number {number}")),
        }
    }

    fn open_absolute(&mut self, path: &Path) {
        self.workspace.open_path(path);
        self.store.save_current(path);
    }
}

impl<R: BufRead, W: Write> Notify for TerminalHost<R, W> {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.say(&format!("[{level}] {message}"));
    }
}

impl<R: BufRead, W: Write> Documents for TerminalHost<R, W> {
    fn edit(&mut self, spec: &str) {
        let path = self.absolute(&unescape_path(spec));
        self.open_absolute(&path);
        let name = self
            .workspace
            .current()
            .map(|buffer| buffer.short_name())
            .unwrap_or_default();
        self.say(&format!("\"{name}\""));
    }

    fn switch_to(&mut self, handle: BufferHandle) {
        if !self.workspace.switch_to(handle) {
            self.notify(NoticeLevel::Error, &format!("No buffer {handle}"));
            return;
        }
        let path = self.workspace.current().and_then(|buffer| buffer.path.clone());
        if let Some(path) = path {
            self.store.save_current(&path);
        }
    }

    fn list_buffers(&self) -> Vec<BufferInfo> {
        self.workspace.buffer_infos()
    }

    fn set_cursor(&mut self, line: usize, column: usize) {
        self.workspace.set_cursor(line, column);
    }
}

impl<R: BufRead, W: Write> Host for TerminalHost<R, W> {
    fn working_root(&self) -> PathBuf {
        self.root.clone()
    }

    /// Empty answer or end of input cancels; a number picks from the shown
    /// list; other text narrows the list and asks again.
    fn select(&mut self, prompt: &str, labels: &[String]) -> Option<usize> {
        let mut view: Vec<usize> = (0..labels.len()).collect();
        loop {
            self.render_choices(prompt, labels, &view);
            self.prompt("> ");
            let answer = self.read_line()?;
            let answer = answer.trim();
            if answer.is_empty() || view.is_empty() {
                return None;
            }

            if let Ok(number) = answer.parse::<usize>() {
                let shown = view.len().min(MAX_VISIBLE);
                if (1..=shown).contains(&number) {
                    return Some(view[number - 1]);
                }
                self.say(&format!("Pick a number between 1 and {shown}"));
                continue;
            }

            let candidates: Vec<String> = view.iter().map(|index| labels[*index].clone()).collect();
            let ranked = rank_labels(answer, &candidates);
            if ranked.is_empty() {
                self.say(&format!("No candidates match {answer:?}"));
                continue;
            }
            view = ranked.into_iter().map(|position| view[position]).collect();
        }
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Option<String> {
        match default {
            Some(default) => self.prompt(&format!("{prompt}[{default}] ")),
            None => self.prompt(prompt),
        }
        let answer = self.read_line()?;
        if answer.is_empty() {
            return Some(default.unwrap_or_default().to_string());
        }
        Some(answer)
    }

    fn word_under_cursor(&self) -> Option<String> {
        self.workspace.word_under_cursor()
    }

    fn load_matches(&mut self, title: &str, matches: Vec<SearchMatch>) {
        self.say(&format!("{title} ({} matches)", matches.len()));
        let width = self.columns.saturating_sub(8);
        for (index, found) in matches.iter().enumerate() {
            let label = truncate_to_width(&found.label(&self.root), width);
            self.say(&format!("  {:>3}. {label}", index + 1));
        }
        self.workspace.set_matches(title, matches);
    }

    fn recent_files(&self) -> Vec<PathBuf> {
        self.workspace.recent().to_vec()
    }
}

impl<R: BufRead, W: Write> SessionHost for TerminalHost<R, W> {
    fn capture_layout(&self) -> Value {
        self.workspace.capture_layout()
    }

    fn restore_layout(&mut self, layout: Value) -> Result<(), String> {
        self.workspace.restore_layout(layout)?;
        if let Some(path) = self
            .workspace
            .current()
            .and_then(|buffer| buffer.path.clone())
        {
            self.store.save_current(&path);
        }
        self.say(&format!(
            "Restored {} documents",
            self.workspace.layout().documents.len()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{truncate_to_width, TerminalHost};
    use host_api::{Host, SessionHost};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use session_store::SessionStore;
    use std::io::Cursor;

    fn host(script: &str) -> (tempfile::TempDir, TerminalHost<Cursor<Vec<u8>>, Vec<u8>>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("data"));
        let host = TerminalHost::new(
            Cursor::new(script.as_bytes().to_vec()),
            Vec::new(),
            dir.path().to_path_buf(),
            store,
        )
        .with_columns(40);
        (dir, host)
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        assert_eq!(truncate_to_width("日本語テキスト", 7), "日本語…");
        assert_eq!(truncate_to_width("anything", 0), "");
    }

    #[test]
    fn empty_answer_and_end_of_input_cancel() {
        let (_dir, mut host) = host("\n");
        let items = labels(&["a.rs", "b.rs"]);
        assert_eq!(host.select("Pick", &items), None);
        assert_eq!(host.select("Pick", &items), None);
    }

    #[test]
    fn numbers_pick_from_the_shown_list() {
        let (_dir, mut host) = host("0\n2\n");
        let items = labels(&["a.rs", "b.rs"]);
        assert_eq!(host.select("Pick", &items), Some(1));
        let out = String::from_utf8_lossy(host.output()).into_owned();
        assert!(out.contains("Pick a number between 1 and 2"));
    }

    #[test]
    fn text_filters_then_number_picks_from_the_filtered_view() {
        let (_dir, mut host) = host("main\n1\n");
        let items = labels(&["main_helpers/mod.rs", "README.md", "src/main.rs"]);
        assert_eq!(host.select("Pick", &items), Some(2));
    }

    #[test]
    fn unmatched_filter_keeps_the_list() {
        let (_dir, mut host) = host("zzz\n1\n");
        let items = labels(&["a.rs", "b.rs"]);
        assert_eq!(host.select("Pick", &items), Some(0));
    }

    #[test]
    fn empty_list_accepts_any_answer_as_cancel() {
        let (_dir, mut host) = host("1\n");
        assert_eq!(host.select("Git files", &[]), None);
        let out = String::from_utf8_lossy(host.output()).into_owned();
        assert!(out.contains("(no candidates)"));
    }

    #[test]
    fn input_returns_default_for_empty_answers() {
        let (_dir, mut host) = host("\nneedle\n");
        assert_eq!(host.input("Grep for: ", Some("word")), Some("word".to_string()));
        assert_eq!(host.input("Grep for: ", None), Some("needle".to_string()));
        assert_eq!(host.input("Grep for: ", None), None);
    }

    #[test]
    fn restoring_a_layout_records_the_current_document() {
        let (dir, mut host) = host("");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "alpha\n").expect("a.txt");
        std::fs::write(&b, "beta\n").expect("b.txt");

        host.restore_layout(json!({
            "documents": [
                { "path": a, "line": 1, "column": 1 },
                { "path": b, "line": 1, "column": 1 },
            ],
            "current": 1,
        }))
        .expect("layout restores");

        let store = SessionStore::new(dir.path().join("data"));
        assert_eq!(store.read_last_file().expect("slot readable"), Some(b));
    }
}
