use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use host_api::{escape_path, Documents, Host, NoticeLevel, Notify, SessionHost};
use serde_json::Value;
use session_store::SessionStore;
use tracing::{debug, info};
use zen_pick::actions::{BUFFERS, FILES, GIT_FILES, GREP, GREP_WORD, RECENT, RESUME};
use zen_pick::{ActionTable, Picker};

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::shutdown::lock_unpoisoned;
use crate::terminal::TerminalHost;

pub const PROMPT: &str = "zen> ";

pub struct App<R, W> {
    pub host: TerminalHost<R, W>,
    picker: Picker,
    store: SessionStore,
    actions: ActionTable<App<R, W>>,
    shared_layout: Option<Arc<Mutex<Value>>>,
    pub should_exit: bool,
}

/// Picker and resume actions, dispatched by identifier.
pub fn action_table<R: BufRead, W: Write>() -> ActionTable<App<R, W>> {
    ActionTable::<App<R, W>>::new()
        .with(FILES, "Find a file under the working root", |app| {
            app.picker.select_file(&mut app.host)
        })
        .with(GREP, "Search file contents", |app| {
            app.picker.grep_text(&mut app.host)
        })
        .with(BUFFERS, "Switch to an open buffer", |app| {
            app.picker.select_buffer(&mut app.host)
        })
        .with(GREP_WORD, "Search for the word under the cursor", |app| {
            app.picker.grep_word(&mut app.host)
        })
        .with(RECENT, "Reopen a recent file", |app| {
            app.picker.select_recent(&mut app.host)
        })
        .with(GIT_FILES, "Pick a file tracked by git", |app| {
            app.picker.select_git_files(&mut app.host)
        })
        .with(RESUME, "Resume the last file or session", |app| {
            let outcome = app.store.resume_last(&mut app.host);
            debug!(?outcome, "resume finished");
        })
}

impl<R: BufRead, W: Write> App<R, W> {
    pub fn new(host: TerminalHost<R, W>, picker: Picker, store: SessionStore) -> Self {
        Self {
            host,
            picker,
            store,
            actions: action_table(),
            shared_layout: None,
            should_exit: false,
        }
    }

    /// Mirrors the layout into `shared` after every command so a signal
    /// handler can persist it.
    #[must_use]
    pub fn with_shared_layout(mut self, shared: Arc<Mutex<Value>>) -> Self {
        self.shared_layout = Some(shared);
        self.publish_layout();
        self
    }

    pub fn open_initial(&mut self, paths: &[impl AsRef<Path>]) {
        for path in paths {
            let absolute = self.host.absolute(path.as_ref());
            self.host.edit(&escape_path(&absolute));
        }
        self.publish_layout();
    }

    /// Reads commands until `/quit` or end of input.
    pub fn run(&mut self) {
        while !self.should_exit {
            match self.host.input(PROMPT, None) {
                Some(line) => self.on_line(&line),
                None => self.on_quit(),
            }
        }
    }

    pub fn dispatch(&mut self, id: &str) {
        let actions = std::mem::take(&mut self.actions);
        if let Err(error) = actions.dispatch(id, self) {
            self.host.notify(NoticeLevel::Error, &error.to_string());
        }
        self.actions = actions;
    }

    pub fn on_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let Some(command) = parse_slash_command(line) else {
            self.host.say("Commands start with '/'; try /help");
            return;
        };

        match command {
            SlashCommand::Files => self.dispatch(FILES),
            SlashCommand::Grep => self.dispatch(GREP),
            SlashCommand::Buffers => self.dispatch(BUFFERS),
            SlashCommand::Word => self.dispatch(GREP_WORD),
            SlashCommand::Recent => self.dispatch(RECENT),
            SlashCommand::Git => self.dispatch(GIT_FILES),
            SlashCommand::Resume => self.dispatch(RESUME),
            SlashCommand::Open(spec) => self.host.edit(&spec),
            SlashCommand::New => {
                self.host.workspace_mut().new_unnamed();
            }
            SlashCommand::Scratch => {
                self.host.workspace_mut().new_scratch();
            }
            SlashCommand::Close => {
                if self.host.workspace_mut().close_current().is_none() {
                    self.host.notify(NoticeLevel::Warning, "No current buffer");
                }
            }
            SlashCommand::Cursor { line, column } => self.host.set_cursor(line, column),
            SlashCommand::Match(number) => self.host.jump_to_match(number),
            SlashCommand::List => self.list_buffers(),
            SlashCommand::Help => {
                self.host.say(HELP_TEXT);
                let lines: Vec<String> = self
                    .actions
                    .iter()
                    .map(|action| format!("  {:<10} {}", action.id, action.description))
                    .collect();
                for line in lines {
                    self.host.say(&line);
                }
            }
            SlashCommand::Quit => self.on_quit(),
            SlashCommand::Usage(usage) => self.host.say(&format!("Usage: {usage}")),
            SlashCommand::Unknown(command) => self
                .host
                .notify(NoticeLevel::Warning, &format!("Unknown command: {command}")),
        }

        self.publish_layout();
    }

    fn list_buffers(&mut self) {
        let current = self.host.workspace().current().map(|buffer| buffer.handle);
        let lines: Vec<String> = self
            .host
            .workspace()
            .buffers()
            .iter()
            .map(|buffer| {
                let marker = if Some(buffer.handle) == current { '%' } else { ' ' };
                let state = match (buffer.loaded, buffer.listed) {
                    (false, _) => 'h',
                    (true, false) => 'u',
                    (true, true) => 'a',
                };
                format!(
                    "{:>3} {marker}{state} {} line {}",
                    buffer.handle.0,
                    buffer.short_name(),
                    buffer.cursor.0
                )
            })
            .collect();
        if lines.is_empty() {
            self.host.say("No buffers");
        }
        for line in lines {
            self.host.say(&line);
        }
    }

    /// Saves the snapshot and stops the loop.
    pub fn on_quit(&mut self) {
        if self.should_exit {
            return;
        }
        self.store.save_snapshot(&self.host);
        info!(data_dir = %self.store.data_dir().display(), "session snapshot saved on exit");
        self.should_exit = true;
    }

    fn publish_layout(&self) {
        if let Some(shared) = &self.shared_layout {
            *lock_unpoisoned(shared) = self.host.capture_layout();
        }
    }
}
