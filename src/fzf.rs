//! `fzf`-backed rich picker.
//!
//! fzf draws its own UI on the controlling terminal; candidates go in on
//! stdin and the chosen line comes back on stdout. Exit status 1 (no match)
//! and 130 (interrupted) are cancellations.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use host_api::{escape_path, BufferHandle, Host, NoticeLevel};
use tracing::{debug, warn};

use crate::backend::RichBackend;
use crate::config::PickerConfig;
use crate::external::{
    format_exit_status, ExternalError, ExternalTools, SearchDialect, SearchQuery, SystemTools,
};
use crate::files::list_files;
use crate::item::relativize;

/// One fzf run: arguments plus the candidate lines fed on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FzfInvocation {
    pub args: Vec<String>,
    pub candidates: Vec<String>,
}

impl FzfInvocation {
    fn prompt(prompt: &str) -> Vec<String> {
        vec![
            "--prompt".to_string(),
            format!("{prompt}> "),
            "--layout=reverse".to_string(),
            "--height=40%".to_string(),
        ]
    }

    #[must_use]
    pub fn list(prompt: &str, candidates: Vec<String>) -> Self {
        Self {
            args: Self::prompt(prompt),
            candidates,
        }
    }

    /// Candidates are `handle<TAB>label`; only the label is shown.
    #[must_use]
    pub fn buffers(entries: &[(BufferHandle, String)]) -> Self {
        let mut args = Self::prompt("Buffers");
        args.extend(["--delimiter=\t".to_string(), "--with-nth=2..".to_string()]);
        Self {
            args,
            candidates: entries
                .iter()
                .map(|(handle, label)| format!("{handle}\t{label}"))
                .collect(),
        }
    }

    /// Live grep: fzf re-runs the search tool whenever the query changes.
    #[must_use]
    pub fn live_grep(search_program: &str, query: Option<&str>) -> Self {
        let dialect = SearchDialect::for_program(search_program);
        let mut command = vec![search_program.to_string()];
        command.extend(
            dialect
                .args(&SearchQuery::text(""))
                .into_iter()
                .take_while(|arg| arg != "-e"),
        );
        let command: Vec<String> = command.iter().map(|arg| shell_quote(arg)).collect();
        let reload = format!("{} -e {{q}} . || true", command.join(" "));

        let mut args = Self::prompt("Grep");
        args.extend([
            "--disabled".to_string(),
            "--query".to_string(),
            query.unwrap_or_default().to_string(),
            "--delimiter=:".to_string(),
            "--bind".to_string(),
            format!("start:reload:{reload}"),
            "--bind".to_string(),
            format!("change:reload:sleep 0.1; {reload}"),
        ]);
        Self {
            args,
            candidates: Vec::new(),
        }
    }
}

/// Quotes `arg` for the `sh -c` line fzf runs on reload. Plain words pass
/// through unchanged.
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./=:,+@%".contains(ch));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Splits a `handle<TAB>label` line produced by [`FzfInvocation::buffers`].
#[must_use]
pub fn parse_buffer_line(line: &str) -> Option<BufferHandle> {
    let (handle, _) = line.split_once('\t')?;
    handle.trim().parse().ok().map(BufferHandle)
}

pub struct FzfBackend {
    program: PathBuf,
    config: PickerConfig,
    tools: SystemTools,
}

impl FzfBackend {
    #[must_use]
    pub fn new(program: PathBuf, config: PickerConfig) -> Self {
        let tools = SystemTools::new(&config);
        Self {
            program,
            config,
            tools,
        }
    }

    /// Runs fzf; `Ok(None)` when the user cancels.
    fn run(
        &self,
        root: &Path,
        invocation: FzfInvocation,
    ) -> Result<Option<String>, ExternalError> {
        let program = self.program.display().to_string();
        debug!(%program, candidates = invocation.candidates.len(), "launching rich picker");

        let mut child = Command::new(&self.program)
            .args(&invocation.args)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ExternalError::Spawn {
                program: program.clone(),
                source,
            })?;

        let feeder = child.stdin.take().map(|mut stdin| {
            let candidates = invocation.candidates;
            thread::spawn(move || {
                for candidate in candidates {
                    if writeln!(stdin, "{candidate}").is_err() {
                        break;
                    }
                }
            })
        });

        let output = child
            .wait_with_output()
            .map_err(|source| ExternalError::Wait {
                program: program.clone(),
                source,
            })?;
        if let Some(feeder) = feeder {
            let _ = feeder.join();
        }

        match output.status.code() {
            Some(0) => {}
            Some(1) | Some(130) => return Ok(None),
            _ => {
                return Err(ExternalError::Failed {
                    program,
                    status: format_exit_status(output.status),
                    stderr: String::new(),
                })
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .next()
            .filter(|line| !line.is_empty())
            .map(str::to_string))
    }

    fn run_or_report(
        &self,
        host: &mut dyn Host,
        root: &Path,
        invocation: FzfInvocation,
    ) -> Option<String> {
        match self.run(root, invocation) {
            Ok(choice) => choice,
            Err(error) => {
                warn!(%error, "rich picker failed");
                host.notify(NoticeLevel::Error, &format!("Picker failed: {error}"));
                None
            }
        }
    }

    fn pick_path(&self, host: &mut dyn Host, prompt: &str, paths: &[PathBuf]) {
        let root = host.working_root();
        let labels = paths
            .iter()
            .map(|path| path.strip_prefix(&root).unwrap_or(path).display().to_string())
            .collect();
        if let Some(choice) = self.run_or_report(host, &root, FzfInvocation::list(prompt, labels))
        {
            host.edit(&escape_path(&root.join(choice)));
        }
    }
}

impl RichBackend for FzfBackend {
    fn find_files(&mut self, host: &mut dyn Host) {
        let root = host.working_root();
        let files = list_files(&root, &self.config.ignore_patterns, self.config.max_results);
        self.pick_path(host, "Files", &files);
    }

    fn live_grep(&mut self, host: &mut dyn Host, query: Option<&str>) {
        let root = host.working_root();
        let search_program = self.tools.search_program();
        let dialect = SearchDialect::for_program(&search_program);
        let invocation = FzfInvocation::live_grep(&search_program, query);
        let Some(choice) = self.run_or_report(host, &root, invocation) else {
            return;
        };
        if let Some(found) = dialect.parse_line(&choice, &root) {
            host.edit(&escape_path(&found.path));
            host.set_cursor(found.line, found.column.unwrap_or(1));
        }
    }

    fn buffers(&mut self, host: &mut dyn Host) {
        let root = host.working_root();
        let home = dirs::home_dir();
        let entries: Vec<(BufferHandle, String)> = host
            .list_buffers()
            .into_iter()
            .filter(|buffer| buffer.is_selectable())
            .map(|buffer| {
                let label = relativize(&buffer.name, &root, home.as_deref());
                (buffer.handle, label)
            })
            .collect();
        let choice = self.run_or_report(host, &root, FzfInvocation::buffers(&entries));
        if let Some(handle) = choice.as_deref().and_then(parse_buffer_line) {
            host.switch_to(handle);
        }
    }

    fn recent_files(&mut self, host: &mut dyn Host) {
        let recent = host.recent_files();
        self.pick_path(host, "Recent", &recent);
    }

    fn git_files(&mut self, host: &mut dyn Host) {
        let root = host.working_root();
        match self.tools.tracked_files(&root) {
            Ok(listing) if listing.success => self.pick_path(host, "Git files", &listing.files),
            Ok(_) => host.notify(NoticeLevel::Warning, "Not in a git repository"),
            Err(error) => host.notify(
                NoticeLevel::Warning,
                &format!("Cannot list tracked files: {error}"),
            ),
        }
    }
}
