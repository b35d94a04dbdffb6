//! External search and version-control tools.
//!
//! Both run as single-shot child processes bounded by a timeout. Pipes are
//! drained on reader threads while waiting so large outputs cannot stall the
//! child.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use host_api::SearchMatch;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::config::PickerConfig;

static VIMGREP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<path>.+?):(?P<line>\d+):(?P<col>\d+):(?P<text>.*)$")
        .expect("vimgrep pattern compiles")
});

static GREP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<path>.+?):(?P<line>\d+):(?P<text>.*)$").expect("grep pattern compiles")
});

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {timeout_sec}s")]
    Timeout { program: String, timeout_sec: u64 },

    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// A search request derived from a prompt or the word under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub pattern: String,
    pub whole_word: bool,
}

impl SearchQuery {
    #[must_use]
    pub fn text(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            whole_word: false,
        }
    }

    #[must_use]
    pub fn word(word: impl Into<String>) -> Self {
        Self {
            pattern: word.into(),
            whole_word: true,
        }
    }
}

/// Result of "list tracked files": exit status plus parsed lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsListing {
    pub success: bool,
    pub files: Vec<PathBuf>,
}

pub trait ExternalTools {
    /// Line-oriented search across every file under `root`. No matches is
    /// `Ok` with an empty list.
    fn search(&mut self, query: &SearchQuery, root: &Path)
        -> Result<Vec<SearchMatch>, ExternalError>;

    /// Files tracked by version control under `root`. A non-repository is
    /// `Ok` with `success == false`; `Err` means the tool could not run.
    fn tracked_files(&mut self, root: &Path) -> Result<VcsListing, ExternalError>;
}

/// Which output dialect a search program speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDialect {
    Ripgrep,
    Grep,
}

impl SearchDialect {
    #[must_use]
    pub fn for_program(program: &str) -> Self {
        let stem = Path::new(program)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(program);
        if stem == "rg" {
            Self::Ripgrep
        } else {
            Self::Grep
        }
    }

    #[must_use]
    pub fn args(self, query: &SearchQuery) -> Vec<String> {
        let mut args: Vec<String> = match self {
            Self::Ripgrep => vec!["--vimgrep", "--no-heading", "--color", "never"],
            Self::Grep => vec!["-rnI", "--color=never"],
        }
        .into_iter()
        .map(str::to_string)
        .collect();
        if query.whole_word {
            args.push("-w".to_string());
        }
        args.push("-e".to_string());
        args.push(query.pattern.clone());
        args.push(".".to_string());
        args
    }

    /// Parses one output line; paths are resolved against `root`.
    #[must_use]
    pub fn parse_line(self, line: &str, root: &Path) -> Option<SearchMatch> {
        let captures = match self {
            Self::Ripgrep => VIMGREP_LINE.captures(line)?,
            Self::Grep => GREP_LINE.captures(line)?,
        };
        let raw_path = captures.name("path")?.as_str();
        let raw_path = raw_path.strip_prefix("./").unwrap_or(raw_path);
        Some(SearchMatch {
            path: root.join(raw_path),
            line: captures.name("line")?.as_str().parse().ok()?,
            column: captures
                .name("col")
                .and_then(|col| col.as_str().parse().ok()),
            text: captures
                .name("text")
                .map_or_else(String::new, |text| text.as_str().to_string()),
        })
    }
}

/// Process-backed tools: `rg` (or `grep`) and `git`.
#[derive(Debug, Clone)]
pub struct SystemTools {
    search_program: Option<String>,
    timeout: Duration,
}

impl SystemTools {
    #[must_use]
    pub fn new(config: &PickerConfig) -> Self {
        Self {
            search_program: config.search_program.clone(),
            timeout: Duration::from_secs(config.search_timeout_sec.max(1)),
        }
    }

    /// The configured search program, else `rg` when on `PATH`, else `grep`.
    #[must_use]
    pub fn search_program(&self) -> String {
        if let Some(program) = &self.search_program {
            return program.clone();
        }
        if which::which("rg").is_ok() {
            "rg".to_string()
        } else {
            "grep".to_string()
        }
    }
}

impl ExternalTools for SystemTools {
    fn search(
        &mut self,
        query: &SearchQuery,
        root: &Path,
    ) -> Result<Vec<SearchMatch>, ExternalError> {
        let program = self.search_program();
        let dialect = SearchDialect::for_program(&program);
        let output = run_captured(&program, &dialect.args(query), root, self.timeout)?;
        collect_matches(&program, dialect, &output, root)
    }

    fn tracked_files(&mut self, root: &Path) -> Result<VcsListing, ExternalError> {
        let args = ["ls-files".to_string(), "-z".to_string()];
        let output = run_captured("git", &args, root, self.timeout)?;
        if !output.status.success() {
            debug!(
                status = %format_exit_status(output.status),
                "git ls-files reported failure"
            );
            return Ok(VcsListing {
                success: false,
                files: Vec::new(),
            });
        }

        Ok(VcsListing {
            success: true,
            files: parse_nul_separated(&output.stdout, root),
        })
    }
}

/// Maps a finished search to matches. Exit 1 means nothing matched; exit 2
/// with output means some files were unreadable.
fn collect_matches(
    program: &str,
    dialect: SearchDialect,
    output: &CapturedOutput,
    root: &Path,
) -> Result<Vec<SearchMatch>, ExternalError> {
    match output.status.code() {
        Some(0) => {}
        Some(1) => return Ok(Vec::new()),
        Some(2) if !output.stdout.is_empty() => warn!(
            %program,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "search reported errors"
        ),
        _ => return Err(output.failure(program)),
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let matches: Vec<SearchMatch> = stdout
        .lines()
        .filter_map(|line| dialect.parse_line(line, root))
        .collect();
    debug!(%program, count = matches.len(), "search finished");
    Ok(matches)
}

/// Splits `git ls-files -z` output; entries are raw, unquoted paths.
fn parse_nul_separated(stdout: &[u8], root: &Path) -> Vec<PathBuf> {
    stdout
        .split(|byte| *byte == 0)
        .filter(|entry| !entry.is_empty())
        .map(|entry| root.join(bytes_to_path(entry)))
        .collect()
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

#[derive(Debug)]
pub(crate) struct CapturedOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

impl CapturedOutput {
    fn failure(&self, program: &str) -> ExternalError {
        ExternalError::Failed {
            program: program.to_string(),
            status: format_exit_status(self.status),
            stderr: String::from_utf8_lossy(&self.stderr).trim().to_string(),
        }
    }
}

pub(crate) fn run_captured(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<CapturedOutput, ExternalError> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ExternalError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let stdout_reader = drain_pipe(child.stdout.take());
    let stderr_reader = drain_pipe(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            kill_and_reap(&mut child);
            warn!(%program, timeout_sec = timeout.as_secs(), "external tool timed out");
            return Err(ExternalError::Timeout {
                program: program.to_string(),
                timeout_sec: timeout.as_secs(),
            });
        }
        Err(source) => {
            kill_and_reap(&mut child);
            return Err(ExternalError::Wait {
                program: program.to_string(),
                source,
            });
        }
    };

    Ok(CapturedOutput {
        status,
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    })
}

fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    let mut pipe = pipe?;
    Some(thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    }))
}

fn join_reader(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

pub(crate) fn format_exit_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        collect_matches, parse_nul_separated, run_captured, CapturedOutput, ExternalError,
        ExternalTools, SearchDialect, SearchQuery, SystemTools,
    };
    use crate::config::PickerConfig;
    use assert_matches::assert_matches;
    use host_api::SearchMatch;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::{Command, ExitStatus};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn grep_tools() -> SystemTools {
        SystemTools::new(&PickerConfig {
            search_program: Some("grep".to_string()),
            ..PickerConfig::default()
        })
    }

    fn git(root: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(root)
            .status()
            .expect("git runs");
        assert!(status.success(), "git {args:?} failed");
    }

    #[test]
    fn dialect_follows_program_name() {
        assert_eq!(SearchDialect::for_program("rg"), SearchDialect::Ripgrep);
        assert_eq!(
            SearchDialect::for_program("/usr/local/bin/rg"),
            SearchDialect::Ripgrep
        );
        assert_eq!(SearchDialect::for_program("grep"), SearchDialect::Grep);
        assert_eq!(SearchDialect::for_program("ggrep"), SearchDialect::Grep);
    }

    #[test]
    fn word_queries_add_the_word_flag() {
        let args = SearchDialect::Ripgrep.args(&SearchQuery::word("needle"));
        assert_eq!(
            args,
            vec!["--vimgrep", "--no-heading", "--color", "never", "-w", "-e", "needle", "."]
        );
        let args = SearchDialect::Grep.args(&SearchQuery::text("-starts-with-dash"));
        assert_eq!(args, vec!["-rnI", "--color=never", "-e", "-starts-with-dash", "."]);
    }

    #[test]
    fn vimgrep_lines_carry_columns() {
        let parsed = SearchDialect::Ripgrep
            .parse_line("./src/lib.rs:12:5:    let x = 10:20;", Path::new("/work"));
        assert_eq!(
            parsed,
            Some(SearchMatch {
                path: PathBuf::from("/work/src/lib.rs"),
                line: 12,
                column: Some(5),
                text: "    let x = 10:20;".to_string(),
            })
        );
    }

    #[test]
    fn grep_lines_have_no_column() {
        let parsed = SearchDialect::Grep.parse_line("./notes.txt:3:10:30 standup", Path::new("/w"));
        assert_eq!(
            parsed,
            Some(SearchMatch {
                path: PathBuf::from("/w/notes.txt"),
                line: 3,
                column: None,
                text: "10:30 standup".to_string(),
            })
        );
        assert_eq!(
            SearchDialect::Grep.parse_line("Binary file x matches", Path::new("/w")),
            None
        );
    }

    #[test]
    fn nul_separated_listing_keeps_raw_names() {
        let stdout = b"a.txt\0dir/gr\xc3\xbc\xc3\x9fe.txt\0\0";
        let files = parse_nul_separated(stdout, Path::new("/r"));
        assert_eq!(
            files,
            vec![PathBuf::from("/r/a.txt"), PathBuf::from("/r/dir/grüße.txt")]
        );
    }

    #[test]
    fn grep_finds_matches_and_no_match_is_empty() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), "first\nneedle here\n").expect("file");
        let mut tools = grep_tools();

        let found = tools
            .search(&SearchQuery::text("needle"), dir.path())
            .expect("search runs");
        assert_eq!(
            found,
            vec![SearchMatch {
                path: dir.path().join("notes.txt"),
                line: 2,
                column: None,
                text: "needle here".to_string(),
            }]
        );

        let none = tools
            .search(&SearchQuery::text("absent"), dir.path())
            .expect("exit 1 is not an error");
        assert!(none.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn exit_two_keeps_partial_matches_but_empty_exit_two_fails() {
        use std::os::unix::process::ExitStatusExt;

        let partial = CapturedOutput {
            status: ExitStatus::from_raw(2 << 8),
            stdout: b"./good.txt:1:needle\n".to_vec(),
            stderr: b"grep: ./locked: Permission denied\n".to_vec(),
        };
        let found = collect_matches("grep", SearchDialect::Grep, &partial, Path::new("/w"))
            .expect("partial output is kept");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("/w/good.txt"));

        let broken = CapturedOutput {
            status: ExitStatus::from_raw(2 << 8),
            stdout: Vec::new(),
            stderr: b"grep: bad regex\n".to_vec(),
        };
        assert_matches!(
            collect_matches("grep", SearchDialect::Grep, &broken, Path::new("/w")),
            Err(ExternalError::Failed { .. })
        );
    }

    #[test]
    fn tracked_files_outside_a_repository_reports_failure() {
        let dir = tempdir().expect("tempdir");
        let mut tools = grep_tools();
        let listing = tools.tracked_files(dir.path()).expect("git runs");
        assert!(!listing.success);
        assert!(listing.files.is_empty());
    }

    #[test]
    fn tracked_files_in_an_empty_repository_is_empty_success() {
        let dir = tempdir().expect("tempdir");
        git(dir.path(), &["init", "-q"]);
        let listing = grep_tools().tracked_files(dir.path()).expect("git runs");
        assert!(listing.success);
        assert!(listing.files.is_empty());
    }

    #[test]
    fn tracked_files_keeps_non_ascii_names_openable() {
        let dir = tempdir().expect("tempdir");
        git(dir.path(), &["init", "-q"]);
        fs::write(dir.path().join("grüße.txt"), "hallo\n").expect("file");
        fs::write(dir.path().join("plain.txt"), "hi\n").expect("file");
        git(dir.path(), &["add", "grüße.txt", "plain.txt"]);

        let listing = grep_tools().tracked_files(dir.path()).expect("git runs");
        assert!(listing.success);
        assert_eq!(
            listing.files,
            vec![dir.path().join("grüße.txt"), dir.path().join("plain.txt")]
        );
        assert!(listing.files.iter().all(|path| path.is_file()));
    }

    #[test]
    fn slow_tools_are_killed_at_the_timeout() {
        let dir = tempdir().expect("tempdir");
        let started = Instant::now();
        let result = run_captured(
            "sleep",
            &["10".to_string()],
            dir.path(),
            Duration::from_secs(1),
        );
        assert_matches!(result, Err(ExternalError::Timeout { timeout_sec: 1, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
