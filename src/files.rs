//! Recursive file enumeration for the file picker.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

/// Every non-directory entry beneath `root`, sorted, with ignored paths
/// pruned and at most `max_results` entries (`0` means unlimited).
///
/// `.gitignore` and `.ignore` rules apply, inside a repository or not.
/// Hidden files are listed. An ignore pattern matches when it equals any
/// component of the root-relative path, or when the relative path contains
/// it verbatim.
#[must_use]
pub fn list_files(root: &Path, ignore_patterns: &[String], max_results: usize) -> Vec<PathBuf> {
    let filter_root = root.to_path_buf();
    let patterns = ignore_patterns.to_vec();
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(true)
        .require_git(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let relative = entry
                .path()
                .strip_prefix(&filter_root)
                .unwrap_or(entry.path());
            relative.as_os_str().is_empty() || !is_ignored(relative, &patterns)
        });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(%error, "skipping unreadable entry");
                continue;
            }
        };
        let is_dir = entry
            .file_type()
            .map_or(true, |file_type| file_type.is_dir());
        if is_dir || entry.path().is_dir() {
            continue;
        }
        files.push(entry.into_path());
        if max_results > 0 && files.len() >= max_results {
            debug!(max_results, "file listing truncated");
            break;
        }
    }
    files
}

fn is_ignored(relative: &Path, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let text = relative.to_string_lossy();
    patterns.iter().any(|pattern| {
        !pattern.is_empty()
            && (relative
                .components()
                .any(|component| component.as_os_str() == pattern.as_str())
                || (pattern.contains('/') && text.contains(pattern.as_str())))
    })
}
