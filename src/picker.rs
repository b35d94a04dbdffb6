//! The picker facade: six pick-one operations.
//!
//! Every operation resolves [`Backend`] afresh. A rich backend receives the
//! call (and any query) and owns everything after that; otherwise the
//! operation's built-in fallback runs against the host primitives. No
//! operation returns an error: failures end in a notice, cancellations in
//! nothing.

use host_api::{Host, NoticeLevel};
use tracing::{debug, warn};

use crate::backend::{Backend, BackendProbe, FzfProbe};
use crate::config::PickerConfig;
use crate::external::{ExternalTools, SearchQuery, SystemTools};
use crate::files::list_files;
use crate::item::{relativize, SelectableItem};

pub const RECENT_UNAVAILABLE: &str = "Recent files need the rich picker backend";
pub const NOT_A_REPOSITORY: &str = "Not in a git repository";
pub const NO_WORD_UNDER_CURSOR: &str = "No word under cursor";

pub struct Picker {
    config: PickerConfig,
    probe: Box<dyn BackendProbe>,
    tools: Box<dyn ExternalTools>,
}

impl Picker {
    /// Picker wired to `fzf` on `PATH` and the system search/git tools.
    #[must_use]
    pub fn new(config: PickerConfig) -> Self {
        let probe = Box::new(FzfProbe::new(config.clone()));
        let tools = Box::new(SystemTools::new(&config));
        Self::with_parts(config, probe, tools)
    }

    #[must_use]
    pub fn with_parts(
        config: PickerConfig,
        probe: Box<dyn BackendProbe>,
        tools: Box<dyn ExternalTools>,
    ) -> Self {
        Self {
            config,
            probe,
            tools,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    fn backend(&self, operation: &'static str) -> Backend {
        let backend = Backend::resolve(self.probe.as_ref());
        debug!(operation, rich = backend.is_rich(), "picker backend resolved");
        backend
    }

    pub fn select_file(&mut self, host: &mut dyn Host) {
        if let Backend::Rich(mut backend) = self.backend("select_file") {
            backend.find_files(host);
            return;
        }

        let root = host.working_root();
        let items: Vec<SelectableItem> =
            list_files(&root, &self.config.ignore_patterns, self.config.max_results)
                .into_iter()
                .map(|path| SelectableItem::FileEntry { path })
                .collect();
        choose_and_open(host, "Find file", &items);
    }

    pub fn grep_text(&mut self, host: &mut dyn Host) {
        if let Backend::Rich(mut backend) = self.backend("grep_text") {
            backend.live_grep(host, None);
            return;
        }

        let Some(pattern) = host.input("Grep for: ", None) else {
            return;
        };
        if pattern.trim().is_empty() {
            return;
        }
        self.run_search(host, SearchQuery::text(pattern));
    }

    pub fn select_buffer(&mut self, host: &mut dyn Host) {
        if let Backend::Rich(mut backend) = self.backend("select_buffer") {
            backend.buffers(host);
            return;
        }

        let root = host.working_root();
        let home = dirs::home_dir();
        let items: Vec<SelectableItem> = host
            .list_buffers()
            .into_iter()
            .filter(|buffer| buffer.is_selectable())
            .map(|buffer| SelectableItem::BufferEntry {
                handle: buffer.handle,
                display_name: relativize(&buffer.name, &root, home.as_deref()),
            })
            .collect();
        choose_and_open(host, "Switch to buffer", &items);
    }

    pub fn grep_word(&mut self, host: &mut dyn Host) {
        let word = host
            .word_under_cursor()
            .filter(|word| !word.trim().is_empty());

        if let Backend::Rich(mut backend) = self.backend("grep_word") {
            backend.live_grep(host, word.as_deref());
            return;
        }

        match word {
            Some(word) => self.run_search(host, SearchQuery::word(word)),
            None => host.notify(NoticeLevel::Warning, NO_WORD_UNDER_CURSOR),
        }
    }

    pub fn select_recent(&mut self, host: &mut dyn Host) {
        if let Backend::Rich(mut backend) = self.backend("select_recent") {
            backend.recent_files(host);
            return;
        }

        host.notify(NoticeLevel::Warning, RECENT_UNAVAILABLE);
    }

    pub fn select_git_files(&mut self, host: &mut dyn Host) {
        if let Backend::Rich(mut backend) = self.backend("select_git_files") {
            backend.git_files(host);
            return;
        }

        let root = host.working_root();
        let listing = match self.tools.tracked_files(&root) {
            Ok(listing) => listing,
            Err(error) => {
                warn!(%error, "git ls-files could not run");
                host.notify(NoticeLevel::Warning, NOT_A_REPOSITORY);
                return;
            }
        };
        if !listing.success {
            host.notify(NoticeLevel::Warning, NOT_A_REPOSITORY);
            return;
        }

        let items: Vec<SelectableItem> = listing
            .files
            .into_iter()
            .map(|path| SelectableItem::GitFileEntry { path })
            .collect();
        choose_and_open(host, "Git files", &items);
    }

    fn run_search(&mut self, host: &mut dyn Host, query: SearchQuery) {
        let root = host.working_root();
        match self.tools.search(&query, &root) {
            Ok(matches) if matches.is_empty() => host.notify(
                NoticeLevel::Info,
                &format!("No matches for {:?}", query.pattern),
            ),
            Ok(matches) => {
                let title = format!("grep {}", query.pattern);
                host.load_matches(&title, matches);
            }
            Err(error) => {
                warn!(%error, "external search failed");
                host.notify(NoticeLevel::Warning, &format!("Search failed: {error}"));
            }
        }
    }
}

/// Presents `items` (even when empty) and opens the choice, if any.
fn choose_and_open(host: &mut dyn Host, prompt: &str, items: &[SelectableItem]) {
    let root = host.working_root();
    let labels: Vec<String> = items.iter().map(|item| item.label(&root)).collect();
    let Some(index) = host.select(prompt, &labels) else {
        return;
    };
    if let Some(item) = items.get(index) {
        item.open(host);
    }
}
