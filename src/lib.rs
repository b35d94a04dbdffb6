//! Pick-one selection facade.
//!
//! [`Picker`] offers six operations (files, grep, buffers, word grep, recent
//! files, git files). Each call probes for the rich backend (`fzf` on `PATH`)
//! and delegates to it when present; otherwise a built-in fallback drives the
//! host's own prompt, document and notification primitives
//! ([`host_api::Host`]).
//!
//! # Public API Overview
//! - [`Picker`] and its constructors ([`Picker::new`], [`Picker::with_parts`]).
//! - Capability probing: [`Backend`], [`BackendProbe`], [`RichBackend`].
//! - Items: [`SelectableItem`], [`OpenTarget`].
//! - External tools: [`ExternalTools`], [`SystemTools`], [`SearchQuery`].
//! - Named action dispatch: [`ActionTable`].

pub mod actions;
pub mod backend;
pub mod config;
pub mod external;
pub mod files;
pub mod fuzzy;
pub mod fzf;
pub mod item;
pub mod logging;
pub mod picker;

pub use crate::actions::{Action, ActionTable, UnknownAction};
pub use crate::backend::{
    Backend, BackendHandle, BackendProbe, FzfProbe, NoBackend, ProbeError, RichBackend,
};
pub use crate::config::{BackendMode, ConfigError, PickerConfig};
pub use crate::external::{
    ExternalError, ExternalTools, SearchDialect, SearchQuery, SystemTools, VcsListing,
};
pub use crate::fuzzy::{fuzzy_score, rank_labels};
pub use crate::fzf::{FzfBackend, FzfInvocation};
pub use crate::item::{relativize, OpenTarget, SelectableItem};
pub use crate::logging::init_logging;
pub use crate::picker::Picker;
