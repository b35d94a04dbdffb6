//! `zen`: a line-oriented terminal workbench hosting the picker facade and
//! session store.
//!
//! ## Environment
//!
//! - `ZEN_DATA_DIR` overrides where `last_file` and `session.json` live.
//! - `ZEN_PICKER_BACKEND=off` disables the `fzf` backend.
//! - `ZEN_PICKER_PROGRAM` / `ZEN_SEARCH_PROGRAM` pin the picker and search
//!   executables.
//! - `ZEN_WRITE_LOG=<path>` sends diagnostics to a file; `ZEN_DEBUG=1` raises
//!   the level to debug.

pub mod app;
pub mod commands;
pub mod config;
pub mod shutdown;
pub mod terminal;
pub mod workspace;
