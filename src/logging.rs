//! Diagnostic logging setup.
//!
//! Library code only emits `tracing` events; the binary installs the
//! subscriber once. `ZEN_WRITE_LOG` redirects output to a file so diagnostics
//! never interleave with prompts, and `ZEN_DEBUG=1` forces debug level.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{env_flag, env_string_opt};

pub const WRITE_LOG_ENV_VAR: &str = "ZEN_WRITE_LOG";
pub const DEBUG_ENV_VAR: &str = "ZEN_DEBUG";

/// Default filter directive for a `-v` count.
#[must_use]
pub fn filter_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over
/// `verbosity`; a log file (argument or `ZEN_WRITE_LOG`) takes precedence over
/// stderr. Calling this twice is harmless.
pub fn init_logging(verbosity: u8, write_log: Option<&Path>) {
    let verbosity = if env_flag(DEBUG_ENV_VAR) {
        verbosity.max(2)
    } else {
        verbosity
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_for_verbosity(verbosity)));

    let log_path = write_log
        .map(Path::to_path_buf)
        .or_else(|| env_string_opt(WRITE_LOG_ENV_VAR).map(Into::into));

    if let Some(path) = log_path {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .try_init();
                return;
            }
            Err(error) => {
                eprintln!("zen: cannot open log file {}: {error}", path.display());
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .compact()
        .try_init();
}
