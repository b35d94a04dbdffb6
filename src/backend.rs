//! Rich-backend capability probing.
//!
//! Availability is resolved on every picker call; nothing is cached, so a
//! backend installed or removed mid-session is picked up on the next call.

use std::path::PathBuf;

use host_api::Host;
use thiserror::Error;
use tracing::debug;

use crate::config::{BackendMode, PickerConfig};
use crate::fzf::FzfBackend;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("rich picker backend disabled by configuration")]
    Disabled,

    #[error("rich picker backend {program} not found on PATH: {source}")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
}

/// A loaded rich selection backend. Once an operation is delegated the
/// backend owns all further UI, including opening the chosen target.
pub trait RichBackend {
    fn find_files(&mut self, host: &mut dyn Host);
    fn live_grep(&mut self, host: &mut dyn Host, query: Option<&str>);
    fn buffers(&mut self, host: &mut dyn Host);
    fn recent_files(&mut self, host: &mut dyn Host);
    fn git_files(&mut self, host: &mut dyn Host);
}

pub type BackendHandle = Box<dyn RichBackend>;

/// Per-call capability answer.
pub enum Backend {
    Rich(BackendHandle),
    BuiltinFallback,
}

impl Backend {
    /// Probes once; any probe failure means the built-in fallback.
    pub fn resolve(probe: &dyn BackendProbe) -> Self {
        match probe.probe() {
            Ok(handle) => Self::Rich(handle),
            Err(error) => {
                debug!(%error, "using built-in picker fallback");
                Self::BuiltinFallback
            }
        }
    }

    #[must_use]
    pub fn is_rich(&self) -> bool {
        matches!(self, Self::Rich(_))
    }
}

pub trait BackendProbe {
    fn probe(&self) -> Result<BackendHandle, ProbeError>;
}

/// Looks the configured program up on `PATH` each time it is asked.
#[derive(Debug, Clone)]
pub struct FzfProbe {
    config: PickerConfig,
}

impl FzfProbe {
    #[must_use]
    pub fn new(config: PickerConfig) -> Self {
        Self { config }
    }

    pub fn locate(&self) -> Result<PathBuf, ProbeError> {
        if self.config.backend == BackendMode::Off {
            return Err(ProbeError::Disabled);
        }
        which::which(&self.config.backend_program).map_err(|source| ProbeError::NotFound {
            program: self.config.backend_program.clone(),
            source,
        })
    }
}

impl BackendProbe for FzfProbe {
    fn probe(&self) -> Result<BackendHandle, ProbeError> {
        let program = self.locate()?;
        debug!(program = %program.display(), "rich picker backend available");
        Ok(Box::new(FzfBackend::new(program, self.config.clone())))
    }
}

/// Probe that never finds a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackend;

impl BackendProbe for NoBackend {
    fn probe(&self) -> Result<BackendHandle, ProbeError> {
        Err(ProbeError::Disabled)
    }
}
