//! Snapshot persistence on termination signals.
//!
//! The control thread mirrors its layout into a shared slot after every
//! command; the listener thread writes that slot through the session store.
//! SIGTERM and SIGHUP exit afterwards. SIGINT only saves, since it also
//! reaches the rich picker child when the user interrupts it.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use libc::{SIGHUP, SIGINT, SIGTERM};
use serde_json::Value;
use session_store::SessionStore;
use signal_hook::iterator::{Handle, Signals};
use tracing::{info, warn};

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Writes the shared layout as the session snapshot.
pub fn persist_layout(store: &SessionStore, layout: &Mutex<Value>) {
    let layout = lock_unpoisoned(layout).clone();
    match store.write_snapshot(layout) {
        Ok(path) => info!(path = %path.display(), "session snapshot saved"),
        Err(error) => warn!(%error, "failed to save session snapshot"),
    }
}

/// Exit code for a fatal signal, following the shell convention.
#[must_use]
pub fn exit_code_for(signal: i32) -> Option<i32> {
    match signal {
        SIGTERM | SIGHUP => Some(128 + signal),
        _ => None,
    }
}

pub struct ShutdownGuard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub fn install_shutdown_handler(
    store: SessionStore,
    layout: Arc<Mutex<Value>>,
) -> io::Result<ShutdownGuard> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    let handle = signals.handle();

    let thread = thread::Builder::new()
        .name("zen-shutdown".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                persist_layout(&store, &layout);
                if let Some(code) = exit_code_for(signal) {
                    std::process::exit(code);
                }
            }
        })?;

    Ok(ShutdownGuard {
        handle,
        thread: Some(thread),
    })
}
