//! Cooperative cancellation wired to Ctrl+C.
//!
//! A [`CancelToken`] wraps a shared `AtomicBool`. The entry point installs a
//! `ctrlc` handler that sets it; the walker, the finder and the output
//! pipeline observe it at their checkpoints and wind down gracefully.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupefinder::signal::install_handler;
//!
//! let token = install_handler().expect("Failed to install signal handler");
//!
//! if token.is_cancelled() {
//!     println!("Cancelled, cleaning up...");
//! }
//! ```
//!
//! When a signal arrives the token is set and "Interrupted. Cleaning up..."
//! is printed to stderr. The process should then exit with code 130.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption (128 + SIGINT).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancellation flag.
///
/// Clones observe the same flag. `CancelToken` is `Send` and `Sync`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag.
    #[must_use]
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// True once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag. Used when a process-wide token is reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The underlying flag, for code that takes a raw `Arc<AtomicBool>`.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancelToken> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned token.
///
/// Call once, early in startup. Later calls in the same process (tests that
/// run the app several times) get the first token back, reset to not
/// cancelled. If another component already owns the process signal hook, an
/// unhooked token is returned that can still be cancelled manually.
///
/// # Errors
///
/// Currently always succeeds; the `Result` keeps the door open for platforms
/// where installation must fail hard.
pub fn install_handler() -> Result<CancelToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancelToken::new();
    let flag = token.flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Cleaning up...");
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_TOKEN.set(token.clone());
            Ok(token)
        }
        Err(e) => {
            if let Some(existing) = GLOBAL_TOKEN.get() {
                existing.reset();
                return Ok(existing.clone());
            }
            log::debug!("Ctrl+C handler already registered ({}), using unhooked token", e);
            let fallback = CancelToken::new();
            let _ = GLOBAL_TOKEN.set(fallback.clone());
            Ok(GLOBAL_TOKEN.get().cloned().unwrap_or(fallback))
        }
    }
}
