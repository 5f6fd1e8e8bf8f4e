//! dupefinder - byte-for-byte duplicate file finder
//!
//! Finds duplicate files across one or more directory trees. Candidates are
//! grouped by size, verified with chunked content comparison, and each set
//! gets one canonical "original" (the oldest file). Results stream through a
//! concurrent output pipeline to the console and a per-run log file, and can
//! be exported or relocated into `<root>_duplicate` directories.

pub mod actions;
pub mod app;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod signal;

pub use app::{run_app, run_app_with_token};
