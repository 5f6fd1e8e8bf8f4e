//! Command-line interface definitions for dupefinder.
//!
//! # Example
//!
//! ```bash
//! # Scan the current directory (top level only)
//! dupefinder
//!
//! # Scan two trees recursively and export the results
//! dupefinder -r -e ~/Pictures /mnt/backup/Pictures
//!
//! # Move duplicates next to each root, comparing 4 KiB at a time
//! dupefinder -r -m --chunk-size 4KiB ~/Downloads
//!
//! # Verbose mode shows every comparison
//! dupefinder -v ~/Downloads
//! ```

use clap::Parser;
use std::path::PathBuf;

/// Find duplicate files by byte-for-byte comparison.
///
/// Files are grouped by size and compared in chunks. In every set of
/// identical files the oldest one is kept as the original; the others can
/// be exported to a list or moved into a `<root>_duplicate` directory.
#[derive(Debug, Parser)]
#[command(name = "dupefinder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Scan subdirectories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Show every file and comparison (-v), more diagnostics with -vv/-vvv
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors to stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Write every duplicate set to a duplicates.<timestamp>.txt file
    #[arg(short, long)]
    pub export: bool,

    /// Move duplicates into a `<root>_duplicate` directory next to each root
    #[arg(short = 'm', long = "relocate")]
    pub relocate: bool,

    /// Directory for the run log and export file
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Bytes compared per read (e.g. 2048, 4KiB). 0 picks a size from available memory
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub chunk_size: Option<u64>,

    /// Include zero-length files
    #[arg(long)]
    pub include_empty: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupefinder::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
