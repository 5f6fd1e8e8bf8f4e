//! Scanner module for directory traversal.
//!
//! This module provides functionality for:
//! - Lazy directory walking using walkdir (recursive or top-level only)
//! - Capturing size and timestamps into immutable [`FileRecord`]s
//!
//! # Architecture
//!
//! - [`walker`]: Directory traversal and file discovery
//!
//! Anything that can produce file records implements [`RecordSource`], so the
//! duplicate finder can be driven from an in-memory list as well as from disk.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::scanner::{RecordSource, WalkerConfig, WalkerSource};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     recursive: true,
//!     ..Default::default()
//! };
//!
//! let source = WalkerSource::new(config);
//! for record in source.records(Path::new(".")) {
//!     match record {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod walker;

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use walker::WalkerSource;

/// Metadata captured for a discovered file.
///
/// Records are immutable once captured. They are created during the scan,
/// handed to the grouping and resolving phases, and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Creation (birth) time
    pub created_at: SystemTime,
    /// Last modification time
    pub modified_at: SystemTime,
}

impl FileRecord {
    /// Create a new record from explicit values.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, created_at: SystemTime, modified_at: SystemTime) -> Self {
        Self {
            path,
            size,
            created_at,
            modified_at,
        }
    }

    /// Build a record from filesystem metadata.
    ///
    /// Filesystems without birth time support report the modification time
    /// as creation time.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let modified_at = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created_at = metadata.created().unwrap_or(modified_at);
        Self {
            path,
            size: metadata.len(),
            created_at,
            modified_at,
        }
    }

    /// Capture a record for `path` by reading its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the metadata cannot be read.
    pub fn capture(path: &Path) -> Result<Self, ScanError> {
        let metadata = std::fs::metadata(path).map_err(|e| ScanError::from_io(path, e))?;
        Ok(Self::from_metadata(path.to_path_buf(), &metadata))
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Descend into subdirectories. When false only the top level is listed.
    pub recursive: bool,

    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Report zero-length files. They are skipped by default.
    pub include_empty: bool,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            ..Default::default()
        }
    }

    /// Report zero-length files as well.
    #[must_use]
    pub fn with_include_empty(mut self, include_empty: bool) -> Self {
        self.include_empty = include_empty;
        self
    }
}

/// A producer of file records for a root directory.
///
/// The sequence is lazy and must tolerate files disappearing while it is
/// being consumed. Files created during a run are not guaranteed to show up.
pub trait RecordSource {
    /// Enumerate the records below `root`.
    fn records<'a>(
        &'a self,
        root: &'a Path,
    ) -> Box<dyn Iterator<Item = Result<FileRecord, ScanError>> + 'a>;
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path vanished or never existed.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// The path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::Io { path: p, .. } => p,
        }
    }
}
