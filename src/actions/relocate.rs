//! Moving duplicates out of the scanned trees.
//!
//! # Overview
//!
//! Non-canonical members of a duplicate set are moved into a `_duplicate`
//! sibling of the root they were found under, keeping their path relative to
//! that root:
//!
//! ```text
//! /data/photos/2020/a.jpg  ->  /data/photos_duplicate/2020/a.jpg
//! ```
//!
//! Existing destination files are overwritten. Moves within one set run in
//! parallel; a failed move is recorded and the rest carry on.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::actions::relocate::Relocator;
//! use std::path::PathBuf;
//!
//! # fn sets() -> Vec<dupefinder::duplicates::DuplicateSet> { Vec::new() }
//! let relocator = Relocator::new(vec![PathBuf::from("/data/photos")]);
//! for set in sets() {
//!     let report = relocator.relocate_set(&set);
//!     println!("{}", report.summary());
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;

use crate::duplicates::DuplicateSet;

/// Suffix appended to a root's name to form its duplicate directory.
pub const DUPLICATE_SUFFIX: &str = "_duplicate";

/// Error type for relocation.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The file is not below any configured root.
    #[error("no scanned root contains {0}")]
    OutsideRoots(PathBuf),

    /// The source vanished before it could be moved.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Creating the destination directory or moving the file failed.
    #[error("failed to move {from} to {to}: {source}")]
    Move {
        /// Source path
        from: PathBuf,
        /// Destination path
        to: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl RelocateError {
    /// Source path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::OutsideRoots(p) | Self::NotFound(p) | Self::Move { from: p, .. } => p,
        }
    }
}

/// One completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Original location of the duplicate.
    pub from: PathBuf,
    /// New location.
    pub to: PathBuf,
    /// Size of the moved file in bytes.
    pub size: u64,
}

/// Outcome of relocating the duplicates of one or more sets.
#[derive(Debug, Clone, Default)]
pub struct RelocationReport {
    /// Completed moves.
    pub moved: Vec<Relocation>,
    /// Failed moves with their error messages.
    pub failures: Vec<(PathBuf, String)>,
}

impl RelocationReport {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.moved.len()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total bytes moved.
    #[must_use]
    pub fn bytes_moved(&self) -> u64 {
        self.moved.iter().map(|m| m.size).sum()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: RelocationReport) {
        self.moved.extend(other.moved);
        self.failures.extend(other.failures);
    }

    /// Human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!("Moved {} duplicate file(s)", self.success_count())
        } else {
            format!(
                "Moved {} duplicate file(s), {} failed",
                self.success_count(),
                self.failure_count()
            )
        }
    }
}

/// Duplicate directory for `root`: `<parent>/<name>_duplicate`.
///
/// A root without a parent (a filesystem root) gets the directory inside
/// itself.
#[must_use]
pub fn duplicate_root(root: &Path) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir_name = format!("{}{}", name, DUPLICATE_SUFFIX);
    match root.parent() {
        Some(parent) => parent.join(dir_name),
        None => root.join(dir_name),
    }
}

/// The most specific root containing `path`.
#[must_use]
pub fn owning_root<'a>(roots: &'a [PathBuf], path: &Path) -> Option<&'a Path> {
    roots
        .iter()
        .filter(|root| path.starts_with(root))
        .max_by_key(|root| root.components().count())
        .map(PathBuf::as_path)
}

/// Where `path` lands when relocated, or `None` if no root contains it.
#[must_use]
pub fn destination_for(roots: &[PathBuf], path: &Path) -> Option<PathBuf> {
    let root = owning_root(roots, path)?;
    let relative = path.strip_prefix(root).ok()?;
    Some(duplicate_root(root).join(relative))
}

/// Moves non-canonical duplicates into per-root `_duplicate` directories.
#[derive(Debug, Clone)]
pub struct Relocator {
    roots: Vec<PathBuf>,
}

impl Relocator {
    /// Relocator for the given scan roots.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Destination for `path`, see [`destination_for`].
    #[must_use]
    pub fn destination(&self, path: &Path) -> Option<PathBuf> {
        destination_for(&self.roots, path)
    }

    /// Move every duplicate of `set`, keeping the canonical member in place.
    #[must_use]
    pub fn relocate_set(&self, set: &DuplicateSet) -> RelocationReport {
        let results: Vec<Result<Relocation, RelocateError>> = set
            .duplicates()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|record| {
                let to = self
                    .destination(&record.path)
                    .ok_or_else(|| RelocateError::OutsideRoots(record.path.clone()))?;
                move_file(&record.path, &to)?;
                Ok(Relocation {
                    from: record.path.clone(),
                    to,
                    size: record.size,
                })
            })
            .collect();

        let mut report = RelocationReport::default();
        for result in results {
            match result {
                Ok(relocation) => {
                    log::debug!(
                        "Moved {} -> {}",
                        relocation.from.display(),
                        relocation.to.display()
                    );
                    report.moved.push(relocation);
                }
                Err(e) => {
                    log::warn!("{}", e);
                    report.failures.push((e.path().to_path_buf(), e.to_string()));
                }
            }
        }
        report
    }
}

/// Move `from` to `to`, replacing any existing file.
///
/// Parent directories are created as needed; concurrent creation of the same
/// directory is harmless. Moves across filesystems fall back to copy, sync
/// and remove.
///
/// # Errors
///
/// Returns [`RelocateError`] if the source is missing or any step fails.
pub fn move_file(from: &Path, to: &Path) -> Result<(), RelocateError> {
    let move_error = |source: io::Error| RelocateError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if fs::symlink_metadata(from).is_err() {
        return Err(RelocateError::NotFound(from.to_path_buf()));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(move_error)?;
    }

    #[cfg(windows)]
    if to.exists() {
        fs::remove_file(to).map_err(move_error)?;
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => copy_then_remove(from, to).map_err(move_error),
        Err(e) => Err(move_error(e)),
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    match fs::copy(from, to) {
        Ok(_) => {
            fs::File::open(to)?.sync_all()?;
            fs::remove_file(from)
        }
        Err(e) => {
            let _ = fs::remove_file(to);
            Err(e)
        }
    }
}

/// EXDEV on Unix, ERROR_NOT_SAME_DEVICE on Windows.
const CROSS_DEVICE_ERROR: i32 = if cfg!(windows) { 17 } else { 18 };

fn is_cross_device(error: &io::Error) -> bool {
    error.raw_os_error() == Some(CROSS_DEVICE_ERROR)
}
