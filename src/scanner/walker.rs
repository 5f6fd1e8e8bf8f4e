//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! [`WalkerSource`] is the on-disk [`RecordSource`]: it traverses each root
//! directory and captures a [`FileRecord`] for each regular file found.
//!
//! # Features
//!
//! - Recursive or top-level-only traversal
//! - Entries sorted by file name for deterministic output
//! - Tolerates files deleted during the walk (reported as `NotFound`)
//! - Graceful shutdown via [`CancelToken`]
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::scanner::{RecordSource, WalkerConfig, WalkerSource};
//! use std::path::Path;
//!
//! let source = WalkerSource::new(WalkerConfig::new(true));
//! let files: Vec<_> = source
//!     .records(Path::new("/home/user/Downloads"))
//!     .filter_map(Result::ok)
//!     .collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{FileRecord, RecordSource, ScanError, WalkerConfig};
use crate::signal::CancelToken;

/// A [`RecordSource`] that walks each root with the same configuration.
#[derive(Debug, Clone, Default)]
pub struct WalkerSource {
    config: WalkerConfig,
    cancel: Option<CancelToken>,
}

impl WalkerSource {
    /// Create a source using `config` for every root.
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Stop yielding entries once `token` is cancelled.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl RecordSource for WalkerSource {
    fn records<'a>(
        &'a self,
        root: &'a Path,
    ) -> Box<dyn Iterator<Item = Result<FileRecord, ScanError>> + 'a> {
        Box::new(walk_root(root, &self.config, self.cancel.clone()))
    }
}

fn walk_root<'a>(
    root: &'a Path,
    config: &'a WalkerConfig,
    cancel: Option<CancelToken>,
) -> impl Iterator<Item = Result<FileRecord, ScanError>> + 'a {
    let mut walk_dir = WalkDir::new(root)
        .min_depth(1)
        .follow_links(config.follow_symlinks)
        .sort_by_file_name();
    if !config.recursive {
        walk_dir = walk_dir.max_depth(1);
    }

    walk_dir
        .into_iter()
        .take_while(move |_| {
            let cancelled = cancel.as_ref().is_some_and(CancelToken::is_cancelled);
            if cancelled {
                log::debug!("Walker: cancellation requested, stopping iteration");
            }
            !cancelled
        })
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                if file_type.is_dir() {
                    return None;
                }
                if file_type.is_symlink() && !config.follow_symlinks {
                    log::trace!("Skipping symlink: {}", entry.path().display());
                    return None;
                }

                let metadata = match entry.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        let path = entry.path().to_path_buf();
                        return Some(Err(walk_error(path, e)));
                    }
                };

                if !metadata.is_file() {
                    return None;
                }
                if metadata.len() == 0 && !config.include_empty {
                    log::debug!("Skipping empty file: {}", entry.path().display());
                    return None;
                }

                Some(Ok(FileRecord::from_metadata(entry.into_path(), &metadata)))
            }
            Err(e) => {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                Some(Err(walk_error(path, e)))
            }
        })
}

fn walk_error(path: PathBuf, error: walkdir::Error) -> ScanError {
    match error.into_io_error() {
        Some(io) => {
            let err = ScanError::from_io(&path, io);
            match err {
                ScanError::NotFound(_) => {
                    log::debug!("File not found (may have been deleted): {}", path.display());
                }
                _ => log::warn!("{}", err),
            }
            err
        }
        None => {
            log::warn!("Walker error for {}: filesystem loop", path.display());
            ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            }
        }
    }
}
