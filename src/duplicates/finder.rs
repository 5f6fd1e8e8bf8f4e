//! Duplicate finder orchestrating scan, grouping, comparison and election.
//!
//! # Overview
//!
//! For a list of roots the finder:
//! 1. **Walks** each root and collects [`FileRecord`]s (each file once, even
//!    when roots overlap or name the same directory by different paths)
//! 2. **Groups** them by size (see [`crate::duplicates::groups`])
//! 3. **Compares** members of each size group byte for byte. Once a file has
//!    matched an earlier anchor it is never used as an anchor itself.
//! 4. **Elects** a canonical member per verified set
//!
//! Progress and results are reported through an optional [`OutputHandle`].
//! Cancellation is checked between roots, files, groups and comparisons; an
//! interrupted scan returns what it found so far with
//! [`ScanSummary::interrupted`] set.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let (sets, summary) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! println!("Found {} duplicate sets", sets.len());
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::comparator::{ChunkSize, ContentComparator};
use super::groups::{sorted_size_groups, SizeGroup};
use super::resolver::{DuplicateResolver, DuplicateSet};
use crate::output::{OutputHandle, OutputItem, Severity};
use crate::scanner::{FileRecord, RecordSource, ScanError, WalkerConfig, WalkerSource};
use crate::signal::CancelToken;

/// Configuration for the duplicate finder.
#[derive(Debug, Clone, Default)]
pub struct FinderConfig {
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Chunk size for content comparison.
    pub chunk_size: ChunkSize,
    /// Emit per-file progress items instead of discarding them.
    pub verbose: bool,
    /// Optional cancellation token for graceful termination.
    pub cancel: Option<CancelToken>,
    /// Where progress and result items go.
    pub output: Option<OutputHandle>,
}

impl FinderConfig {
    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the comparison chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Enable verbose progress items.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Report progress and results to `output`.
    #[must_use]
    pub fn with_output(mut self, output: OutputHandle) -> Self {
        self.output = Some(output);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Total number of distinct files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Files dropped by size grouping (unique sizes)
    pub eliminated_by_size: usize,
    /// Content comparisons performed
    pub comparisons: usize,
    /// Number of confirmed duplicate sets
    pub duplicate_groups: usize,
    /// Number of duplicate files (excluding canonical members)
    pub duplicate_files: usize,
    /// Space reclaimable by removing every duplicate
    pub reclaimable_space: u64,
    /// Duration of the scan
    pub scan_duration: Duration,
    /// Whether the scan was cut short by cancellation
    pub interrupted: bool,
    /// Non-fatal errors encountered while walking
    pub scan_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Total size as a human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    fn record_set(&mut self, set: &DuplicateSet) {
        self.duplicate_groups += 1;
        self.duplicate_files += set.duplicate_count();
        self.reclaimable_space += set.wasted_space();
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The provided path does not exist.
    #[error("Target folder not exists: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Duplicate finder that drives scan, grouping, comparison and election.
pub struct DuplicateFinder {
    config: FinderConfig,
    source: Box<dyn RecordSource + Send + Sync>,
    comparator: ContentComparator,
    resolver: DuplicateResolver,
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("config", &self.config)
            .field("comparator", &self.comparator)
            .finish_non_exhaustive()
    }
}

impl DuplicateFinder {
    /// Create a finder that walks the filesystem.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut source = WalkerSource::new(config.walker_config.clone());
        if let Some(token) = &config.cancel {
            source = source.with_cancel_token(token.clone());
        }
        Self::with_source(config, Box::new(source))
    }

    /// Create a finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Create a finder reading records from a custom source.
    #[must_use]
    pub fn with_source(config: FinderConfig, source: Box<dyn RecordSource + Send + Sync>) -> Self {
        let comparator = ContentComparator::with_chunk_size(config.chunk_size);
        log::debug!("Comparing in chunks of {} bytes", comparator.chunk_size());
        Self {
            config,
            source,
            comparator,
            resolver: DuplicateResolver::new(),
        }
    }

    /// Find all duplicate sets under `roots`.
    ///
    /// Sets come out ordered by file size, largest first.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if a root does not exist or is not a
    /// directory. Nothing is scanned in that case. Cancellation is not an
    /// error.
    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<DuplicateSet>, ScanSummary), FinderError> {
        let canonical_roots = roots
            .iter()
            .map(|root| validate_root(root))
            .collect::<Result<Vec<_>, _>>()?;

        let start_time = Instant::now();
        let mut summary = ScanSummary::default();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut records = Vec::new();
        let mut visited_roots: HashSet<&Path> = HashSet::new();

        for (root, canonical_root) in roots.iter().zip(&canonical_roots) {
            if self.config.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            if !visited_roots.insert(canonical_root.as_path()) {
                log::debug!("Skipping repeated root {}", root.display());
                continue;
            }

            log::info!("Scanning {}", root.display());
            self.emit_verbose(OutputItem::new("Scanning folder: ").inline().severity(Severity::Verbose));
            self.emit_verbose(OutputItem::new(root.display().to_string()).severity(Severity::Success));

            for result in self.source.records(root) {
                match result {
                    Ok(record) => {
                        if seen.insert(self.identity(root, canonical_root, &record.path)) {
                            records.push(record);
                        } else {
                            log::trace!("Already recorded: {}", record.path.display());
                        }
                    }
                    Err(e) => summary.scan_errors.push(e),
                }
            }
        }

        if self.config.is_cancelled() {
            summary.interrupted = true;
        }

        let sets = self.collect_sets(records, &mut summary);
        summary.scan_duration = start_time.elapsed();
        Ok((sets, summary))
    }

    /// Find duplicate sets among already collected records.
    ///
    /// Records are used in the given order; duplicates of the same path are
    /// not filtered.
    #[must_use]
    pub fn find_duplicates_from_records(
        &self,
        records: Vec<FileRecord>,
    ) -> (Vec<DuplicateSet>, ScanSummary) {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();
        let sets = self.collect_sets(records, &mut summary);
        summary.scan_duration = start_time.elapsed();
        (sets, summary)
    }

    fn collect_sets(&self, records: Vec<FileRecord>, summary: &mut ScanSummary) -> Vec<DuplicateSet> {
        let (groups, stats) = sorted_size_groups(records);
        summary.total_files = stats.total_files;
        summary.total_size = stats.total_size;
        summary.eliminated_by_size = stats.eliminated_unique;

        log::info!(
            "Found {} files ({}), {} size group(s) to compare",
            summary.total_files,
            summary.total_size_display(),
            stats.candidate_groups
        );

        let mut sets = Vec::new();
        for group in groups {
            if self.config.is_cancelled() {
                summary.interrupted = true;
                break;
            }
            self.compare_group(group, summary, &mut sets);
        }

        log::info!(
            "Scan complete: {} duplicate set(s), {} duplicate file(s), {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );
        sets
    }

    /// Pairwise comparison within one size group.
    fn compare_group(&self, group: SizeGroup, summary: &mut ScanSummary, sets: &mut Vec<DuplicateSet>) {
        let files = group.files;
        let mut matched = vec![false; files.len()];

        for anchor in 0..files.len() {
            if self.config.is_cancelled() {
                summary.interrupted = true;
                return;
            }

            self.emit_verbose(OutputItem::new(""));
            self.emit_verbose(OutputItem::new("Checking file: ").inline().severity(Severity::Verbose));
            self.emit_verbose(
                OutputItem::new(files[anchor].path.display().to_string()).severity(Severity::Success),
            );
            if matched[anchor] {
                self.emit_verbose(OutputItem::new("Skip.").severity(Severity::DarkWarning));
                continue;
            }

            let mut members = vec![anchor];
            for other in anchor + 1..files.len() {
                if self.config.is_cancelled() {
                    summary.interrupted = true;
                    break;
                }

                self.emit_verbose(OutputItem::new("\u{2192} ").inline().severity(Severity::Success));
                self.emit_verbose(
                    OutputItem::new(files[other].path.display().to_string())
                        .severity(Severity::Verbose),
                );
                if matched[other] {
                    self.emit_verbose(OutputItem::new("Skip.").severity(Severity::Verbose));
                    continue;
                }

                summary.comparisons += 1;
                if self.comparator.equal(&files[anchor].path, &files[other].path) {
                    matched[other] = true;
                    members.push(other);
                    self.emit_verbose(OutputItem::new("Duplicate.").severity(Severity::DarkSuccess));
                } else {
                    self.emit_verbose(OutputItem::new("Non Duplicate.").severity(Severity::Verbose));
                }
            }

            if members.len() > 1 {
                matched[anchor] = true;
                let records: Vec<FileRecord> = members.iter().map(|&i| files[i].clone()).collect();
                if let Some(set) = self.resolver.resolve(group.size, records) {
                    self.report_set(&set);
                    summary.record_set(&set);
                    sets.push(set);
                }
            }

            if summary.interrupted {
                return;
            }
        }
    }

    /// Emit the result block for one set. Deferred in verbose mode so results
    /// are grouped after the progress stream.
    fn report_set(&self, set: &DuplicateSet) {
        let defer = self.config.verbose;
        self.emit(
            OutputItem::new("\u{2713} ")
                .inline()
                .severity(Severity::DarkSuccess)
                .deferred(defer),
        );
        self.emit(
            OutputItem::new("Duplicate Entry: ")
                .inline()
                .severity(Severity::Warning)
                .deferred(defer),
        );
        self.emit(
            OutputItem::new(ByteSize::b(set.size).to_string())
                .severity(Severity::Success)
                .deferred(defer),
        );
        for (i, member) in set.members.iter().enumerate() {
            self.emit(
                OutputItem::new("\u{2192} ")
                    .inline()
                    .severity(Severity::DarkSuccess)
                    .deferred(defer),
            );
            let line = if i == set.canonical {
                format!("{} (original)", member.path.display())
            } else {
                member.path.display().to_string()
            };
            self.emit(OutputItem::new(line).deferred(defer));
        }
        self.emit(OutputItem::new("").deferred(defer));
    }

    fn emit(&self, item: OutputItem) {
        if let Some(output) = &self.config.output {
            output.ingest(item);
        }
    }

    fn emit_verbose(&self, item: OutputItem) {
        self.emit(item.discard(!self.config.verbose));
    }

    /// Key under which a record counts as seen. Paths below a root are
    /// re-anchored on the canonical root, so `a/b` reached through `a` and
    /// through `a/b/..` or a link to `a` collide. Followed symlinks can land
    /// anywhere, so then each path is resolved on its own.
    fn identity(&self, root: &Path, canonical_root: &Path, path: &Path) -> PathBuf {
        if self.config.walker_config.follow_symlinks {
            return std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        }
        match path.strip_prefix(root) {
            Ok(relative) => canonical_root.join(relative),
            Err(_) => path.to_path_buf(),
        }
    }
}

/// Resolve `root` to its canonical directory path.
fn validate_root(root: &Path) -> Result<PathBuf, FinderError> {
    let canonical =
        std::fs::canonicalize(root).map_err(|_| FinderError::PathNotFound(root.to_path_buf()))?;
    if !canonical.is_dir() {
        return Err(FinderError::NotADirectory(root.to_path_buf()));
    }
    Ok(canonical)
}
