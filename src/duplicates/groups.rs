//! Size grouping, the first filter of a scan.
//!
//! Two files of different length cannot hold the same bytes. Records are
//! bucketed by length and any length seen only once is dropped before the
//! comparator opens a single file.
//!
//! ```
//! use dupefinder::scanner::FileRecord;
//! use dupefinder::duplicates::group_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let now = SystemTime::now();
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, now, now),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, now, now),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, now, now),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(groups[&1024].len(), 2);
//! assert_eq!(stats.candidate_files, 2);
//! assert_eq!(stats.eliminated_unique, 1);
//! ```

use std::collections::HashMap;

use crate::scanner::FileRecord;

/// Records of one exact length, in enumeration order.
#[derive(Debug, Clone)]
pub struct SizeGroup {
    pub size: u64,
    pub files: Vec<FileRecord>,
}

/// Counters gathered while grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Records seen.
    pub total_files: usize,
    /// Sum of their lengths.
    pub total_size: u64,
    /// Lengths shared by at least two records.
    pub candidate_groups: usize,
    /// Records in those groups.
    pub candidate_files: usize,
    /// Records dropped for having a length nobody else has.
    pub eliminated_unique: usize,
}

impl GroupingStats {
    /// Share of records dropped without any I/O, as a percentage.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        match self.total_files {
            0 => 0.0,
            n => self.eliminated_unique as f64 * 100.0 / n as f64,
        }
    }
}

/// Bucket `files` by length and keep the buckets with two or more members.
///
/// Each bucket lists its records in input order. Nothing is read from disk.
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
) -> (HashMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut stats = GroupingStats::default();
    let mut buckets = files
        .into_iter()
        .fold(HashMap::<u64, Vec<FileRecord>>::new(), |mut acc, file| {
            stats.total_files += 1;
            stats.total_size += file.size;
            acc.entry(file.size).or_default().push(file);
            acc
        });

    buckets.retain(|size, members| match members.as_slice() {
        [only] => {
            log::trace!("No other file is {} bytes: {}", size, only.path.display());
            stats.eliminated_unique += 1;
            false
        }
        _ => {
            log::debug!("{} files of {} bytes", members.len(), size);
            stats.candidate_groups += 1;
            stats.candidate_files += members.len();
            true
        }
    });

    log::info!(
        "Grouped {} files by size: {} left to compare, {:.1}% ruled out",
        stats.total_files,
        stats.candidate_files,
        stats.elimination_rate()
    );

    (buckets, stats)
}

/// [`group_by_size`], flattened into a list with the largest length first.
#[must_use]
pub fn sorted_size_groups(
    files: impl IntoIterator<Item = FileRecord>,
) -> (Vec<SizeGroup>, GroupingStats) {
    let (buckets, stats) = group_by_size(files);
    let mut groups: Vec<SizeGroup> = buckets
        .into_iter()
        .map(|(size, files)| SizeGroup { size, files })
        .collect();
    groups.sort_unstable_by(|a, b| b.size.cmp(&a.size));
    (groups, stats)
}
