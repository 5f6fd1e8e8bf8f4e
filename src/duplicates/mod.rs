//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping
//! - Chunked byte-for-byte content comparison
//! - Canonical file election per duplicate set
//! - The finder that drives all three over one or more roots

pub mod comparator;
pub mod finder;
pub mod groups;
pub mod resolver;

pub use comparator::{
    adaptive_chunk_size, streams_equal, ChunkSize, CompareError, ContentComparator,
    DEFAULT_CHUNK_SIZE,
};
pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{group_by_size, sorted_size_groups, GroupingStats, SizeGroup};
pub use resolver::{DuplicateResolver, DuplicateSet};
