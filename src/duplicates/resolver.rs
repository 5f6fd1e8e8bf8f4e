//! Canonical file election for verified duplicate sets.
//!
//! Within a set of byte-identical files exactly one member is kept in place:
//! the one with the earliest creation time, then the earliest modification
//! time, then the first one enumerated. Every other member is a duplicate.

use std::path::PathBuf;

use crate::scanner::FileRecord;

/// A set of files verified to hold identical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSet {
    /// Size in bytes shared by every member
    pub size: u64,
    /// Members in enumeration order
    pub members: Vec<FileRecord>,
    /// Index of the canonical member in `members`
    pub canonical: usize,
}

impl DuplicateSet {
    /// The member kept in place.
    #[must_use]
    pub fn canonical(&self) -> &FileRecord {
        &self.members[self.canonical]
    }

    /// Members other than the canonical one.
    pub fn duplicates(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.canonical)
            .map(|(_, record)| record)
    }

    /// Paths of all members.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.members.iter().map(|f| f.path.clone()).collect()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for sets built by [`DuplicateResolver`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of non-canonical members.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Bytes reclaimable by removing every duplicate.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }
}

/// Elects the canonical member of a duplicate set.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateResolver;

impl DuplicateResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Index of the canonical member, or `None` for an empty slice.
    ///
    /// Lowest `(created_at, modified_at)` wins; on a full tie the earliest
    /// index wins.
    #[must_use]
    pub fn elect(&self, members: &[FileRecord]) -> Option<usize> {
        // min_by_key returns the first of several equal minima.
        members
            .iter()
            .enumerate()
            .min_by_key(|(_, f)| (f.created_at, f.modified_at))
            .map(|(i, _)| i)
    }

    /// Build a [`DuplicateSet`] from verified members.
    #[must_use]
    pub fn resolve(&self, size: u64, members: Vec<FileRecord>) -> Option<DuplicateSet> {
        let canonical = self.elect(&members)?;
        log::debug!(
            "Canonical file for {}-byte set of {}: {}",
            size,
            members.len(),
            members[canonical].path.display()
        );
        Some(DuplicateSet {
            size,
            members,
            canonical,
        })
    }
}
