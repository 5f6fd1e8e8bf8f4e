//! File actions applied to confirmed duplicates.
//!
//! # Relocation
//!
//! Duplicates are moved, not deleted: each non-canonical member goes to a
//! `_duplicate` sibling of its scan root, mirroring its relative path.
//!
//! ```no_run
//! use dupefinder::actions::relocate::destination_for;
//! use std::path::{Path, PathBuf};
//!
//! let roots = vec![PathBuf::from("/data/photos")];
//! let to = destination_for(&roots, Path::new("/data/photos/2020/a.jpg"));
//! assert_eq!(to, Some(PathBuf::from("/data/photos_duplicate/2020/a.jpg")));
//! ```

pub mod relocate;

pub use relocate::{
    destination_for, duplicate_root, move_file, owning_root, RelocateError, Relocation,
    RelocationReport, Relocator,
};
