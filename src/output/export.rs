//! Plain-text export of duplicate sets.
//!
//! Each set is written as one member path per line followed by a blank line.
//! The file is opened in append mode so repeated exports accumulate.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::item::LINE_ENDING;
use crate::duplicates::DuplicateSet;

/// Appends duplicate sets to a text file.
#[derive(Debug)]
pub struct ExportFile {
    path: PathBuf,
    writer: BufWriter<File>,
    sets_written: usize,
}

impl ExportFile {
    /// Open `path` for appending, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            sets_written: 0,
        })
    }

    /// Path of the export file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of sets written so far.
    #[must_use]
    pub fn sets_written(&self) -> usize {
        self.sets_written
    }

    /// Append one set.
    ///
    /// # Errors
    ///
    /// Returns the I/O error on write failure.
    pub fn write_set(&mut self, set: &DuplicateSet) -> io::Result<()> {
        for member in &set.members {
            write!(self.writer, "{}{}", member.path.display(), LINE_ENDING)?;
        }
        self.writer.write_all(LINE_ENDING.as_bytes())?;
        self.sets_written += 1;
        Ok(())
    }

    /// Append every set in `sets`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error encountered.
    pub fn write_all(&mut self, sets: &[DuplicateSet]) -> io::Result<()> {
        for set in sets {
            self.write_set(set)?;
        }
        self.flush()
    }

    /// Flush buffered content to disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error on flush failure.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
