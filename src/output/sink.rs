//! Destinations for output items.
//!
//! # Overview
//!
//! The pipeline worker fans each item out to every registered [`OutputSink`].
//! Three sinks ship with the crate:
//!
//! - [`ConsoleSink`]: colored terminal output via crossterm
//! - [`LogFileSink`]: append-only UTF-8 log file
//! - [`MemorySink`]: in-memory capture for tests and embedding

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::style::{Print, ResetColor, SetForegroundColor};
use crossterm::QueueableCommand;

use super::item::OutputItem;

/// A destination for output items.
///
/// Sinks are driven from the single pipeline worker, one item at a time, so
/// implementations need `Send` but not `Sync`.
pub trait OutputSink: Send {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Write a regular item.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_info(&mut self, item: &OutputItem) -> io::Result<()>;

    /// Write an error-flagged item.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_error(&mut self, item: &OutputItem) -> io::Result<()>;

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn flush(&mut self) -> io::Result<()>;

    /// Route `item` to [`write_error`](Self::write_error) or
    /// [`write_info`](Self::write_info).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn deliver(&mut self, item: &OutputItem) -> io::Result<()> {
        if item.is_error {
            self.write_error(item)
        } else {
            self.write_info(item)
        }
    }
}

/// Terminal sink writing to stdout, or stderr for error items.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    color: bool,
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl ConsoleSink {
    /// Console sink on the process stdout/stderr.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), color)
    }

    /// Console sink on arbitrary writers.
    #[must_use]
    pub fn with_writers(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        color: bool,
    ) -> Self {
        Self { out, err, color }
    }

    fn write_to(
        writer: &mut (dyn Write + Send),
        item: &OutputItem,
        color: bool,
    ) -> io::Result<()> {
        if color {
            if let Some(c) = item.severity.color() {
                writer.queue(SetForegroundColor(c))?;
            }
        }
        writer.queue(Print(item.console_text()))?;
        if color && item.needs_color_reset() {
            writer.queue(ResetColor)?;
        }
        writer.flush()
    }
}

impl OutputSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn write_info(&mut self, item: &OutputItem) -> io::Result<()> {
        Self::write_to(self.out.as_mut(), item, self.color)
    }

    fn write_error(&mut self, item: &OutputItem) -> io::Result<()> {
        Self::write_to(self.err.as_mut(), item, self.color)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

/// Append-only log file sink.
#[derive(Debug)]
pub struct LogFileSink {
    path: PathBuf,
    file: File,
}

impl LogFileSink {
    /// Open (or create) the log file at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory or file cannot be created.
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        log::debug!("Log file opened: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, item: &OutputItem) -> io::Result<()> {
        self.file.write_all(item.log_text().as_bytes())
    }
}

impl OutputSink for LogFileSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn write_info(&mut self, item: &OutputItem) -> io::Result<()> {
        self.append(item)
    }

    fn write_error(&mut self, item: &OutputItem) -> io::Result<()> {
        self.append(item)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Sink that keeps every delivered item in memory.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// pipeline and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    items: Arc<Mutex<Vec<OutputItem>>>,
}

impl MemorySink {
    /// An empty sink. Clones share the same buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of delivered items, in delivery order.
    #[must_use]
    pub fn items(&self) -> Vec<OutputItem> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages of delivered items, in delivery order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.items().into_iter().map(|i| i.message).collect()
    }

    fn push(&self, item: &OutputItem) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item.clone());
    }
}

impl OutputSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write_info(&mut self, item: &OutputItem) -> io::Result<()> {
        self.push(item);
        Ok(())
    }

    fn write_error(&mut self, item: &OutputItem) -> io::Result<()> {
        self.push(item);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
