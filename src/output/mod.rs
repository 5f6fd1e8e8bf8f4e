//! User-facing output: the message pipeline, its sinks and the export file.
//!
//! Every line the user sees goes through an [`OutputPipeline`], which writes
//! it to the console and the per-run log file from a single worker thread.
//! Diagnostic logging (`log` macros) is separate and goes to stderr.
//!
//! # Example
//!
//! ```no_run
//! use dupefinder::output::{ConsoleSink, OutputItem, OutputPipeline, Severity};
//!
//! let pipeline = OutputPipeline::builder()
//!     .with_sink(Box::new(ConsoleSink::new(true)))
//!     .with_log_file("/tmp/dupefinder.log")
//!     .build()
//!     .unwrap();
//!
//! pipeline.ingest(OutputItem::new("Done. ").severity(Severity::Success));
//! pipeline.shutdown();
//! ```

pub mod export;
pub mod item;
pub mod pipeline;
pub mod sink;

use chrono::{DateTime, Local};

pub use export::ExportFile;
pub use item::{OutputItem, Severity, LINE_ENDING};
pub use pipeline::{
    OutputError, OutputHandle, OutputPipeline, OutputPipelineBuilder, PipelineState,
    PipelineStats,
};
pub use sink::{ConsoleSink, LogFileSink, MemorySink, OutputSink};

/// Timestamp used in per-run file names: `YYYYMMDD.HHMMSS.ffffff`.
#[must_use]
pub fn run_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d.%H%M%S.%6f").to_string()
}

/// File name of the per-run log file.
#[must_use]
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("{}.log", run_timestamp(now))
}

/// File name of the per-run export file.
#[must_use]
pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("duplicates.{}.txt", run_timestamp(now))
}
