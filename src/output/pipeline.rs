//! Single-consumer output pipeline.
//!
//! # Overview
//!
//! Producers push [`OutputItem`]s through a cloneable [`OutputHandle`]. A
//! dedicated worker thread blocks on an unbounded crossbeam channel and
//! delivers each item to every registered sink, in enqueue order. Deferred
//! items are parked in a separate queue until [`OutputHandle::flush_deferred`]
//! is called.
//!
//! # Lifecycle
//!
//! `Running -> Draining -> Closed`. [`OutputPipeline::shutdown`] moves to
//! `Draining`, lets the worker finish, then closes the pipeline and delivers
//! whatever is still queued before returning. Nothing already enqueued is lost,
//! whether the run completed or was cancelled.
//!
//! # Example
//!
//! ```
//! use dupefinder::output::{MemorySink, OutputItem, OutputPipeline};
//!
//! let memory = MemorySink::new();
//! let pipeline = OutputPipeline::builder()
//!     .with_sink(Box::new(memory.clone()))
//!     .build()
//!     .unwrap();
//!
//! let output = pipeline.handle();
//! output.ingest(OutputItem::new("summary").deferred(true));
//! output.ingest(OutputItem::new("progress"));
//! output.flush_deferred();
//! pipeline.shutdown();
//!
//! assert_eq!(memory.messages(), vec!["progress", "summary"]);
//! ```

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rayon::prelude::*;

use super::item::OutputItem;
use super::sink::{LogFileSink, OutputSink};

/// Lifecycle state of an [`OutputPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Accepting and delivering items.
    Running,
    /// Shutdown requested; queued items are still being delivered.
    Draining,
    /// Worker stopped; further items are rejected.
    Closed,
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Items delivered to the sinks
    pub delivered: usize,
    /// Sink writes that failed and were swallowed
    pub sink_failures: usize,
    /// Items refused because the pipeline was closed
    pub rejected: usize,
    /// Deferred items waiting for a flush
    pub deferred_pending: usize,
}

/// Errors raised while building the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// The log file could not be opened.
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        /// Requested log file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The worker thread could not be started.
    #[error("Failed to start output worker: {0}")]
    Spawn(#[source] io::Error),
}

enum Message {
    Item(OutputItem),
    Barrier(Sender<()>),
    Shutdown,
}

type Sinks = Vec<Box<dyn OutputSink>>;

#[derive(Default)]
struct Counters {
    delivered: AtomicUsize,
    sink_failures: AtomicUsize,
    rejected: AtomicUsize,
}

struct Shared {
    state: RwLock<PipelineState>,
    deferred: Mutex<VecDeque<OutputItem>>,
    counters: Counters,
}

impl Shared {
    fn state(&self) -> PipelineState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: PipelineState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn reject(&self, item: &OutputItem) {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            "Output pipeline closed, dropping message: {}",
            item.message.trim_end()
        );
    }
}

/// Cloneable producer handle for an [`OutputPipeline`].
#[derive(Clone)]
pub struct OutputHandle {
    sender: Sender<Message>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHandle")
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}

impl OutputHandle {
    /// Queue an item for delivery.
    ///
    /// Discarded items are dropped without a trace. Deferred items wait for
    /// [`flush_deferred`](Self::flush_deferred). Safe to call from any thread.
    pub fn ingest(&self, item: impl Into<OutputItem>) {
        let item = item.into();
        if item.discard {
            return;
        }

        // Hold the read lock across the send so shutdown cannot close the
        // channel between the state check and the enqueue.
        let state = self.shared.state.read().unwrap_or_else(PoisonError::into_inner);
        if *state == PipelineState::Closed {
            drop(state);
            self.shared.reject(&item);
            return;
        }

        if item.deferred {
            self.shared
                .deferred
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(item);
            return;
        }

        if let Err(e) = self.sender.send(Message::Item(item)) {
            drop(state);
            if let Message::Item(item) = e.into_inner() {
                self.shared.reject(&item);
            }
        }
    }

    /// Block until every item enqueued so far has been delivered.
    pub fn wait_drained(&self) {
        let (tx, rx) = bounded(1);
        if self.sender.send(Message::Barrier(tx)).is_ok() {
            // Err means the worker is gone; nothing left to wait for.
            let _ = rx.recv();
        }
    }

    /// Deliver all deferred items, in their enqueue order, after the
    /// immediate queue has drained. Blocks until they are delivered.
    ///
    /// A second call only delivers items deferred since the first.
    pub fn flush_deferred(&self) {
        self.wait_drained();

        let pending: Vec<OutputItem> = self
            .shared
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if pending.is_empty() {
            return;
        }

        log::debug!("Flushing {} deferred output item(s)", pending.len());
        {
            let state = self.shared.state.read().unwrap_or_else(PoisonError::into_inner);
            for item in pending {
                if *state == PipelineState::Closed {
                    self.shared.reject(&item);
                } else if let Err(e) = self.sender.send(Message::Item(item)) {
                    if let Message::Item(item) = e.into_inner() {
                        self.shared.reject(&item);
                    }
                }
            }
        }
        self.wait_drained();
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    /// Snapshot of the delivery counters.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        let counters = &self.shared.counters;
        PipelineStats {
            delivered: counters.delivered.load(Ordering::Relaxed),
            sink_failures: counters.sink_failures.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            deferred_pending: self
                .shared
                .deferred
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

/// Builder for [`OutputPipeline`].
#[derive(Default)]
pub struct OutputPipelineBuilder {
    sinks: Sinks,
    log_path: Option<PathBuf>,
    report_log_path: bool,
}

impl OutputPipelineBuilder {
    /// Register a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn OutputSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Append every item to a log file at `path`.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Print the log file location on shutdown.
    #[must_use]
    pub fn with_report_log_path(mut self, report: bool) -> Self {
        self.report_log_path = report;
        self
    }

    /// Open the log file and start the worker.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError`] if the log file cannot be opened or the worker
    /// thread cannot be spawned.
    pub fn build(mut self) -> Result<OutputPipeline, OutputError> {
        if let Some(path) = &self.log_path {
            let sink = LogFileSink::create(path).map_err(|source| OutputError::LogFile {
                path: path.clone(),
                source,
            })?;
            self.sinks.push(Box::new(sink));
        }

        let (sender, receiver) = unbounded();
        let shared = Arc::new(Shared {
            state: RwLock::new(PipelineState::Running),
            deferred: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        });

        let worker_shared = Arc::clone(&shared);
        let sinks = self.sinks;
        log::debug!("Starting output pipeline with {} sink(s)", sinks.len());
        let worker = thread::Builder::new()
            .name("output-pipeline".to_string())
            .spawn(move || run_worker(receiver, sinks, &worker_shared))
            .map_err(OutputError::Spawn)?;

        Ok(OutputPipeline {
            handle: OutputHandle { sender, shared },
            worker: Some(worker),
            log_path: self.log_path,
            report_log_path: self.report_log_path,
        })
    }
}

/// Queue-backed pipeline serializing output to its sinks.
///
/// Dropping the pipeline performs the same drain as
/// [`shutdown`](Self::shutdown).
pub struct OutputPipeline {
    handle: OutputHandle,
    worker: Option<JoinHandle<(Receiver<Message>, Sinks)>>,
    log_path: Option<PathBuf>,
    report_log_path: bool,
}

impl std::fmt::Debug for OutputPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputPipeline")
            .field("state", &self.handle.state())
            .field("log_path", &self.log_path)
            .finish_non_exhaustive()
    }
}

impl OutputPipeline {
    /// Start building a pipeline.
    #[must_use]
    pub fn builder() -> OutputPipelineBuilder {
        OutputPipelineBuilder::default()
    }

    /// A new producer handle.
    #[must_use]
    pub fn handle(&self) -> OutputHandle {
        self.handle.clone()
    }

    /// Shorthand for [`OutputHandle::ingest`].
    pub fn ingest(&self, item: impl Into<OutputItem>) {
        self.handle.ingest(item);
    }

    /// Shorthand for [`OutputHandle::flush_deferred`].
    pub fn flush_deferred(&self) {
        self.handle.flush_deferred();
    }

    /// Path of the per-run log file, if one was configured.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.handle.state()
    }

    /// Snapshot of the delivery counters.
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.handle.stats()
    }

    /// Drain every queued item, stop the worker and close the pipeline.
    ///
    /// Returns the final counters. Deferred items that were never flushed are
    /// reported with a warning.
    pub fn shutdown(mut self) -> PipelineStats {
        self.close();
        self.handle.stats()
    }

    fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.handle.shared.set_state(PipelineState::Draining);
        // The worker holds a receiver, so this send cannot fail while it runs.
        let _ = self.handle.sender.send(Message::Shutdown);

        match worker.join() {
            Ok((receiver, mut sinks)) => {
                self.handle.shared.set_state(PipelineState::Closed);
                // Items sent after the shutdown marker but before the state
                // flipped to Closed are still in the channel.
                for message in receiver.try_iter() {
                    handle_message(message, &mut sinks, &self.handle.shared);
                }
                flush_sinks(&mut sinks);
            }
            Err(_) => {
                self.handle.shared.set_state(PipelineState::Closed);
                log::error!("Output worker panicked; remaining output is lost");
            }
        }

        let pending = self
            .handle
            .shared
            .deferred
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        if pending > 0 {
            log::warn!(
                "{} deferred output item(s) were never flushed before shutdown",
                pending
            );
        }

        if self.report_log_path {
            if let Some(path) = &self.log_path {
                println!("Logs are saved to {}", path.display());
            }
        }
        log::debug!("Output pipeline closed: {:?}", self.handle.stats());
    }
}

impl Drop for OutputPipeline {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(
    receiver: Receiver<Message>,
    mut sinks: Sinks,
    shared: &Shared,
) -> (Receiver<Message>, Sinks) {
    while let Ok(message) = receiver.recv() {
        if matches!(message, Message::Shutdown) {
            break;
        }
        handle_message(message, &mut sinks, shared);
    }
    flush_sinks(&mut sinks);
    (receiver, sinks)
}

fn handle_message(message: Message, sinks: &mut Sinks, shared: &Shared) {
    match message {
        Message::Item(item) => deliver(sinks, &item, shared),
        Message::Barrier(done) => {
            flush_sinks(sinks);
            let _ = done.send(());
        }
        Message::Shutdown => {}
    }
}

/// Write `item` to every sink concurrently. Failures are counted and
/// swallowed so one sink never holds up another.
fn deliver(sinks: &mut Sinks, item: &OutputItem, shared: &Shared) {
    let failures: usize = sinks
        .par_iter_mut()
        .map(|sink| match sink.deliver(item) {
            Ok(()) => 0,
            Err(e) => {
                log::debug!("Output sink '{}' failed: {}", sink.name(), e);
                1
            }
        })
        .sum();

    shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
    if failures > 0 {
        shared
            .counters
            .sink_failures
            .fetch_add(failures, Ordering::Relaxed);
    }
}

fn flush_sinks(sinks: &mut Sinks) {
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.flush() {
            log::debug!("Output sink '{}' failed to flush: {}", sink.name(), e);
        }
    }
}
