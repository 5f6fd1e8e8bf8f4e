//! Application entry: resolves options, runs one scan and reports it.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use chrono::Local;

use crate::actions::{RelocationReport, Relocator};
use crate::cli::Cli;
use crate::config::Settings;
use crate::duplicates::{ChunkSize, DuplicateFinder, DuplicateSet, FinderConfig, ScanSummary};
use crate::error::{AppError, ExitCode};
use crate::output::{
    export_file_name, log_file_name, ConsoleSink, ExportFile, OutputHandle, OutputItem,
    OutputPipeline, OutputSink, PipelineStats, Severity,
};
use crate::scanner::WalkerConfig;
use crate::signal::{self, CancelToken};

/// Fully resolved options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Canonical root directories, each named once.
    pub roots: Vec<PathBuf>,
    pub recursive: bool,
    pub verbose: bool,
    pub export: bool,
    pub relocate: bool,
    /// Where the run log and export file are written.
    pub output_dir: PathBuf,
    pub chunk_size: ChunkSize,
    pub include_empty: bool,
    pub color: bool,
}

impl RunOptions {
    /// Merge command-line flags over settings and validate the roots.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] naming the first root that is not
    /// an existing directory.
    ///
    /// Roots are canonicalized, so `dir`, `dir/sub/..` and a symlink to `dir`
    /// all collapse to one root.
    pub fn resolve(cli: &Cli, settings: &Settings) -> Result<Self, AppError> {
        let dirs = if cli.dirs.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            cli.dirs.clone()
        };

        let mut roots = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let canonical = match std::fs::canonicalize(&dir) {
                Ok(path) if path.is_dir() => path,
                _ => {
                    return Err(AppError::Configuration(format!(
                        "Target folder not exists: {}",
                        dir.display()
                    )))
                }
            };
            if roots.contains(&canonical) {
                log::debug!("{} repeats an earlier root", dir.display());
                continue;
            }
            roots.push(canonical);
        }

        let chunk_size = cli
            .chunk_size
            .or(settings.chunk_size)
            .map(ChunkSize::from_bytes)
            .unwrap_or_default();

        Ok(Self {
            roots,
            recursive: cli.recursive,
            verbose: cli.verbose > 0,
            export: cli.export,
            relocate: cli.relocate,
            output_dir: cli.output_dir.clone().unwrap_or_else(|| settings.output_dir()),
            chunk_size,
            include_empty: cli.include_empty || settings.include_empty,
            color: settings.color && !cli.no_color,
        })
    }
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub sets: Vec<DuplicateSet>,
    pub summary: ScanSummary,
    pub relocation: RelocationReport,
    pub export_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub output_stats: PipelineStats,
    /// Cancelled at any point, including during relocation.
    pub interrupted: bool,
}

impl RunReport {
    /// Map the outcome to a process exit code.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.interrupted {
            ExitCode::Interrupted
        } else if !self.relocation.all_succeeded() || !self.summary.scan_errors.is_empty() {
            ExitCode::PartialSuccess
        } else if self.sets.is_empty() {
            ExitCode::NoDuplicates
        } else {
            ExitCode::Success
        }
    }
}

/// Run the application with the process-wide Ctrl+C handler installed.
///
/// # Errors
///
/// Fails if the signal handler cannot be installed, a root is not a
/// directory, or the run log cannot be created.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let token = signal::install_handler()?;
    run_app_with_token(cli, token)
}

/// Like [`run_app`], observing `token` instead of installing a handler.
///
/// # Errors
///
/// See [`run_app`].
pub fn run_app_with_token(cli: Cli, token: CancelToken) -> anyhow::Result<ExitCode> {
    let settings = Settings::load();
    let options = RunOptions::resolve(&cli, &settings)?;
    let console = ConsoleSink::new(options.color);
    let report = execute(&options, &token, Box::new(console))?;
    Ok(report.exit_code())
}

/// Scan, report, export and relocate according to `options`.
///
/// `console` receives the user-facing stream alongside the per-run log file.
///
/// # Errors
///
/// Fails before any scanning if the output pipeline cannot start.
pub fn execute(
    options: &RunOptions,
    token: &CancelToken,
    console: Box<dyn OutputSink>,
) -> Result<RunReport, AppError> {
    let started = Instant::now();
    let now = Local::now();

    let pipeline = OutputPipeline::builder()
        .with_sink(console)
        .with_log_file(options.output_dir.join(log_file_name(now)))
        .with_report_log_path(true)
        .build()?;
    let output = pipeline.handle();
    let log_path = pipeline.log_path().map(PathBuf::from);

    announce_roots(&output, &options.roots);

    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_walker_config(
                WalkerConfig::new(options.recursive).with_include_empty(options.include_empty),
            )
            .with_chunk_size(options.chunk_size)
            .with_verbose(options.verbose)
            .with_cancel_token(token.clone())
            .with_output(output.clone()),
    );
    let (sets, summary) = finder
        .find_duplicates(&options.roots)
        .map_err(|e| AppError::Configuration(e.to_string()))?;

    for error in &summary.scan_errors {
        output.ingest(
            OutputItem::new(format!("Could not read \"{}\".", error.path().display()))
                .severity(Severity::Warning)
                .with_attached_error(error)
                .deferred(options.verbose),
        );
    }

    let export_path = if options.export {
        export_sets(&output, &options.output_dir.join(export_file_name(now)), &sets)
    } else {
        None
    };

    let mut relocation = RelocationReport::default();
    if options.relocate && !summary.interrupted {
        relocation = relocate_sets(&output, token, &options.roots, &sets);
    }

    let interrupted = summary.interrupted || token.is_cancelled();
    if interrupted {
        output.ingest(
            OutputItem::new("User requested to cancel the operations ....")
                .severity(Severity::DarkWarning)
                .deferred(true),
        );
    }

    output.ingest(OutputItem::new("------ Final Results").discard(!options.verbose));
    pipeline.flush_deferred();

    output.ingest(OutputItem::new("Done. ").inline().severity(Severity::DarkSuccess));
    output.ingest(
        OutputItem::new(format!("Elapsed {}. ", format_elapsed(started.elapsed())))
            .inline()
            .severity(Severity::Verbose),
    );
    output.ingest(OutputItem::new(summary_line(&summary, &relocation)).severity(Severity::Success));

    log::info!(
        "Run finished: {} set(s), {} comparison(s) in {:?}",
        summary.duplicate_groups,
        summary.comparisons,
        summary.scan_duration
    );

    let output_stats = pipeline.shutdown();

    Ok(RunReport {
        sets,
        summary,
        relocation,
        export_path,
        log_path,
        output_stats,
        interrupted,
    })
}

fn announce_roots(output: &OutputHandle, roots: &[PathBuf]) {
    output.ingest(OutputItem::new("Scanning following folders:").severity(Severity::Default));
    for root in roots {
        output.ingest(
            OutputItem::new("\u{2192} ")
                .inline()
                .severity(Severity::DarkSuccess),
        );
        output.ingest(OutputItem::new(root.display().to_string()).severity(Severity::Success));
    }
    output.ingest(OutputItem::new(""));
}

fn export_sets(output: &OutputHandle, path: &std::path::Path, sets: &[DuplicateSet]) -> Option<PathBuf> {
    let result = ExportFile::create(path).and_then(|mut file| {
        file.write_all(sets)?;
        file.flush()?;
        Ok(file.sets_written())
    });

    match result {
        Ok(written) => {
            log::info!("Exported {} set(s) to {}", written, path.display());
            output.ingest(
                OutputItem::new(format!("Duplicates are exported to {}", path.display()))
                    .severity(Severity::Success),
            );
            Some(path.to_path_buf())
        }
        Err(e) => {
            log::error!("Export to {} failed: {}", path.display(), e);
            output.ingest(
                OutputItem::new(format!("Could not export duplicates to {}", path.display()))
                    .severity(Severity::Error)
                    .error()
                    .with_attached_error(e),
            );
            None
        }
    }
}

fn relocate_sets(
    output: &OutputHandle,
    token: &CancelToken,
    roots: &[PathBuf],
    sets: &[DuplicateSet],
) -> RelocationReport {
    let relocator = Relocator::new(roots.to_vec());
    let mut report = RelocationReport::default();

    for set in sets {
        if token.is_cancelled() {
            break;
        }

        let original = set.canonical().path.display().to_string();
        let set_report = relocator.relocate_set(set);
        for moved in &set_report.moved {
            output.ingest(
                OutputItem::new(format!(
                    "Moved duplicate file \"{}\" to \"{}\", original file is \"{}\".",
                    moved.from.display(),
                    moved.to.display(),
                    original
                ))
                .severity(Severity::DarkVerbose),
            );
        }
        for (path, message) in &set_report.failures {
            output.ingest(
                OutputItem::new(format!("Could not move duplicate file \"{}\".", path.display()))
                    .severity(Severity::Warning)
                    .with_attached_error(message),
            );
        }
        report.merge(set_report);
    }

    log::info!("{}", report.summary());
    report
}

/// Format a duration as `hh:mm:ss`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn summary_line(summary: &ScanSummary, relocation: &RelocationReport) -> String {
    let mut line = format!(
        "{} duplicate set(s), {} duplicate file(s), {} reclaimable.",
        summary.duplicate_groups,
        summary.duplicate_files,
        summary.reclaimable_display()
    );
    if !relocation.moved.is_empty() || !relocation.failures.is_empty() {
        line.push(' ');
        line.push_str(&relocation.summary());
        line.push_str(&format!(" ({}).", ByteSize::b(relocation.bytes_moved())));
    }
    line
}
