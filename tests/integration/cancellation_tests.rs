use dupefinder::app::{execute, RunOptions};
use dupefinder::duplicates::{ChunkSize, DuplicateFinder, FinderConfig};
use dupefinder::error::ExitCode;
use dupefinder::output::MemorySink;
use dupefinder::scanner::{FileRecord, RecordSource, ScanError};
use dupefinder::signal::CancelToken;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Yields its records and requests cancellation after the last one.
struct CancellingSource {
    records: Vec<FileRecord>,
    token: CancelToken,
}

impl RecordSource for CancellingSource {
    fn records<'a>(
        &'a self,
        _root: &'a Path,
    ) -> Box<dyn Iterator<Item = Result<FileRecord, ScanError>> + 'a> {
        let last = self.records.len();
        Box::new(self.records.iter().enumerate().map(move |(i, record)| {
            if i + 1 == last {
                self.token.cancel();
            }
            Ok(record.clone())
        }))
    }
}

#[test]
fn test_cancel_during_scan_stops_before_comparing() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"same").unwrap();
    fs::write(dir.path().join("b"), b"same").unwrap();
    let records = vec![
        FileRecord::capture(&dir.path().join("a")).unwrap(),
        FileRecord::capture(&dir.path().join("b")).unwrap(),
    ];

    let token = CancelToken::new();
    let source = CancellingSource {
        records,
        token: token.clone(),
    };
    let finder = DuplicateFinder::with_source(
        FinderConfig::default().with_cancel_token(token.clone()),
        Box::new(source),
    );
    let (sets, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.comparisons, 0);
    assert!(sets.is_empty());
}

#[test]
fn test_cancelled_run_still_drains_output() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::write(root.path().join("a"), b"same").unwrap();
    fs::write(root.path().join("b"), b"same").unwrap();

    let token = CancelToken::new();
    token.cancel();
    let memory = MemorySink::new();
    let options = RunOptions {
        roots: vec![root.path().to_path_buf()],
        recursive: false,
        verbose: true,
        export: false,
        relocate: true,
        output_dir: out.path().to_path_buf(),
        chunk_size: ChunkSize::default(),
        include_empty: false,
        color: false,
    };

    let report = execute(&options, &token, Box::new(memory.clone())).unwrap();
    assert_eq!(report.exit_code(), ExitCode::Interrupted);

    let messages = memory.messages();
    let cancel_at = messages
        .iter()
        .position(|m| m == "User requested to cancel the operations ....")
        .unwrap();
    let done_at = messages.iter().position(|m| m == "Done. ").unwrap();
    assert!(cancel_at < done_at);

    // Everything delivered to the console also made it into the log.
    let log = fs::read_to_string(report.log_path.unwrap()).unwrap();
    assert!(log.contains("User requested to cancel the operations ...."));
    assert!(log.contains("Done. "));
    assert_eq!(report.output_stats.delivered, messages.len());
}

#[test]
fn test_token_reset_allows_new_run() {
    let token = CancelToken::new();
    token.cancel();
    token.reset();
    assert!(!token.is_cancelled());
}
