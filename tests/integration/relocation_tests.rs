use clap::Parser;
use dupefinder::actions::{duplicate_root, Relocator};
use dupefinder::app::{execute, RunOptions};
use dupefinder::cli::Cli;
use dupefinder::config::Settings;
use dupefinder::duplicates::{ChunkSize, DuplicateFinder, FinderConfig};
use dupefinder::error::ExitCode;
use dupefinder::output::MemorySink;
use dupefinder::scanner::WalkerConfig;
use dupefinder::signal::CancelToken;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// `A/x` and `B/x` hold the same 1024 bytes; `A/x` is older.
fn two_roots(base: &Path) -> (PathBuf, PathBuf) {
    let a = base.join("A");
    let b = base.join("B");
    fs::create_dir_all(&a).unwrap();
    fs::create_dir_all(&b).unwrap();

    let content = vec![0x5Au8; 1024];
    fs::write(a.join("x"), &content).unwrap();
    thread::sleep(Duration::from_millis(20));
    fs::write(b.join("x"), &content).unwrap();
    fs::write(a.join("only_here"), b"unique to A").unwrap();

    set_file_mtime(a.join("x"), FileTime::from_unix_time(1_000_000, 0)).unwrap();
    (a, b)
}

fn run_options(roots: Vec<PathBuf>, output_dir: &Path) -> RunOptions {
    RunOptions {
        roots,
        recursive: true,
        verbose: false,
        export: false,
        relocate: true,
        output_dir: output_dir.to_path_buf(),
        chunk_size: ChunkSize::default(),
        include_empty: false,
        color: false,
    }
}

#[test]
fn test_end_to_end_relocation() {
    let base = tempdir().unwrap();
    let out = tempdir().unwrap();
    let (a, b) = two_roots(base.path());

    let memory = MemorySink::new();
    let report = execute(
        &run_options(vec![a.clone(), b.clone()], out.path()),
        &CancelToken::new(),
        Box::new(memory.clone()),
    )
    .unwrap();

    assert_eq!(report.sets.len(), 1);
    assert_eq!(report.sets[0].len(), 2);
    assert_eq!(report.sets[0].canonical().path, a.join("x"));
    assert_eq!(report.exit_code(), ExitCode::Success);

    assert!(a.join("x").exists());
    assert!(!b.join("x").exists());
    assert!(base.path().join("B_duplicate/x").exists());
    assert_eq!(report.relocation.success_count(), 1);

    let expected = format!(
        "Moved duplicate file \"{}\" to \"{}\", original file is \"{}\".",
        b.join("x").display(),
        base.path().join("B_duplicate/x").display(),
        a.join("x").display()
    );
    assert!(memory.messages().contains(&expected));
}

#[test]
fn test_relocation_preserves_relative_structure() {
    let base = tempdir().unwrap();
    let root = base.path().join("photos");
    fs::create_dir_all(root.join("2020/summer")).unwrap();
    fs::write(root.join("keep.jpg"), b"pixels").unwrap();
    fs::write(root.join("2020/summer/copy.jpg"), b"pixels").unwrap();
    set_file_mtime(root.join("keep.jpg"), FileTime::from_unix_time(1_000, 0)).unwrap();

    let finder =
        DuplicateFinder::new(FinderConfig::default().with_walker_config(WalkerConfig::new(true)));
    let (sets, _) = finder.find_duplicates(&[root.clone()]).unwrap();
    assert_eq!(sets.len(), 1);

    let relocator = Relocator::new(vec![root.clone()]);
    let report = relocator.relocate_set(&sets[0]);

    assert!(report.all_succeeded());
    let moved = &report.moved[0];
    assert_eq!(moved.from, root.join("2020/summer/copy.jpg"));
    assert_eq!(moved.to, duplicate_root(&root).join("2020/summer/copy.jpg"));
    assert!(moved.to.exists());
    assert!(root.join("keep.jpg").exists());
}

#[test]
fn test_relocation_overwrites_existing_destination() {
    let base = tempdir().unwrap();
    let out = tempdir().unwrap();
    let (a, b) = two_roots(base.path());
    fs::create_dir_all(base.path().join("B_duplicate")).unwrap();
    fs::write(base.path().join("B_duplicate/x"), b"stale").unwrap();

    let report = execute(
        &run_options(vec![a, b], out.path()),
        &CancelToken::new(),
        Box::new(MemorySink::new()),
    )
    .unwrap();

    assert!(report.relocation.all_succeeded());
    assert_eq!(fs::read(base.path().join("B_duplicate/x")).unwrap(), vec![0x5Au8; 1024]);
}

#[test]
fn test_run_app_missing_folder() {
    let out = tempdir().unwrap();
    let cli = Cli::try_parse_from([
        "dupefinder",
        "-o",
        out.path().to_str().unwrap(),
        "/nonexistent/dupefinder/root",
    ])
    .unwrap();

    let err = dupefinder::run_app_with_token(cli, CancelToken::new()).unwrap_err();
    assert!(err.to_string().starts_with("Target folder not exists:"));
    // Validation happens before the pipeline, so no log file is created.
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_run_app_relocates() {
    let base = tempdir().unwrap();
    let out = tempdir().unwrap();
    let (a, b) = two_roots(base.path());

    let cli = Cli::try_parse_from([
        "dupefinder",
        "-r",
        "-m",
        "--no-color",
        "-o",
        out.path().to_str().unwrap(),
        a.to_str().unwrap(),
        b.to_str().unwrap(),
    ])
    .unwrap();

    let code = dupefinder::run_app_with_token(cli, CancelToken::new()).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(base.path().join("B_duplicate/x").exists());

    let logs: Vec<_> = fs::read_dir(out.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .collect();
    assert_eq!(logs.len(), 1);
    let log = fs::read_to_string(logs[0].path()).unwrap();
    assert!(log.contains("Moved duplicate file"));
}

fn resolve_and_run(args: &[&str]) -> dupefinder::app::RunReport {
    let cli = Cli::try_parse_from(args).unwrap();
    let options = RunOptions::resolve(&cli, &Settings::default()).unwrap();
    execute(&options, &CancelToken::new(), Box::new(MemorySink::new())).unwrap()
}

#[test]
fn test_dot_dot_alias_root_never_relocates_the_only_copy() {
    let base = tempdir().unwrap();
    let out = tempdir().unwrap();
    let data = base.path().join("data");
    fs::create_dir_all(data.join("sub")).unwrap();
    fs::write(data.join("only.bin"), b"the one and only").unwrap();
    let alias = data.join("sub/..");

    let report = resolve_and_run(&[
        "dupefinder",
        "-r",
        "-m",
        "-o",
        out.path().to_str().unwrap(),
        data.to_str().unwrap(),
        alias.to_str().unwrap(),
    ]);

    assert!(report.sets.is_empty());
    assert_eq!(report.exit_code(), ExitCode::NoDuplicates);
    assert!(report.relocation.moved.is_empty());
    assert_eq!(fs::read(data.join("only.bin")).unwrap(), b"the one and only");
    assert!(!base.path().join("data_duplicate").exists());
    assert!(!data.join("_duplicate").exists());
}

#[test]
#[cfg(unix)]
fn test_symlinked_alias_root_never_relocates_the_only_copy() {
    let base = tempdir().unwrap();
    let out = tempdir().unwrap();
    let data = base.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("only.bin"), b"the one and only").unwrap();
    let alias = base.path().join("alias");
    std::os::unix::fs::symlink(&data, &alias).unwrap();

    let report = resolve_and_run(&[
        "dupefinder",
        "-r",
        "-m",
        "-o",
        out.path().to_str().unwrap(),
        data.to_str().unwrap(),
        alias.to_str().unwrap(),
    ]);

    assert!(report.sets.is_empty());
    assert!(report.relocation.moved.is_empty());
    assert_eq!(fs::read(data.join("only.bin")).unwrap(), b"the one and only");
    assert!(!base.path().join("data_duplicate").exists());
    assert!(!base.path().join("alias_duplicate").exists());
}

#[test]
fn test_dot_dot_root_relocates_next_to_named_directory() {
    let base = tempdir().unwrap();
    let out = tempdir().unwrap();
    let (a, b) = two_roots(base.path());
    fs::create_dir_all(b.join("sub")).unwrap();
    let b_dotted = b.join("sub/..");

    let report = resolve_and_run(&[
        "dupefinder",
        "-r",
        "-m",
        "-o",
        out.path().to_str().unwrap(),
        a.to_str().unwrap(),
        b_dotted.to_str().unwrap(),
    ]);

    assert_eq!(report.sets.len(), 1);
    assert!(report.relocation.all_succeeded());
    assert!(base.path().join("B_duplicate/x").exists());
    assert!(!b.join("_duplicate").exists());
}
