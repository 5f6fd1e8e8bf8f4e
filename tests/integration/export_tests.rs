use dupefinder::app::{execute, RunOptions};
use dupefinder::duplicates::{ChunkSize, DuplicateFinder};
use dupefinder::output::{ExportFile, MemorySink, LINE_ENDING};
use dupefinder::signal::CancelToken;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_export_lists_each_set_followed_by_blank_line() {
    let root = tempdir().unwrap();
    fs::write(root.path().join("a1"), b"first pair").unwrap();
    fs::write(root.path().join("a2"), b"first pair").unwrap();
    fs::write(root.path().join("b1"), b"2nd").unwrap();
    fs::write(root.path().join("b2"), b"2nd").unwrap();

    let (sets, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&[root.path().to_path_buf()])
        .unwrap();
    assert_eq!(sets.len(), 2);

    let out = tempdir().unwrap();
    let path = out.path().join("dupes.txt");
    let mut export = ExportFile::create(&path).unwrap();
    export.write_all(&sets).unwrap();
    export.flush().unwrap();
    assert_eq!(export.sets_written(), 2);

    let content = fs::read_to_string(&path).unwrap();
    let blocks: Vec<&str> = content
        .split(&format!("{nl}{nl}", nl = LINE_ENDING))
        .filter(|b| !b.is_empty())
        .collect();
    assert_eq!(blocks.len(), 2);
    // Largest set first
    assert!(blocks[0].contains("a1") && blocks[0].contains("a2"));
    assert!(blocks[1].contains("b1") && blocks[1].contains("b2"));
}

#[test]
fn test_execute_with_export_writes_timestamped_file() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::write(root.path().join("x"), b"copy").unwrap();
    fs::write(root.path().join("y"), b"copy").unwrap();

    let options = RunOptions {
        roots: vec![root.path().to_path_buf()],
        recursive: false,
        verbose: false,
        export: true,
        relocate: false,
        output_dir: out.path().to_path_buf(),
        chunk_size: ChunkSize::default(),
        include_empty: false,
        color: false,
    };
    let report = execute(&options, &CancelToken::new(), Box::new(MemorySink::new())).unwrap();

    let export_path = report.export_path.unwrap();
    let name = export_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("duplicates."));
    assert!(name.ends_with(".txt"));

    let content = fs::read_to_string(&export_path).unwrap();
    assert!(content.contains(&root.path().join("x").display().to_string()));
    assert!(content.contains(&root.path().join("y").display().to_string()));
    // Nothing was moved
    assert!(root.path().join("y").exists());
}
