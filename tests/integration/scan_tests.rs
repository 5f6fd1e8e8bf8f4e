use dupefinder::duplicates::{ChunkSize, DuplicateFinder, FinderConfig};
use dupefinder::scanner::{FileRecord, RecordSource, ScanError, WalkerConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::tempdir;

fn recursive_finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_walker_config(WalkerConfig::new(true)))
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (sets, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(sets.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();

    // Same size, different content
    File::create(dir.path().join("a.txt"))
        .unwrap()
        .write_all(b"content a")
        .unwrap();
    File::create(dir.path().join("b.txt"))
        .unwrap()
        .write_all(b"content b")
        .unwrap();
    File::create(dir.path().join("c.txt"))
        .unwrap()
        .write_all(b"content c")
        .unwrap();

    let finder = DuplicateFinder::with_defaults();
    let (sets, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(sets.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.comparisons, 3);
}

#[test]
fn test_scan_across_two_roots() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("A");
    let b = dir.path().join("B");
    fs::create_dir_all(a.join("nested")).unwrap();
    fs::create_dir_all(&b).unwrap();

    fs::write(a.join("nested/photo.jpg"), vec![7u8; 4096]).unwrap();
    fs::write(b.join("copy.jpg"), vec![7u8; 4096]).unwrap();
    fs::write(b.join("other.jpg"), vec![8u8; 4096]).unwrap();

    let (sets, summary) = recursive_finder().find_duplicates(&[a, b.clone()]).unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].len(), 2);
    assert!(sets[0].paths().contains(&b.join("copy.jpg")));
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.reclaimable_space, 4096);
}

#[test]
fn test_multiple_sets_same_size() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a1"), b"aaaa").unwrap();
    fs::write(dir.path().join("b1"), b"bbbb").unwrap();
    fs::write(dir.path().join("a2"), b"aaaa").unwrap();
    fs::write(dir.path().join("b2"), b"bbbb").unwrap();

    let (sets, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(sets.len(), 2);
    assert_eq!(summary.duplicate_files, 2);
    for set in &sets {
        let first = fs::read(&set.members[0].path).unwrap();
        for member in &set.members {
            assert_eq!(fs::read(&member.path).unwrap(), first);
        }
    }
}

#[test]
fn test_chunk_size_does_not_change_results() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    let mut different = content.clone();
    different[4999] ^= 0xFF;
    fs::write(dir.path().join("x"), &content).unwrap();
    fs::write(dir.path().join("y"), &content).unwrap();
    fs::write(dir.path().join("z"), &different).unwrap();

    for chunk in [ChunkSize::Fixed(1), ChunkSize::Fixed(7), ChunkSize::Fixed(4096), ChunkSize::Adaptive] {
        let finder = DuplicateFinder::new(FinderConfig::default().with_chunk_size(chunk));
        let (sets, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(sets.len(), 1, "chunk size {:?}", chunk);
        assert_eq!(sets[0].len(), 2, "chunk size {:?}", chunk);
    }
}

#[test]
fn test_include_empty_files() {
    let dir = tempdir().unwrap();
    File::create(dir.path().join("e1")).unwrap();
    File::create(dir.path().join("e2")).unwrap();

    let skipped = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert!(skipped.0.is_empty());
    assert_eq!(skipped.1.total_files, 0);

    let finder = DuplicateFinder::new(
        FinderConfig::default().with_walker_config(WalkerConfig::new(false).with_include_empty(true)),
    );
    let (sets, _) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].wasted_space(), 0);
}

struct FixedSource {
    records: Vec<FileRecord>,
}

impl RecordSource for FixedSource {
    fn records<'a>(
        &'a self,
        _root: &'a Path,
    ) -> Box<dyn Iterator<Item = Result<FileRecord, ScanError>> + 'a> {
        Box::new(
            self.records
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(ScanError::NotFound(PathBuf::from(
                    "/vanished",
                ))))),
        )
    }
}

#[test]
fn test_custom_record_source_and_scan_errors() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"twin").unwrap();
    fs::write(&b, b"twin").unwrap();
    let now = SystemTime::now();

    let source = FixedSource {
        records: vec![FileRecord::new(a, 4, now, now), FileRecord::new(b, 4, now, now)],
    };
    let finder = DuplicateFinder::with_source(FinderConfig::default(), Box::new(source));
    let (sets, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(summary.scan_errors.len(), 1);
    assert_eq!(summary.scan_errors[0].path(), Path::new("/vanished"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_not_a_duplicate() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"same").unwrap();
    let locked = dir.path().join("b");
    fs::write(&locked, b"same").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to verify then.
    if fs::read(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
        return;
    }

    let (sets, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(sets.is_empty());
    assert_eq!(summary.comparisons, 1);
}
