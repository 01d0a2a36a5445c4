use dedupify::duplicates::{scan, DuplicateFinder, FinderConfig};
use dedupify::progress::NoProgress;
use dedupify::scanner::WalkerConfig;
use dedupify::signal::CancelToken;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

fn write(path: &std::path::Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (groups, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"content a");
    write(&dir.path().join("b.txt"), b"content b");
    write(&dir.path().join("c.txt"), b"content c");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
}

#[test]
fn test_two_roots_one_group() {
    let dir = tempdir().unwrap();
    let content = vec![0x5a; 100];
    write(&dir.path().join("a/x.bin"), &content);
    write(&dir.path().join("b/y.bin"), &content);

    let roots = vec![dir.path().join("a"), dir.path().join("b")];
    let groups = scan(&roots, Arc::new(NoProgress), &CancelToken::new());

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 2);
    assert_eq!(groups[0].size, 100);
    assert_eq!(groups[0].wasted_size(), 100);
    let mut names: Vec<String> = groups[0].files.iter().map(|f| f.file_name()).collect();
    names.sort();
    assert_eq!(names, vec!["x.bin", "y.bin"]);
}

#[test]
fn test_groups_sorted_by_wasted_size() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("small1"), &[1u8; 10]);
    write(&dir.path().join("small2"), &[1u8; 10]);
    write(&dir.path().join("small3"), &[1u8; 10]);
    write(&dir.path().join("big1"), &[2u8; 50]);
    write(&dir.path().join("big2"), &[2u8; 50]);

    let groups = scan(
        &[dir.path().to_path_buf()],
        Arc::new(NoProgress),
        &CancelToken::new(),
    );

    let wasted: Vec<u64> = groups.iter().map(|g| g.wasted_size()).collect();
    assert_eq!(wasted, vec![50, 20]);
}

#[test]
fn test_same_windows_different_elsewhere() {
    let dir = tempdir().unwrap();
    let mut a = vec![0u8; 20_000];
    let mut b = a.clone();
    a[5_000] = 1;
    b[5_000] = 2;
    write(&dir.path().join("a.bin"), &a);
    write(&dir.path().join("b.bin"), &b);

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(groups.is_empty());
    // Survived the fingerprint, rejected by the full hash.
    assert_eq!(summary.eliminated_by_prehash, 0);
}

#[test]
fn test_denylisted_directory_contributes_nothing() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("node_modules/lib/a.js"), b"module.exports = 1;");
    write(&dir.path().join("node_modules/lib/b.js"), b"module.exports = 1;");
    write(&dir.path().join("src/keep.txt"), b"unique");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(&[dir.path().to_path_buf()]).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 1);
}

#[test]
fn test_extra_ignored_dirs() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("exports/a.csv"), b"1,2,3");
    write(&dir.path().join("exports/b.csv"), b"1,2,3");

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::with_extra_ignored(["exports".to_string()]));
    let (groups, _) = DuplicateFinder::new(config)
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert!(groups.is_empty());
}

#[test]
fn test_rescan_is_stable() {
    let dir = tempdir().unwrap();
    for i in 0..4 {
        write(&dir.path().join(format!("d{}/same.dat", i)), b"identical payload");
    }
    write(&dir.path().join("other.dat"), b"different payload");

    let roots = vec![dir.path().to_path_buf()];
    let membership = |groups: Vec<dedupify::duplicates::DuplicateGroup>| -> Vec<Vec<PathBuf>> {
        let mut sets: Vec<Vec<PathBuf>> = groups
            .into_iter()
            .map(|g| {
                let mut paths = g.paths();
                paths.sort();
                paths
            })
            .collect();
        sets.sort();
        sets
    };

    let first = membership(scan(&roots, Arc::new(NoProgress), &CancelToken::new()));
    let second = membership(scan(&roots, Arc::new(NoProgress), &CancelToken::new()));
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].len(), 4);
}

#[test]
fn test_cancelled_scan_returns_empty() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"dup");
    write(&dir.path().join("b"), b"dup");

    let cancel = CancelToken::new();
    cancel.cancel();
    let groups = scan(&[dir.path().to_path_buf()], Arc::new(NoProgress), &cancel);
    assert!(groups.is_empty());
}

#[test]
fn test_missing_and_valid_roots() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"dup");
    write(&dir.path().join("b"), b"dup");

    let roots = vec![PathBuf::from("/definitely/not/here/98765"), dir.path().to_path_buf()];
    let (groups, summary) = DuplicateFinder::with_defaults().find_duplicates(&roots).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(summary.scan_errors.len(), 1);
}

#[test]
fn test_large_file_duplicates() {
    let dir = tempdir().unwrap();
    // Spans several read chunks.
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    write(&dir.path().join("big1.bin"), &content);
    write(&dir.path().join("big2.bin"), &content);

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(summary.reclaimable_space, 300_000);
    assert!(groups[0].files.iter().all(|f| f.hash == Some(groups[0].hash)));
}

#[test]
fn test_dot_named_root_is_scanned() {
    let dir = tempdir().unwrap();
    let plain = dir.path().join("plain");
    let dotted = dir.path().join(".dotted");
    for root in [&plain, &dotted] {
        write(&root.join("one.bin"), &[4u8; 100]);
        write(&root.join("two.bin"), &[4u8; 100]);
    }

    for root in [plain, dotted] {
        let (groups, summary) = DuplicateFinder::with_defaults()
            .find_duplicates(&[root.clone()])
            .unwrap();
        assert_eq!(summary.total_files, 2, "root {}", root.display());
        assert_eq!(groups.len(), 1, "root {}", root.display());
    }
}

#[test]
fn test_git_directory_pruned_by_denylist() {
    let dir = tempdir().unwrap();
    write(&dir.path().join(".git/objects/ab/1"), b"loose object");
    write(&dir.path().join(".git/objects/cd/2"), b"loose object");
    write(&dir.path().join(".gitignore"), b"target/\n");
    write(&dir.path().join("src/main.rs"), b"fn main() {}");

    // Hidden entries allowed, so only the denylist keeps .git out.
    let walker = WalkerConfig {
        skip_hidden: false,
        ..WalkerConfig::default()
    };
    let (groups, summary) = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker))
        .find_duplicates(&[dir.path().to_path_buf()])
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 2);
}
