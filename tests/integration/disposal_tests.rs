use dedupify::actions::{
    auto_select, dispose, validate_preserves_keeper, DisposalConfig, Disposer, KeepPolicy,
    QuarantineDir,
};
use dedupify::duplicates::DuplicateFinder;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_quarantine_moves_selected_copies() {
    let scan_dir = tempdir().unwrap();
    let quarantine_dir = tempdir().unwrap();
    fs::create_dir_all(scan_dir.path().join("a")).unwrap();
    fs::create_dir_all(scan_dir.path().join("b")).unwrap();
    fs::write(scan_dir.path().join("a/photo.jpg"), vec![9u8; 512]).unwrap();
    fs::write(scan_dir.path().join("b/photo.jpg"), vec![9u8; 512]).unwrap();
    fs::write(scan_dir.path().join("photo.jpg"), vec![9u8; 512]).unwrap();
    for (name, secs) in [("a/photo.jpg", 1), ("b/photo.jpg", 2), ("photo.jpg", 3)] {
        set_file_mtime(
            scan_dir.path().join(name),
            FileTime::from_unix_time(1_600_000_000 + secs, 0),
        )
        .unwrap();
    }

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&[scan_dir.path().to_path_buf()])
        .unwrap();
    let selection = auto_select(&groups, KeepPolicy::Newest);
    validate_preserves_keeper(&selection, &groups[0]).unwrap();

    let records: Vec<_> = selection
        .selected_records(&groups)
        .into_iter()
        .cloned()
        .collect();
    let quarantine = QuarantineDir::new(quarantine_dir.path().join("q"));
    let report = dispose(&records, &quarantine, &DisposalConfig::default());

    assert!(report.all_succeeded());
    assert_eq!(report.moved_count, 2);
    assert_eq!(report.moved_bytes, 1024);
    assert!(scan_dir.path().join("photo.jpg").exists());
    assert!(!scan_dir.path().join("a/photo.jpg").exists());
    assert!(!scan_dir.path().join("b/photo.jpg").exists());

    // Same name twice: the second one gets a numbered suffix.
    let mut moved: Vec<String> = fs::read_dir(quarantine.root())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    moved.sort();
    assert_eq!(moved, vec!["photo (1).jpg", "photo.jpg"]);
}

#[test]
fn test_modified_file_is_skipped() {
    let scan_dir = tempdir().unwrap();
    let quarantine_dir = tempdir().unwrap();
    let a = scan_dir.path().join("a.txt");
    let b = scan_dir.path().join("b.txt");
    fs::write(&a, b"identical").unwrap();
    fs::write(&b, b"identical").unwrap();
    set_file_mtime(&a, FileTime::from_unix_time(1_000, 0)).unwrap();
    set_file_mtime(&b, FileTime::from_unix_time(2_000, 0)).unwrap();

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&[scan_dir.path().to_path_buf()])
        .unwrap();
    let selection = auto_select(&groups, KeepPolicy::Newest);
    let records: Vec<_> = selection
        .selected_records(&groups)
        .into_iter()
        .cloned()
        .collect();

    // Touched after the scan.
    set_file_mtime(&a, FileTime::from_unix_time(9_000, 0)).unwrap();

    let quarantine = QuarantineDir::new(quarantine_dir.path());
    let report = dispose(&records, &quarantine, &DisposalConfig::default());
    assert_eq!(report.moved_count, 0);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].1.contains("modified"));
    assert!(a.exists());

    let report = dispose(
        &records,
        &quarantine,
        &DisposalConfig::default().with_verify_unchanged(false),
    );
    assert_eq!(report.moved_count, 1);
    assert!(!a.exists());
}

#[test]
fn test_quarantine_destination_names_directory() {
    let dir = tempdir().unwrap();
    let quarantine = QuarantineDir::new(dir.path());
    assert_eq!(quarantine.destination(), dir.path().display().to_string());
}
