use clap::Parser;
use dedupify::cli::Cli;
use dedupify::error::ExitCode;
use dedupify::run_app;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn run(root: &Path, extra: &[&str]) -> anyhow::Result<ExitCode> {
    let config_dir = tempdir().unwrap();
    let config = config_dir.path().join("none.toml");
    let mut argv = vec![
        "dedupify".to_string(),
        "--quiet".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "scan".to_string(),
        root.display().to_string(),
        "--output".to_string(),
        "json".to_string(),
    ];
    argv.extend(extra.iter().map(|s| (*s).to_string()));
    run_app(Cli::try_parse_from(argv).unwrap())
}

fn duplicates() -> TempDir {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    fs::write(&a, vec![1u8; 64]).unwrap();
    fs::write(&b, vec![1u8; 64]).unwrap();
    set_file_mtime(&a, FileTime::from_unix_time(1_000_000, 0)).unwrap();
    set_file_mtime(&b, FileTime::from_unix_time(2_000_000, 0)).unwrap();
    dir
}

#[test]
fn test_no_duplicates_exit_code() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only.txt"), b"alone").unwrap();
    assert_eq!(run(dir.path(), &[]).unwrap(), ExitCode::NoDuplicates);
}

#[test]
fn test_duplicates_found_exit_code() {
    let dir = duplicates();
    assert_eq!(run(dir.path(), &[]).unwrap(), ExitCode::Success);
}

#[test]
fn test_delete_without_yes_is_dry_run() {
    let dir = duplicates();
    let code = run(dir.path(), &["--keep", "newest", "--delete"]).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(dir.path().join("a.bin").exists());
    assert!(dir.path().join("b.bin").exists());
}

#[test]
fn test_delete_into_quarantine() {
    let dir = duplicates();
    let quarantine = tempdir().unwrap();
    let target = quarantine.path().join("q");
    let target = target.display().to_string();

    let code = run(
        dir.path(),
        &["--keep", "newest", "--delete", "--yes", "--quarantine", &target],
    )
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(!dir.path().join("a.bin").exists());
    assert!(dir.path().join("b.bin").exists());
    assert!(quarantine.path().join("q/a.bin").exists());
}

#[test]
fn test_failed_removal_is_partial_success() {
    let dir = duplicates();
    let blocker = tempdir().unwrap();
    // A regular file where the quarantine directory should be.
    let not_a_dir = blocker.path().join("occupied");
    fs::write(&not_a_dir, b"x").unwrap();
    let target = not_a_dir.display().to_string();

    let code = run(
        dir.path(),
        &["--keep", "newest", "--delete", "--yes", "--quarantine", &target],
    )
    .unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);
    assert!(dir.path().join("a.bin").exists());
}

#[test]
fn test_delete_requires_keep_policy() {
    let dir = duplicates();
    let err = run(dir.path(), &["--delete", "--yes"]).unwrap_err();
    assert!(err.to_string().contains("keep policy"));
}
