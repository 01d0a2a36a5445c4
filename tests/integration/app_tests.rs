use dedupify::actions::{DisposalConfig, KeepPolicy, QuarantineDir};
use dedupify::app::{App, AppState, SessionError, ViewFilter};
use dedupify::duplicates::{FinderConfig, SortKey};
use dedupify::progress::ProgressSink;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

fn populate(root: &Path) {
    fs::create_dir_all(root.join("music")).unwrap();
    fs::create_dir_all(root.join("backup")).unwrap();
    fs::write(root.join("music/song.mp3"), vec![3u8; 300]).unwrap();
    fs::write(root.join("backup/song.mp3"), vec![3u8; 300]).unwrap();
    fs::write(root.join("notes.txt"), b"hello").unwrap();
    fs::write(root.join("backup/notes.txt"), b"hello").unwrap();
}

#[test]
fn test_full_session_lifecycle() {
    let dir = tempdir().unwrap();
    let quarantine = tempdir().unwrap();
    populate(dir.path());

    let mut app = App::new();
    assert_eq!(app.state(), AppState::Idle);

    assert!(app.add_root(dir.path()).unwrap());
    assert_eq!(app.state(), AppState::FoldersChosen);

    app.start_scan().unwrap();
    assert_eq!(app.wait(), AppState::ResultsReady);
    assert!(!app.cancel_token().is_cancelled());
    assert_eq!(app.groups().len(), 2);
    assert_eq!(app.total_duplicate_size(), 305);

    app.auto_select(KeepPolicy::Oldest).unwrap();
    assert_eq!(app.state(), AppState::Reviewing);
    assert_eq!(app.selection().len(), 2);
    assert_eq!(app.selected_size(), 305);

    let only_selected = app.sorted_groups(SortKey::Size, ViewFilter::SelectedOnly);
    assert_eq!(only_selected.len(), 2);

    let report = app
        .dispose_selected(
            &QuarantineDir::new(quarantine.path()),
            &DisposalConfig::default(),
        )
        .unwrap();
    assert_eq!(report.moved_count, 2);
    assert_eq!(app.state(), AppState::Cleaned);
    assert!(app.groups().is_empty());
    assert_eq!(app.cleaned_size(), 305);

    // A rescan after cleanup finds nothing left.
    app.start_scan().unwrap();
    assert_eq!(app.wait(), AppState::NoResults);
}

#[test]
fn test_progress_messages_reach_observer() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |text: &str| seen.lock().unwrap().push(text.to_string())
    };
    let sink: Arc<dyn ProgressSink> = Arc::new(sink);

    let mut app = App::new()
        .with_finder_config(FinderConfig::default().with_progress_interval(Duration::ZERO))
        .with_progress_sink(sink);
    app.set_roots(vec![dir.path().to_path_buf()]).unwrap();
    app.start_scan().unwrap();
    app.wait();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert_eq!(seen.first().unwrap(), dedupify::progress::messages::SCANNING);
    assert_eq!(seen.last().unwrap(), dedupify::progress::messages::FINALIZING);
}

#[test]
fn test_operations_rejected_in_wrong_state() {
    let mut app = App::new();

    let err = app.start_scan().unwrap_err();
    assert!(matches!(err, SessionError::Transition(_)));
    assert!(app.auto_select(KeepPolicy::Newest).is_err());
    assert!(app.deselect_all().is_err());
    assert!(app.stop_scan().is_err());
    assert_eq!(app.state(), AppState::Idle);
}

#[test]
fn test_scan_with_missing_root_only() {
    let mut app = App::new();
    app.set_roots(vec!["/no/such/folder/for/dedupify".into()])
        .unwrap();
    app.start_scan().unwrap();
    assert_eq!(app.wait(), AppState::NoResults);
    assert_eq!(app.summary().map(|s| s.scan_errors.len()), Some(1));
}

#[test]
fn test_reset_returns_to_idle() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let mut app = App::new();
    app.set_roots(vec![dir.path().to_path_buf()]).unwrap();
    app.start_scan().unwrap();
    app.wait();
    app.reset();

    assert_eq!(app.state(), AppState::Idle);
    assert!(app.roots().is_empty());
    assert!(app.groups().is_empty());
}
