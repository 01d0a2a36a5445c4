use dedupify::actions::{auto_select, keeper, KeepPolicy, SelectionError};
use dedupify::duplicates::{DuplicateFinder, DuplicateGroup};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_at(path: &Path, content: &[u8], unix_secs: i64) {
    fs::write(path, content).unwrap();
    set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

fn scan(root: &Path) -> Vec<DuplicateGroup> {
    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(&[root.to_path_buf()])
        .unwrap();
    groups
}

#[test]
fn test_keep_newest_selects_older_copies() {
    let dir = tempdir().unwrap();
    write_at(&dir.path().join("old.txt"), b"same bytes", 1_000_000);
    write_at(&dir.path().join("mid.txt"), b"same bytes", 2_000_000);
    write_at(&dir.path().join("new.txt"), b"same bytes", 3_000_000);

    let groups = scan(dir.path());
    assert_eq!(groups.len(), 1);

    let kept = keeper(&groups[0], KeepPolicy::Newest).unwrap();
    assert_eq!(kept.file_name(), "new.txt");

    let selection = auto_select(&groups, KeepPolicy::Newest);
    assert_eq!(selection.len(), 2);
    assert!(!selection.contains(kept.id));
    assert_eq!(selection.selected_size(&groups), 20);
}

#[test]
fn test_keep_oldest_selects_newer_copies() {
    let dir = tempdir().unwrap();
    write_at(&dir.path().join("old.txt"), b"same bytes", 1_000_000);
    write_at(&dir.path().join("new.txt"), b"same bytes", 3_000_000);

    let groups = scan(dir.path());
    let kept = keeper(&groups[0], KeepPolicy::Oldest).unwrap();
    assert_eq!(kept.file_name(), "old.txt");

    let selection = auto_select(&groups, KeepPolicy::Oldest);
    let selected: Vec<String> = selection
        .selected_records(&groups)
        .iter()
        .map(|f| f.file_name())
        .collect();
    assert_eq!(selected, vec!["new.txt"]);
}

#[test]
fn test_equal_mtimes_break_ties_by_path() {
    let dir = tempdir().unwrap();
    write_at(&dir.path().join("a.txt"), b"tie", 5_000_000);
    write_at(&dir.path().join("b.txt"), b"tie", 5_000_000);

    let groups = scan(dir.path());
    assert_eq!(
        keeper(&groups[0], KeepPolicy::Newest).unwrap().file_name(),
        "a.txt"
    );
    assert_eq!(
        keeper(&groups[0], KeepPolicy::Oldest).unwrap().file_name(),
        "b.txt"
    );
}

#[test]
fn test_every_group_keeps_one_copy() {
    let dir = tempdir().unwrap();
    for (i, content) in [b"first".as_slice(), b"second", b"third"].iter().enumerate() {
        for copy in 0..=i + 1 {
            write_at(
                &dir.path().join(format!("g{}_{}.dat", i, copy)),
                content,
                1_000_000 + copy as i64,
            );
        }
    }

    let groups = scan(dir.path());
    assert_eq!(groups.len(), 3);

    for policy in [KeepPolicy::Newest, KeepPolicy::Oldest] {
        let selection = auto_select(&groups, policy);
        for group in &groups {
            assert_eq!(selection.selected_in(group), group.len() - 1);
        }
    }
}

#[test]
fn test_manual_toggle_keeps_last_copy() {
    let dir = tempdir().unwrap();
    write_at(&dir.path().join("x.txt"), b"pair", 1_000_000);
    write_at(&dir.path().join("y.txt"), b"pair", 2_000_000);

    let groups = scan(dir.path());
    let group = &groups[0];
    let mut selection = auto_select(&groups, KeepPolicy::Newest);
    assert_eq!(selection.len(), 1);

    let kept = keeper(group, KeepPolicy::Newest).unwrap();
    let err = selection.toggle(kept.id, group).unwrap_err();
    assert!(matches!(err, SelectionError::WouldEmptyGroup(_)));
    assert_eq!(selection.len(), 1);

    let other = group.files.iter().find(|f| f.id != kept.id).unwrap();
    assert!(!selection.toggle(other.id, group).unwrap());
    assert!(selection.toggle(kept.id, group).unwrap());
    assert!(selection.contains(kept.id));
}
