use dedupify::actions::{auto_select, keeper, KeepPolicy, SelectionSet};
use dedupify::duplicates::{group_by_size, sort_groups, DuplicateGroup, SortKey};
use dedupify::scanner::{FileRecord, Hasher};
use proptest::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn group_from(mtimes: &[Option<u64>]) -> DuplicateGroup {
    let files = mtimes
        .iter()
        .enumerate()
        .map(|(i, m)| {
            FileRecord::new(
                PathBuf::from(format!("/fake/{}/copy.bin", i)),
                10,
                m.map(|s| SystemTime::UNIX_EPOCH + Duration::from_secs(s)),
            )
        })
        .collect();
    DuplicateGroup::new([7u8; 32], 10, files)
}

proptest! {
    #[test]
    fn test_hash_determinism(content in prop::collection::vec(any::<u8>(), 0..20_000)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, &content).unwrap();

        let hasher = Hasher::new();
        prop_assert_eq!(hasher.full_hash(&path).unwrap(), hasher.full_hash(&path).unwrap());
        prop_assert_eq!(hasher.prehash(&path).unwrap(), hasher.prehash(&path).unwrap());
    }

    #[test]
    fn test_prehash_equals_full_hash_for_small_files(content in "\\PC*") {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.bin");
        fs::write(&path, content.as_bytes()).unwrap();

        let hasher = Hasher::new();
        if content.len() <= 4096 {
            prop_assert_eq!(hasher.prehash(&path).unwrap(), hasher.full_hash(&path).unwrap());
        }
    }

    #[test]
    fn test_group_by_size_invariants(sizes in prop::collection::vec(0u64..1000, 0..50)) {
        let entries: Vec<FileRecord> = sizes.iter().enumerate().map(|(i, &size)| {
            FileRecord::new(PathBuf::from(format!("/fake/path/{}", i)), size, None)
        }).collect();

        let (groups, stats) = group_by_size(entries.clone());

        for (size, files) in &groups {
            prop_assert!(*size > 0);
            prop_assert!(files.len() >= 2);
            for file in files {
                prop_assert_eq!(file.size, *size);
            }
        }

        prop_assert_eq!(stats.total_files, entries.len());
        let sum_files: usize = groups.values().map(Vec::len).sum();
        prop_assert_eq!(stats.potential_duplicates, sum_files);
        prop_assert_eq!(stats.empty_files, sizes.iter().filter(|&&s| s == 0).count());
    }

    #[test]
    fn test_auto_select_keeps_exactly_one(
        mtimes in prop::collection::vec(prop::option::of(0u64..5), 2..8),
        newest in any::<bool>(),
    ) {
        let policy = if newest { KeepPolicy::Newest } else { KeepPolicy::Oldest };
        let group = group_from(&mtimes);
        let groups = vec![group];
        let selection = auto_select(&groups, policy);

        prop_assert_eq!(selection.selected_in(&groups[0]), groups[0].len() - 1);
        let kept = keeper(&groups[0], policy).unwrap();
        prop_assert!(!selection.contains(kept.id));

        // No unselected member is strictly preferred over the kept one.
        let best = match policy {
            KeepPolicy::Newest => groups[0].files.iter().filter_map(|f| f.modified).max(),
            KeepPolicy::Oldest => groups[0].files.iter().filter_map(|f| f.modified).min(),
        };
        if best.is_some() {
            prop_assert_eq!(kept.modified, best);
        }
    }

    #[test]
    fn test_toggles_never_select_whole_group(
        count in 2usize..6,
        toggles in prop::collection::vec(0usize..6, 0..40),
    ) {
        let group = group_from(&vec![None; count]);
        let mut selection = SelectionSet::new();

        for index in toggles {
            if let Some(file) = group.files.get(index) {
                let _ = selection.toggle(file.id, &group);
            }
            prop_assert!(selection.selected_in(&group) < group.len());
        }
    }

    #[test]
    fn test_sort_by_size_is_descending(sizes in prop::collection::vec((1u64..500, 2usize..5), 0..20)) {
        let mut groups: Vec<DuplicateGroup> = sizes.iter().enumerate().map(|(g, &(size, n))| {
            let files = (0..n)
                .map(|i| FileRecord::new(PathBuf::from(format!("/g{}/f{}", g, i)), size, None))
                .collect();
            DuplicateGroup::new([g as u8; 32], size, files)
        }).collect();

        sort_groups(&mut groups, SortKey::Size);
        for pair in groups.windows(2) {
            prop_assert!(pair[0].wasted_size() >= pair[1].wasted_size());
        }
    }
}
