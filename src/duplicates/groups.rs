//! Duplicate grouping and size-based file organization.
//!
//! # Overview
//!
//! This module holds the result shape of a scan, [`DuplicateGroup`], the
//! size bucketing used as the first filter of the pipeline, and the sort
//! orders a caller can present groups in.
//!
//! ## Size Grouping
//!
//! Files with different sizes cannot be duplicates, so bucketing by exact
//! size removes most candidates without any I/O.
//!
//! # Example
//!
//! ```
//! use dedupify::scanner::FileRecord;
//! use dedupify::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, None),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, None),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, None),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::scanner::{FileId, FileRecord, Hash};

/// Confirmed group of byte-identical files.
///
/// Every member has the same size and the same full hash, and a group always
/// has at least two members. Members are kept in discovery order.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// BLAKE3 hash of the file content
    pub hash: Hash,
    /// Size of each member in bytes
    pub size: u64,
    /// Members of the group
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(hash: Hash, size: u64, files: Vec<FileRecord>) -> Self {
        debug_assert!(files.iter().all(|f| f.size == size));
        Self { hash, size, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Size of all copies together.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }

    /// Space held by every copy but one.
    #[must_use]
    pub fn wasted_size(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        crate::scanner::hash_to_hex(&self.hash)
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Whether the record with `id` is a member.
    #[must_use]
    pub fn contains(&self, id: FileId) -> bool {
        self.files.iter().any(|f| f.id == id)
    }

    /// File name of the first member, used for name ordering.
    #[must_use]
    pub fn first_name(&self) -> String {
        self.files.first().map(FileRecord::file_name).unwrap_or_default()
    }
}

/// Order in which groups are presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Largest wasted size first
    #[default]
    #[serde(alias = "wasted")]
    Size,
    /// First member's file name, A to Z
    Name,
    /// Most members first
    Count,
}

fn by_wasted_desc(a: &DuplicateGroup, b: &DuplicateGroup) -> Ordering {
    b.wasted_size().cmp(&a.wasted_size())
}

fn by_name_asc(a: &DuplicateGroup, b: &DuplicateGroup) -> Ordering {
    a.first_name().cmp(&b.first_name())
}

/// Sort groups in place by `key`.
///
/// | key   | primary                 | tie-break              |
/// |-------|-------------------------|------------------------|
/// | Size  | wasted size, descending | first name, ascending  |
/// | Name  | first name, ascending   | wasted size, descending|
/// | Count | members, descending     | wasted size, descending|
pub fn sort_groups(groups: &mut [DuplicateGroup], key: SortKey) {
    match key {
        SortKey::Size => groups.sort_by(|a, b| by_wasted_desc(a, b).then_with(|| by_name_asc(a, b))),
        SortKey::Name => groups.sort_by(|a, b| by_name_asc(a, b).then_with(|| by_wasted_desc(a, b))),
        SortKey::Count => groups.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| by_wasted_desc(a, b))
        }),
    }
}

/// Statistics from size grouping phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of unique file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in groups of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton groups)
    pub eliminated_unique: usize,
    /// Number of empty files encountered
    pub empty_files: usize,
    /// Number of size groups with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by size.
///
/// Returns only the buckets holding two or more files, together with
/// statistics about what was filtered. Size-0 files are counted and dropped.
///
/// # Example
///
/// ```
/// use dedupify::scanner::FileRecord;
/// use dedupify::duplicates::group_by_size;
/// use std::path::PathBuf;
///
/// let files = vec![
///     FileRecord::new(PathBuf::from("/a.txt"), 100, None),
///     FileRecord::new(PathBuf::from("/b.txt"), 100, None),
///     FileRecord::new(PathBuf::from("/c.txt"), 200, None),
/// ];
///
/// let (groups, stats) = group_by_size(files);
///
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[&100].len(), 2);
/// assert_eq!(stats.eliminated_unique, 1);
/// ```
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
) -> (HashMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut all_groups: HashMap<u64, Vec<FileRecord>> = HashMap::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;

        if file.size == 0 {
            stats.empty_files += 1;
            log::debug!("Empty file encountered: {}", file.path.display());
            continue;
        }

        all_groups.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all_groups.len();

    let filtered_groups: HashMap<u64, Vec<FileRecord>> = all_groups
        .into_iter()
        .filter(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: {}",
                    size,
                    files[0].path.display()
                );
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                true
            }
        })
        .collect();

    log::info!(
        "Phase 1 complete: {} files → {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (filtered_groups, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size, None)
    }

    fn group(size: u64, names: &[&str]) -> DuplicateGroup {
        let files = names.iter().map(|n| record(n, size)).collect();
        DuplicateGroup::new([0u8; 32], size, files)
    }

    #[test]
    fn test_group_metrics() {
        let g = group(100, &["/a/x.bin", "/b/y.bin", "/c/z.bin"]);
        assert_eq!(g.len(), 3);
        assert_eq!(g.total_size(), 300);
        assert_eq!(g.wasted_size(), 200);
        assert_eq!(g.duplicate_count(), 2);
        assert_eq!(g.first_name(), "x.bin");
        assert_eq!(g.hash_hex().len(), 64);
        assert!(g.contains(g.files[1].id));
        assert!(!g.contains(FileId::next()));
    }

    #[test]
    fn test_group_by_size_empty_input() {
        let (groups, stats) = group_by_size(Vec::new());
        assert!(groups.is_empty());
        assert_eq!(stats, GroupingStats::default());
        assert_eq!(stats.elimination_rate(), 0.0);
    }

    #[test]
    fn test_group_by_size_drops_singletons_and_empty() {
        let files = vec![
            record("/a", 10),
            record("/b", 10),
            record("/c", 20),
            record("/d", 0),
            record("/e", 0),
        ];
        let (groups, stats) = group_by_size(files);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&10].len(), 2);
        assert_eq!(stats.total_files, 5);
        assert_eq!(stats.empty_files, 2);
        assert_eq!(stats.eliminated_unique, 1);
        assert_eq!(stats.duplicate_groups, 1);
    }

    #[test]
    fn test_group_by_size_preserves_discovery_order() {
        let files = vec![record("/z", 5), record("/a", 5), record("/m", 5)];
        let (groups, _) = group_by_size(files);
        let names: Vec<_> = groups[&5].iter().map(FileRecord::file_name).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_sort_by_size_with_name_tie_break() {
        let mut groups = vec![
            group(10, &["/b", "/b2"]),
            group(50, &["/c", "/c2"]),
            group(10, &["/a", "/a2"]),
        ];
        sort_groups(&mut groups, SortKey::Size);
        let order: Vec<_> = groups.iter().map(DuplicateGroup::first_name).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_sort_by_name_with_wasted_tie_break() {
        let mut groups = vec![
            group(10, &["/x/same", "/y"]),
            group(90, &["/z/same", "/w"]),
            group(5, &["/alpha", "/beta"]),
        ];
        sort_groups(&mut groups, SortKey::Name);
        let sizes: Vec<_> = groups.iter().map(|g| g.size).collect();
        assert_eq!(sizes, vec![5, 90, 10]);
    }

    #[test]
    fn test_sort_by_count_with_wasted_tie_break() {
        let mut groups = vec![
            group(10, &["/a", "/b"]),
            group(1, &["/c", "/d", "/e"]),
            group(30, &["/f", "/g"]),
        ];
        sort_groups(&mut groups, SortKey::Count);
        let sizes: Vec<_> = groups.iter().map(|g| g.size).collect();
        assert_eq!(sizes, vec![1, 30, 10]);
    }

    #[test]
    fn test_sort_key_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            sort: SortKey,
        }
        let w: Wrapper = serde_json::from_str(r#"{"sort":"count"}"#).unwrap();
        assert_eq!(w.sort, SortKey::Count);
        let w: Wrapper = serde_json::from_str(r#"{"sort":"wasted"}"#).unwrap();
        assert_eq!(w.sort, SortKey::Size);
    }
}
