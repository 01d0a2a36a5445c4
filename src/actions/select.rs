//! Selection of files for removal.
//!
//! A [`SelectionSet`] holds the [`FileId`]s marked for disposal. Two ways of
//! filling it are offered:
//!
//! - [`auto_select`] keeps one file per group according to a [`KeepPolicy`]
//!   and selects all others.
//! - [`SelectionSet::toggle`] flips a single file, refusing any change that
//!   would leave a group with nothing unselected.
//!
//! # Example
//!
//! ```
//! use dedupify::actions::select::{auto_select, KeepPolicy};
//! use dedupify::duplicates::DuplicateGroup;
//! use dedupify::scanner::FileRecord;
//! use std::path::PathBuf;
//! use std::time::{Duration, SystemTime};
//!
//! let old = FileRecord::new(PathBuf::from("/a"), 10, Some(SystemTime::UNIX_EPOCH));
//! let new = FileRecord::new(
//!     PathBuf::from("/b"),
//!     10,
//!     Some(SystemTime::UNIX_EPOCH + Duration::from_secs(60)),
//! );
//! let old_id = old.id;
//! let group = DuplicateGroup::new([0; 32], 10, vec![old, new]);
//!
//! let selection = auto_select(&[group], KeepPolicy::Newest);
//! assert!(selection.contains(old_id));
//! assert_eq!(selection.len(), 1);
//! ```

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duplicates::DuplicateGroup;
use crate::scanner::{FileId, FileRecord};

/// Which copy of each group survives an automatic selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    /// Keep the most recently modified copy.
    Newest,
    /// Keep the least recently modified copy.
    Oldest,
}

/// Errors from manual selection changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// Selecting this file would leave its group with no unselected member.
    #[error("cannot select {0}: at least one copy in its group must be kept")]
    WouldEmptyGroup(PathBuf),

    /// The file is not a member of the group it was toggled against.
    #[error("file {0} is not a member of this group")]
    NotInGroup(FileId),
}

/// Set of files marked for removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: HashSet<FileId>,
}

impl SelectionSet {
    /// Empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn from_ids(ids: impl IntoIterator<Item = FileId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Number of selected files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn contains(&self, id: FileId) -> bool {
        self.ids.contains(&id)
    }

    /// Iterate over selected ids in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = FileId> + '_ {
        self.ids.iter().copied()
    }

    /// Clear the selection.
    pub fn deselect_all(&mut self) {
        self.ids.clear();
    }

    /// Number of selected members of `group`.
    #[must_use]
    pub fn selected_in(&self, group: &DuplicateGroup) -> usize {
        group.files.iter().filter(|f| self.contains(f.id)).count()
    }

    /// Whether any member of `group` is selected.
    #[must_use]
    pub fn touches(&self, group: &DuplicateGroup) -> bool {
        group.files.iter().any(|f| self.contains(f.id))
    }

    /// Flip the selection state of `id` within `group`.
    ///
    /// Returns the new state: `true` if the file is now selected.
    ///
    /// # Errors
    ///
    /// - [`SelectionError::NotInGroup`] if `id` is not a member of `group`
    /// - [`SelectionError::WouldEmptyGroup`] if selecting it would leave every
    ///   member of `group` selected; the selection is unchanged
    pub fn toggle(&mut self, id: FileId, group: &DuplicateGroup) -> Result<bool, SelectionError> {
        let record = group
            .files
            .iter()
            .find(|f| f.id == id)
            .ok_or(SelectionError::NotInGroup(id))?;

        if self.ids.remove(&id) {
            log::debug!("Deselected {}", record.path.display());
            return Ok(false);
        }

        if self.selected_in(group) + 1 >= group.len() {
            log::debug!(
                "Refusing to select {}: last unselected copy",
                record.path.display()
            );
            return Err(SelectionError::WouldEmptyGroup(record.path.clone()));
        }

        self.ids.insert(id);
        log::debug!("Selected {}", record.path.display());
        Ok(true)
    }

    /// Selected records across `groups`, in group then member order.
    #[must_use]
    pub fn selected_records<'a>(&self, groups: &'a [DuplicateGroup]) -> Vec<&'a FileRecord> {
        groups
            .iter()
            .flat_map(|g| g.files.iter())
            .filter(|f| self.contains(f.id))
            .collect()
    }

    /// Total size of the selected files across `groups`.
    #[must_use]
    pub fn selected_size(&self, groups: &[DuplicateGroup]) -> u64 {
        self.selected_records(groups).iter().map(|f| f.size).sum()
    }
}

/// Compare modification times with a missing value ranked last.
fn cmp_missing_last(a: Option<SystemTime>, b: Option<SystemTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Order in which `policy` ranks candidates; the first one is kept.
///
/// - `Newest`: newest first, a missing time counts as the oldest possible,
///   ties by path ascending.
/// - `Oldest`: oldest first, a missing time counts as the newest possible,
///   ties by path descending.
#[must_use]
pub fn keep_order(policy: KeepPolicy, a: &FileRecord, b: &FileRecord) -> Ordering {
    match policy {
        // Option orders None below every Some, so reversing puts it last.
        KeepPolicy::Newest => b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)),
        KeepPolicy::Oldest => {
            cmp_missing_last(a.modified, b.modified).then_with(|| b.path.cmp(&a.path))
        }
    }
}

/// The member of `group` that `policy` keeps.
#[must_use]
pub fn keeper(group: &DuplicateGroup, policy: KeepPolicy) -> Option<&FileRecord> {
    group.files.iter().min_by(|a, b| keep_order(policy, a, b))
}

/// Select every member of every group except the one `policy` keeps.
///
/// Groups with fewer than two members contribute nothing.
#[must_use]
pub fn auto_select(groups: &[DuplicateGroup], policy: KeepPolicy) -> SelectionSet {
    let mut selection = SelectionSet::new();
    for group in groups.iter().filter(|g| g.len() >= 2) {
        let Some(kept) = keeper(group, policy) else {
            continue;
        };
        selection
            .ids
            .extend(group.files.iter().filter(|f| f.id != kept.id).map(|f| f.id));
    }
    log::info!(
        "Auto-selected {} file(s) keeping the {:?} copy of each group",
        selection.len(),
        policy
    );
    selection
}
