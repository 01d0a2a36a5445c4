//! Reversible disposal of selected duplicates.
//!
//! # Overview
//!
//! Files are never unlinked. A [`Disposer`] moves each file somewhere it can
//! be recovered from:
//! - [`SystemTrash`]: the platform trash / recycle bin (default)
//! - [`QuarantineDir`]: a caller-chosen directory
//!
//! [`dispose`] processes records one by one in input order. Every file's
//! outcome is independent; the [`DisposalReport`] lists the moved files and a
//! reason for each failure.
//!
//! # Safety
//!
//! Before a file is moved its current size and modification time are
//! compared with the scanned record, and a file that changed is left alone.
//! At least one copy of each duplicate group is always preserved when the
//! selection goes through [`validate_preserves_keeper`].
//!
//! # Example
//!
//! ```no_run
//! use dedupify::actions::delete::{dispose, DisposalConfig, SystemTrash};
//! use dedupify::scanner::FileRecord;
//!
//! let selected: Vec<FileRecord> = Vec::new();
//! let report = dispose(&selected, &SystemTrash, &DisposalConfig::default());
//! println!("{}", report.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytesize::ByteSize;
use thiserror::Error;

use super::select::SelectionSet;
use crate::duplicates::DuplicateGroup;
use crate::scanner::{FileId, FileRecord};

/// Error type for disposal operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to move the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Moving into the quarantine directory failed.
    #[error("quarantine move failed for {path}: {message}")]
    QuarantineFailed { path: PathBuf, message: String },

    /// Attempted to remove all copies (at least one must be preserved).
    #[error("cannot delete all copies - at least one file must be preserved")]
    AllCopiesWouldBeDeleted,

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::TrashFailed { path: p, .. }
            | Self::QuarantineFailed { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::AllCopiesWouldBeDeleted => None,
        }
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// A reversible way of getting a file out of the scanned tree.
pub trait Disposer: Send + Sync {
    /// Move `path` out of the way.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError`] if the file could not be moved; the file is
    /// then left where it was.
    fn dispose(&self, path: &Path) -> Result<(), DeleteError>;

    /// Short human-readable name of the destination.
    fn destination(&self) -> String;
}

/// Moves files to the platform trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

impl Disposer for SystemTrash {
    fn dispose(&self, path: &Path) -> Result<(), DeleteError> {
        fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;

        trash::delete(path).map_err(|e| {
            log::error!("Trash operation failed for {}: {}", path.display(), e);
            DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })
    }

    fn destination(&self) -> String {
        "trash".to_string()
    }
}

/// Moves files into a directory, keeping their names unique.
#[derive(Debug, Clone)]
pub struct QuarantineDir {
    root: PathBuf,
}

impl QuarantineDir {
    /// Use `root` as the quarantine; it is created on first use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The quarantine directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First free destination for a file called `name`.
    fn target_for(&self, name: &std::ffi::OsStr) -> PathBuf {
        let candidate = self.root.join(name);
        if !candidate.exists() {
            return candidate;
        }
        let original = Path::new(name);
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (1u32..)
            .map(|n| self.root.join(format!("{} ({}){}", stem, n, ext)))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl Disposer for QuarantineDir {
    fn dispose(&self, path: &Path) -> Result<(), DeleteError> {
        let quarantine_failed = |message: String| DeleteError::QuarantineFailed {
            path: path.to_path_buf(),
            message,
        };

        fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;
        let name = path
            .file_name()
            .ok_or_else(|| quarantine_failed("path has no file name".to_string()))?;

        fs::create_dir_all(&self.root).map_err(|e| {
            quarantine_failed(format!("cannot create {}: {}", self.root.display(), e))
        })?;
        let target = self.target_for(name);

        if let Err(rename_err) = fs::rename(path, &target) {
            // Different filesystem: copy then remove the original.
            log::debug!(
                "Rename of {} failed ({}), falling back to copy",
                path.display(),
                rename_err
            );
            fs::copy(path, &target).map_err(|e| quarantine_failed(e.to_string()))?;
            if let Err(e) = fs::remove_file(path) {
                discard_copy(&target, path);
                return Err(DeleteError::from_io(path, e));
            }
        }

        log::debug!("Quarantined {} -> {}", path.display(), target.display());
        Ok(())
    }

    fn destination(&self) -> String {
        self.root.display().to_string()
    }
}

/// Remove a quarantine copy whose original could not be removed.
///
/// Returns whether the copy is gone; a leftover is logged with both paths.
fn discard_copy(target: &Path, original: &Path) -> bool {
    match fs::remove_file(target) {
        Ok(()) => true,
        Err(e) => {
            log::warn!(
                "Could not remove quarantine copy {} after failed move of {}: {}",
                target.display(),
                original.display(),
                e
            );
            false
        }
    }
}

/// Options for [`dispose`].
#[derive(Debug, Clone)]
pub struct DisposalConfig {
    /// Skip files whose size or modification time changed since the scan.
    pub verify_unchanged: bool,
}

impl Default for DisposalConfig {
    fn default() -> Self {
        Self {
            verify_unchanged: true,
        }
    }
}

impl DisposalConfig {
    /// Enable/disable verification against the scanned record.
    #[must_use]
    pub fn with_verify_unchanged(mut self, verify: bool) -> Self {
        self.verify_unchanged = verify;
        self
    }
}

/// File metadata snapshot used to detect changes since the scan.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Snapshot of the state a record was scanned in.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Self {
        Self {
            path: record.path.clone(),
            size: record.size,
            mtime: record.modified,
        }
    }

    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, DeleteError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| DeleteError::from_io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Verify that the file on disk still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if file was modified, deleted, or can't be accessed.
    pub fn verify(&self) -> Result<(), DeleteError> {
        let current = Self::capture(&self.path)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(DeleteError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Outcome of a disposal batch.
#[derive(Debug, Clone, Default)]
pub struct DisposalReport {
    /// Number of files moved.
    pub moved_count: usize,
    /// Sum of the sizes of moved files.
    pub moved_bytes: u64,
    /// Ids of the moved files, in processing order.
    pub moved: Vec<FileId>,
    /// Files that could not be moved, with the reason.
    pub failures: Vec<(FileRecord, String)>,
}

impl DisposalReport {
    /// Total number of attempted files.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.moved_count + self.failures.len()
    }

    /// Check if every file was moved.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.all_succeeded() {
            format!(
                "Moved {} file(s), freed {}",
                self.moved_count,
                ByteSize(self.moved_bytes)
            )
        } else {
            format!(
                "Moved {} file(s), {} failed, freed {}",
                self.moved_count,
                self.failures.len(),
                ByteSize(self.moved_bytes)
            )
        }
    }
}

/// Move each record out of the way with `disposer`.
///
/// Records are processed sequentially in input order and each outcome is
/// independent of the others. The report always accounts for every record
/// exactly once.
pub fn dispose(
    records: &[FileRecord],
    disposer: &dyn Disposer,
    config: &DisposalConfig,
) -> DisposalReport {
    let mut report = DisposalReport::default();
    log::info!(
        "Disposing {} file(s) to {}",
        records.len(),
        disposer.destination()
    );

    for record in records {
        let outcome = if config.verify_unchanged {
            FileSnapshot::from_record(record).verify()
        } else {
            Ok(())
        }
        .and_then(|()| disposer.dispose(&record.path));

        match outcome {
            Ok(()) => {
                log::info!(
                    "Moved {} ({} bytes)",
                    record.path.display(),
                    record.size
                );
                report.moved_count += 1;
                report.moved_bytes += record.size;
                report.moved.push(record.id);
            }
            Err(e) => {
                log::warn!("Failed to dispose {}: {}", record.path.display(), e);
                report.failures.push((record.clone(), e.to_string()));
            }
        }
    }

    log::info!("{}", report.summary());
    report
}

/// Validate that `selection` leaves at least one member of `group`.
///
/// # Errors
///
/// Returns `AllCopiesWouldBeDeleted` if every member is selected.
pub fn validate_preserves_keeper(
    selection: &SelectionSet,
    group: &DuplicateGroup,
) -> Result<(), DeleteError> {
    let preserved_count = group.len() - selection.selected_in(group);

    if preserved_count == 0 {
        log::error!(
            "Attempted to delete all {} copies of a duplicate group",
            group.len()
        );
        Err(DeleteError::AllCopiesWouldBeDeleted)
    } else {
        Ok(())
    }
}
