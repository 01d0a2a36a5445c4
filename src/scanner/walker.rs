//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a root directory
//! and collecting [`FileRecord`]s for duplicate detection.
//!
//! # Features
//!
//! - Parallel directory traversal using the jwalk rayon pool
//! - Hidden entries skipped (names starting with `.`)
//! - Bundle-like directories (`Foo.app`, `Bar.photoslibrary`, ...) pruned
//! - Denylisted directories (`node_modules`, `.git`, `build`, ...) pruned
//! - Symlinks never followed and never reported
//! - Graceful shutdown via atomic flag
//!
//! Pruned directories are removed in `process_read_dir`, so jwalk never
//! reads their contents.
//!
//! # Example
//!
//! ```no_run
//! use dedupify::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{FileRecord, ScanError, WalkerConfig};

/// Directory names that are never descended into.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    "DerivedData",
    "build",
    "dist",
    "__pycache__",
    ".idea",
    ".vscode",
    "Pods",
    "Carthage",
];

/// Directory extensions that mark an opaque package or bundle.
pub const BUNDLE_EXTENSIONS: &[&str] = &[
    "app",
    "bundle",
    "framework",
    "plugin",
    "kext",
    "xcodeproj",
    "xcworkspace",
    "xcassets",
    "photoslibrary",
    "pkg",
];

/// Decides which children of a directory are dropped from the walk.
///
/// Only children are judged, never the root itself, so a root whose own
/// name starts with `.` is still walked.
#[derive(Debug, Clone)]
struct ChildFilter {
    ignored: HashSet<String>,
    skip_hidden: bool,
    skip_bundles: bool,
}

impl ChildFilter {
    fn new(config: &WalkerConfig) -> Self {
        Self {
            ignored: config.ignored_dirs.iter().cloned().collect(),
            skip_hidden: config.skip_hidden,
            skip_bundles: config.skip_bundles,
        }
    }

    fn should_drop(&self, name: &OsStr, is_dir: bool) -> bool {
        let name = name.to_string_lossy();
        if self.skip_hidden && name.starts_with('.') {
            return true;
        }
        if !is_dir {
            return false;
        }
        self.ignored.contains(name.as_ref()) || (self.skip_bundles && is_bundle_name(&name))
    }
}

/// Whether a directory name carries a bundle extension.
#[must_use]
pub fn is_bundle_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| {
            BUNDLE_EXTENSIONS
                .iter()
                .any(|b| b.eq_ignore_ascii_case(ext))
        })
}

/// Directory walker for parallel file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries
    /// as soon as it next checks.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. Size-0 files, directories and symlinks are not yielded.
    /// Iteration ends as soon as the shutdown flag is seen.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        let filter = ChildFilter::new(&self.config);

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        let drop = filter.should_drop(entry.file_name(), entry.file_type().is_dir());
                        if drop {
                            log::trace!("Pruning: {}", entry.path().display());
                        }
                        !drop
                    }
                    Err(_) => true,
                });
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .map_while(move |entry_result| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    return None;
                }
                Some(self.process_entry(entry_result))
            })
            .flatten()
    }

    /// Turn one jwalk entry into a record, an error, or nothing.
    fn process_entry(
        &self,
        entry_result: Result<jwalk::DirEntry<((), ())>, jwalk::Error>,
    ) -> Option<Result<FileRecord, ScanError>> {
        match entry_result {
            Ok(entry) => {
                let path = entry.path();

                // Skip the root directory itself
                if path == self.root {
                    return None;
                }

                let file_type = entry.file_type();
                if file_type.is_dir() {
                    return None;
                }
                if file_type.is_symlink() {
                    log::trace!("Skipping symlink: {}", path.display());
                    return None;
                }

                let metadata = match std::fs::symlink_metadata(&path) {
                    Ok(m) => m,
                    Err(e) => return Some(Self::handle_io_error(&path, e)),
                };

                if !metadata.is_file() {
                    return None;
                }

                Self::process_file_entry(path, &metadata)
            }
            Err(e) => {
                let path = e
                    .path()
                    .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                Some(Self::handle_jwalk_error(path, e))
            }
        }
    }

    /// Build a record for a regular file, dropping empty ones.
    fn process_file_entry(
        path: PathBuf,
        metadata: &Metadata,
    ) -> Option<Result<FileRecord, ScanError>> {
        let size = metadata.len();

        // Every empty file would hash the same
        if size == 0 {
            log::debug!("Skipping empty file: {}", path.display());
            return None;
        }

        let record = FileRecord::new(path, size, metadata.modified().ok())
            .with_created(metadata.created().ok());
        Some(Ok(record))
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(path: &Path, error: std::io::Error) -> Result<FileRecord, ScanError> {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                Err(ScanError::PermissionDenied(path.to_path_buf()))
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                Err(ScanError::NotFound(path.to_path_buf()))
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                Err(ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                })
            }
        }
    }

    /// Handle jwalk errors.
    fn handle_jwalk_error(path: PathBuf, error: jwalk::Error) -> Result<FileRecord, ScanError> {
        log::warn!("Walker error for {}: {}", path.display(), error);
        Err(ScanError::Io {
            path,
            source: std::io::Error::other(error.to_string()),
        })
    }
}
