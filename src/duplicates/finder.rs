//! Duplicate finder implementation with multi-phase detection.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Walk**: enumerate regular files under every root
//! 2. **Phase 1 - Size grouping**: bucket by exact size (see [`crate::duplicates::groups`])
//! 3. **Phase 2 - Prehash**: three-window fingerprint, sub-grouped within each size
//! 4. **Phase 3 - Full hash**: stream the whole file through BLAKE3
//! 5. **Assembly**: one [`DuplicateGroup`] per surviving hash, largest waste first
//!
//! Each phase collects all per-file results before grouping them, so a phase
//! never starts on partial output of the previous one. Files that cannot be
//! read are dropped from the candidate set and recorded in the summary.
//!
//! Cancellation is observed between files and between groups. A cancelled
//! scan yields [`FinderError::Interrupted`]; [`scan`] turns that into an
//! empty result.
//!
//! # Example
//!
//! ```no_run
//! use dedupify::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
//! let (groups, summary) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! println!("Found {} duplicate groups", groups.len());
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::groups::{group_by_size, sort_groups, DuplicateGroup, SortKey};
use crate::progress::{messages, percent, NoProgress, ProgressSink, ThrottledProgress};
use crate::scanner::{FileRecord, Hash, HashError, Hasher, ScanError, Walker, WalkerConfig};
use crate::signal::CancelToken;

/// Shared settings for the two hashing phases.
#[derive(Clone, Default)]
pub struct PhaseConfig {
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional rate-limited progress reporter.
    pub progress: Option<Arc<ThrottledProgress>>,
}

impl std::fmt::Debug for PhaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<progress>"))
            .finish()
    }
}

impl PhaseConfig {
    /// Default settings: four I/O threads, no flag, no progress.
    #[must_use]
    pub fn new() -> Self {
        Self {
            io_threads: 4,
            ..Self::default()
        }
    }

    /// Set the number of I/O threads (at least one).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<ThrottledProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool, FinderError> {
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(self.io_threads.max(1))
            .thread_name(|i| format!("dedupify-io-{}", i))
            .build()?)
    }
}

/// Candidates after the prehash phase, keyed by size and fingerprint.
pub type PrehashGroups = HashMap<(u64, Hash), Vec<FileRecord>>;

/// Statistics from prehash phase.
#[derive(Debug, Default)]
pub struct PrehashStats {
    /// Total files that entered Phase 2
    pub input_files: usize,
    /// Number of files successfully hashed
    pub hashed_files: usize,
    /// Number of files that failed to hash (I/O errors)
    pub failed_files: usize,
    /// Errors encountered during prehash
    pub errors: Vec<HashError>,
    /// Number of files whose fingerprint was unique within their size
    pub unique_prehashes: usize,
    /// Number of files that could still be duplicates
    pub potential_duplicates: usize,
    /// Number of prehash groups with 2+ files
    pub duplicate_groups: usize,
    /// Whether phase was interrupted by shutdown
    pub interrupted: bool,
}

impl PrehashStats {
    /// Percentage of files eliminated by prehash comparison.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.input_files == 0 {
            0.0
        } else {
            let eliminated = self.input_files - self.potential_duplicates;
            (eliminated as f64 / self.input_files as f64) * 100.0
        }
    }
}

/// Sub-group same-size files by their three-window fingerprint (Phase 2).
///
/// Files are hashed on a pool of `io_threads` threads. Groups of one are
/// dropped. Unreadable files are dropped and their errors kept in the stats.
///
/// # Errors
///
/// Returns [`FinderError::ThreadPool`] if the hashing pool cannot be built.
pub fn phase2_prehash(
    size_groups: HashMap<u64, Vec<FileRecord>>,
    hasher: &Hasher,
    config: &PhaseConfig,
) -> Result<(PrehashGroups, PrehashStats), FinderError> {
    let all_files: Vec<FileRecord> = size_groups.into_values().flatten().collect();
    let mut stats = PrehashStats {
        input_files: all_files.len(),
        ..Default::default()
    };

    if all_files.is_empty() {
        log::debug!("Phase 2: No files to process");
        return Ok((HashMap::new(), stats));
    }

    log::info!("Phase 2: Computing prehashes for {} files", all_files.len());

    let total = all_files.len();
    let done = AtomicUsize::new(0);
    let pool = config.build_pool()?;

    let results: Vec<(FileRecord, Option<Result<Hash, HashError>>)> = pool.install(|| {
        all_files
            .into_par_iter()
            .map(|file| {
                if config.is_shutdown_requested() {
                    return (file, None);
                }
                let result = hasher.prehash(&file.path);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref progress) = config.progress {
                    progress.report_with(|| messages::prescanning(percent(n, total)));
                }
                (file, Some(result))
            })
            .collect()
    });

    if config.is_shutdown_requested() {
        stats.interrupted = true;
        log::info!("Phase 2: Interrupted by shutdown signal");
        return Ok((HashMap::new(), stats));
    }

    let mut prehash_groups: PrehashGroups = HashMap::new();
    for (file, result) in results {
        match result {
            Some(Ok(prehash)) => {
                stats.hashed_files += 1;
                prehash_groups
                    .entry((file.size, prehash))
                    .or_default()
                    .push(file);
            }
            Some(Err(e)) => {
                log::warn!("Failed to prehash {}: {}", file.path.display(), e);
                stats.failed_files += 1;
                stats.errors.push(e);
            }
            None => {}
        }
    }

    let filtered_groups: PrehashGroups = prehash_groups
        .into_iter()
        .filter(|(_, files)| {
            if files.len() == 1 {
                stats.unique_prehashes += 1;
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                true
            }
        })
        .collect();

    log::info!(
        "Phase 2 complete: {} files → {} potential duplicates ({:.1}% eliminated)",
        stats.input_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    Ok((filtered_groups, stats))
}

/// Statistics from the full hash phase.
#[derive(Debug, Default)]
pub struct FullhashStats {
    /// Total files that entered Phase 3
    pub input_files: usize,
    /// Number of files successfully hashed
    pub hashed_files: usize,
    /// Number of files that failed to hash
    pub failed_files: usize,
    /// Errors encountered during full hashing
    pub errors: Vec<HashError>,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Number of duplicate copies (excluding one per group)
    pub duplicate_files: usize,
    /// Space held by duplicate copies
    pub wasted_space: u64,
    /// Whether phase was interrupted by shutdown
    pub interrupted: bool,
}

/// Confirm candidates with a full content hash (Phase 3).
///
/// Returns groups in no particular order; the finder sorts them. Each
/// member carries its full hash.
///
/// # Errors
///
/// Returns [`FinderError::ThreadPool`] if the hashing pool cannot be built.
pub fn phase3_fullhash(
    prehash_groups: PrehashGroups,
    hasher: &Hasher,
    config: &PhaseConfig,
) -> Result<(Vec<DuplicateGroup>, FullhashStats), FinderError> {
    let all_files: Vec<FileRecord> = prehash_groups.into_values().flatten().collect();
    let mut stats = FullhashStats {
        input_files: all_files.len(),
        ..Default::default()
    };

    if all_files.is_empty() {
        log::debug!("Phase 3: No files to process");
        return Ok((Vec::new(), stats));
    }

    log::info!("Phase 3: Computing full hashes for {} files", all_files.len());

    let total = all_files.len();
    let done = AtomicUsize::new(0);
    let pool = config.build_pool()?;

    let results: Vec<(FileRecord, Option<Result<Hash, HashError>>)> = pool.install(|| {
        all_files
            .into_par_iter()
            .map(|file| {
                if config.is_shutdown_requested() {
                    return (file, None);
                }
                let result = hasher.full_hash(&file.path);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref progress) = config.progress {
                    progress.report_with(|| {
                        messages::verifying(percent(n, total), &file.file_name())
                    });
                }
                (file, Some(result))
            })
            .collect()
    });

    let interrupted = config.is_shutdown_requested()
        || results
            .iter()
            .any(|(_, r)| matches!(r, Some(Err(HashError::Interrupted(_)))));
    if interrupted {
        stats.interrupted = true;
        log::info!("Phase 3: Interrupted by shutdown signal");
        return Ok((Vec::new(), stats));
    }

    let mut hash_groups: HashMap<(u64, Hash), Vec<FileRecord>> = HashMap::new();
    for (mut file, result) in results {
        match result {
            Some(Ok(hash)) => {
                stats.hashed_files += 1;
                file.hash = Some(hash);
                hash_groups.entry((file.size, hash)).or_default().push(file);
            }
            Some(Err(e)) => {
                log::warn!("Failed to hash {}: {}", file.path.display(), e);
                stats.failed_files += 1;
                stats.errors.push(e);
            }
            None => {}
        }
    }

    let groups: Vec<DuplicateGroup> = hash_groups
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|((size, hash), files)| DuplicateGroup::new(hash, size, files))
        .collect();

    stats.duplicate_groups = groups.len();
    stats.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
    stats.wasted_space = groups.iter().map(DuplicateGroup::wasted_size).sum();

    log::info!(
        "Phase 3 complete: {} files → {} duplicate groups ({} duplicate files)",
        stats.input_files,
        stats.duplicate_groups,
        stats.duplicate_files
    );

    Ok((groups, stats))
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for parallel hashing.
    pub io_threads: usize,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress sink.
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Minimum spacing between non-boundary progress messages.
    pub progress_interval: Duration,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<sink>"))
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress: None,
            progress_interval: crate::progress::DEFAULT_INTERVAL,
        }
    }
}

impl FinderConfig {
    /// Set the number of I/O threads (at least one).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Set the minimum spacing between progress messages.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Total number of files enumerated
    pub total_files: usize,
    /// Total size of all enumerated files in bytes
    pub total_size: u64,
    /// Number of files eliminated by size grouping (unique sizes)
    pub eliminated_by_size: usize,
    /// Number of files eliminated by prehash
    pub eliminated_by_prehash: usize,
    /// Number of files skipped because they could not be read
    pub skipped_files: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding one per group)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Errors encountered during the walk
    pub scan_errors: Vec<ScanError>,
    /// Errors encountered while hashing
    pub hash_errors: Vec<HashError>,
}

impl ScanSummary {
    /// Calculate the percentage of space that is wasted by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was cancelled (Ctrl+C, stop button, or token).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The hashing thread pool could not be created.
    #[error("Failed to build hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Duplicate finder that orchestrates the multi-phase detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let mut hasher = Hasher::new();
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    fn check_cancel(&self) -> Result<(), FinderError> {
        if self.config.is_shutdown_requested() {
            Err(FinderError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Find all duplicate files under the given roots.
    ///
    /// Roots that are missing, unreadable, or not directories are skipped
    /// with a warning and recorded in [`ScanSummary::scan_errors`]. A file
    /// reachable from more than one root is considered once.
    ///
    /// Groups come back sorted by wasted size, largest first.
    ///
    /// # Errors
    ///
    /// - [`FinderError::Interrupted`] if the shutdown flag is raised at any point
    /// - [`FinderError::ThreadPool`] if a hashing pool cannot be created
    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();
        let sink: Arc<dyn ProgressSink> = self
            .config
            .progress
            .clone()
            .unwrap_or_else(|| Arc::new(NoProgress));
        let progress = Arc::new(ThrottledProgress::new(sink, self.config.progress_interval));

        self.check_cancel()?;
        progress.force(messages::SCANNING);
        log::info!("Starting duplicate scan of {} root(s)", roots.len());

        let files = self.enumerate(roots, &progress, &mut summary)?;
        progress.force(&messages::found(files.len()));

        summary.total_files = files.len();
        summary.total_size = files.iter().map(|f| f.size).sum();
        log::info!(
            "Found {} files ({} total)",
            summary.total_files,
            summary.total_size_display()
        );

        // Phase 1
        let (size_groups, size_stats) = group_by_size(files);
        summary.eliminated_by_size = size_stats.eliminated_unique;
        self.check_cancel()?;

        let phase_config = PhaseConfig::new()
            .with_io_threads(self.config.io_threads)
            .with_progress(Arc::clone(&progress));
        let phase_config = match self.config.shutdown_flag {
            Some(ref flag) => phase_config.with_shutdown_flag(Arc::clone(flag)),
            None => phase_config,
        };

        // Phase 2
        let (prehash_groups, prehash_stats) =
            phase2_prehash(size_groups, &self.hasher, &phase_config)?;
        if prehash_stats.interrupted {
            return Err(FinderError::Interrupted);
        }
        summary.eliminated_by_prehash = prehash_stats.unique_prehashes;
        summary.skipped_files += prehash_stats.failed_files;
        summary.hash_errors.extend(prehash_stats.errors);
        self.check_cancel()?;

        // Phase 3
        let (confirmed, fullhash_stats) =
            phase3_fullhash(prehash_groups, &self.hasher, &phase_config)?;
        if fullhash_stats.interrupted {
            return Err(FinderError::Interrupted);
        }
        summary.skipped_files += fullhash_stats.failed_files;
        summary.hash_errors.extend(fullhash_stats.errors);

        // Assembly
        progress.force(messages::FINALIZING);
        let mut groups = Vec::with_capacity(confirmed.len());
        for group in confirmed {
            self.check_cancel()?;
            if group.len() >= 2 {
                groups.push(group);
            }
        }
        sort_groups(&mut groups, SortKey::Size);

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = fullhash_stats.duplicate_files;
        summary.reclaimable_space = fullhash_stats.wasted_space;
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable, {} skipped",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            summary.skipped_files + summary.scan_errors.len()
        );

        Ok((groups, summary))
    }

    /// Walk every root, collecting non-empty regular files.
    fn enumerate(
        &self,
        roots: &[PathBuf],
        progress: &ThrottledProgress,
        summary: &mut ScanSummary,
    ) -> Result<Vec<FileRecord>, FinderError> {
        let mut files = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for root in roots {
            self.check_cancel()?;

            let root = match root.canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Skipping root {}: {}", root.display(), e);
                    summary.scan_errors.push(match e.kind() {
                        std::io::ErrorKind::NotFound => ScanError::NotFound(root.clone()),
                        std::io::ErrorKind::PermissionDenied => {
                            ScanError::PermissionDenied(root.clone())
                        }
                        _ => ScanError::Io {
                            path: root.clone(),
                            source: e,
                        },
                    });
                    continue;
                }
            };
            if !root.is_dir() {
                log::warn!("Skipping root {}: not a directory", root.display());
                summary.scan_errors.push(ScanError::NotADirectory(root));
                continue;
            }

            log::debug!("Walking {}", root.display());
            let mut walker = Walker::new(&root, self.config.walker_config.clone());
            if let Some(ref flag) = self.config.shutdown_flag {
                walker = walker.with_shutdown_flag(Arc::clone(flag));
            }

            for result in walker.walk() {
                self.check_cancel()?;
                match result {
                    Ok(file) => {
                        if !seen.insert(file.path.clone()) {
                            log::trace!("Already seen via another root: {}", file.path.display());
                            continue;
                        }
                        files.push(file);
                        let count = files.len();
                        progress.report_with(|| messages::found(count));
                    }
                    Err(e) => summary.scan_errors.push(e),
                }
            }
        }

        self.check_cancel()?;
        Ok(files)
    }
}

/// Scan `roots` and return confirmed duplicate groups.
///
/// Progress text goes to `progress`. If `cancel` is raised at any point the
/// result is empty; partial results are never returned. Errors other than
/// cancellation are logged and also yield an empty result.
#[must_use]
pub fn scan(
    roots: &[PathBuf],
    progress: Arc<dyn ProgressSink>,
    cancel: &CancelToken,
) -> Vec<DuplicateGroup> {
    let config = FinderConfig::default()
        .with_shutdown_flag(cancel.get_flag())
        .with_progress(progress);
    scan_with_config(roots, config)
}

/// [`scan`] with an explicit configuration.
#[must_use]
pub fn scan_with_config(roots: &[PathBuf], config: FinderConfig) -> Vec<DuplicateGroup> {
    match DuplicateFinder::new(config).find_duplicates(roots) {
        Ok((groups, _)) => groups,
        Err(FinderError::Interrupted) => {
            log::info!("Scan cancelled, discarding partial results");
            Vec::new()
        }
        Err(e) => {
            log::error!("Scan failed: {}", e);
            Vec::new()
        }
    }
}
