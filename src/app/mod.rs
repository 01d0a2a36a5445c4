//! Session state management.
//!
//! # Overview
//!
//! [`App`] is the single object a front end drives. It owns the chosen root
//! folders, the running scan, the resulting groups, the selection and the
//! cleanup totals, and it moves through [`AppState`] only in response to
//! those operations:
//!
//! ```text
//! Idle --set_roots--> FoldersChosen --start_scan--> Scanning
//! Scanning --finished, none--> NoResults
//! Scanning --finished, some--> ResultsReady --select--> Reviewing
//! Scanning --stop_scan--> FoldersChosen
//! Reviewing --dispose (moved >= 1)--> Cleaned
//! NoResults | Cleaned --start_scan--> Scanning
//! any --reset--> Idle
//! ```
//!
//! Anything else is refused with a [`TransitionError`] and leaves the session
//! untouched.
//!
//! # Example
//!
//! ```no_run
//! use dedupify::app::{App, AppState};
//! use dedupify::actions::select::KeepPolicy;
//! use std::path::PathBuf;
//!
//! let mut app = App::new();
//! app.set_roots(vec![PathBuf::from("/photos")]).unwrap();
//! app.start_scan().unwrap();
//!
//! if app.wait() == AppState::ResultsReady {
//!     app.auto_select(KeepPolicy::Newest).unwrap();
//!     println!("{} selected", app.selection().len());
//! }
//! ```

pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::actions::delete::{
    dispose, validate_preserves_keeper, DeleteError, DisposalConfig, DisposalReport, Disposer,
};
use crate::actions::select::{self, KeepPolicy, SelectionError, SelectionSet};
use crate::duplicates::{sort_groups, DuplicateGroup, FinderConfig, ScanSummary, SortKey};
use crate::progress::ProgressSink;
use crate::scanner::{FileId, FileRecord};
use crate::signal::CancelToken;

pub use worker::{ScanEvent, ScanWorker};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    /// No folders chosen
    #[default]
    Idle,
    /// At least one folder chosen, no scan yet
    FoldersChosen,
    /// Scan running on the worker thread
    Scanning,
    /// Scan finished without duplicates
    NoResults,
    /// Scan finished with duplicates, nothing selected yet
    ResultsReady,
    /// User is working on the selection
    Reviewing,
    /// At least one file was moved away
    Cleaned,
}

impl AppState {
    /// Whether the state holds scan results.
    #[must_use]
    pub fn has_results(&self) -> bool {
        matches!(self, Self::ResultsReady | Self::Reviewing | Self::Cleaned)
    }

    /// Whether a (re)scan may be started.
    #[must_use]
    pub fn can_scan(&self) -> bool {
        matches!(self, Self::FoldersChosen | Self::NoResults | Self::Cleaned)
    }
}

/// An operation was requested in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} while {from:?}")]
pub struct TransitionError {
    /// State the session was in.
    pub from: AppState,
    /// The refused operation.
    pub action: &'static str,
}

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation not allowed in the current state.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Selection change refused.
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Disposal refused before anything was moved.
    #[error(transparent)]
    Delete(#[from] DeleteError),

    /// The scan thread could not be started.
    #[error("failed to start scan: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Which groups a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewFilter {
    /// Every group
    #[default]
    All,
    /// Groups with at least one selected member
    SelectedOnly,
}

/// A duplicate-finding session.
pub struct App {
    state: AppState,
    roots: Vec<PathBuf>,
    groups: Vec<DuplicateGroup>,
    selection: SelectionSet,
    summary: Option<ScanSummary>,
    progress: Option<String>,
    cleaned_bytes: u64,
    finder_config: FinderConfig,
    cancel: CancelToken,
    observer: Option<Arc<dyn ProgressSink>>,
    worker: Option<ScanWorker>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("state", &self.state)
            .field("roots", &self.roots)
            .field("groups", &self.groups.len())
            .field("selected", &self.selection.len())
            .field("cleaned_bytes", &self.cleaned_bytes)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create an idle session with default scan settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AppState::Idle,
            roots: Vec::new(),
            groups: Vec::new(),
            selection: SelectionSet::new(),
            summary: None,
            progress: None,
            cleaned_bytes: 0,
            finder_config: FinderConfig::default(),
            cancel: CancelToken::new(),
            observer: None,
            worker: None,
        }
    }

    /// Use these scan settings; the shutdown flag and progress sink are
    /// supplied by the session.
    #[must_use]
    pub fn with_finder_config(mut self, config: FinderConfig) -> Self {
        self.finder_config = config;
        self
    }

    /// Share a cancellation token, e.g. the one the Ctrl+C handler sets.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Also deliver progress messages to `sink`, from the scan thread.
    #[must_use]
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.observer = Some(sink);
        self
    }

    fn transition(&mut self, to: AppState) {
        if self.state != to {
            log::debug!("State transition: {:?} -> {:?}", self.state, to);
            self.state = to;
        }
    }

    fn require(&self, allowed: &[AppState], action: &'static str) -> Result<(), TransitionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            log::debug!("Refused {} in state {:?}", action, self.state);
            Err(TransitionError {
                from: self.state,
                action,
            })
        }
    }

    fn clear_results(&mut self) {
        self.groups.clear();
        self.selection.deselect_all();
        self.summary = None;
        self.progress = None;
        self.cleaned_bytes = 0;
    }

    // ==================== State ====================

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AppState {
        self.state
    }

    /// Chosen root folders, in priority order.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Groups of the last scan, minus files already moved away.
    #[must_use]
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Statistics of the last completed scan.
    #[must_use]
    pub fn summary(&self) -> Option<&ScanSummary> {
        self.summary.as_ref()
    }

    /// Latest progress message of the running or last scan.
    #[must_use]
    pub fn progress_message(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    /// Cancellation token used for scans.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    // ==================== Folders ====================

    fn roots_changed(&mut self) {
        self.clear_results();
        let next = if self.roots.is_empty() {
            AppState::Idle
        } else {
            AppState::FoldersChosen
        };
        self.transition(next);
    }

    /// Replace the root folders. Duplicated entries are dropped, keeping the
    /// first occurrence. Previous results are discarded.
    ///
    /// # Errors
    ///
    /// Refused while a scan is running.
    pub fn set_roots(&mut self, roots: Vec<PathBuf>) -> Result<(), TransitionError> {
        self.require_not_scanning("change folders")?;
        self.roots.clear();
        for root in roots {
            if !self.roots.contains(&root) {
                self.roots.push(root);
            }
        }
        self.roots_changed();
        Ok(())
    }

    /// Add one root folder; returns `false` if it was already chosen.
    ///
    /// # Errors
    ///
    /// Refused while a scan is running.
    pub fn add_root(&mut self, root: impl Into<PathBuf>) -> Result<bool, TransitionError> {
        self.require_not_scanning("add a folder")?;
        let root = root.into();
        if self.roots.contains(&root) {
            return Ok(false);
        }
        self.roots.push(root);
        self.roots_changed();
        Ok(true)
    }

    /// Remove one root folder; returns `false` if it was not chosen.
    ///
    /// # Errors
    ///
    /// Refused while a scan is running.
    pub fn remove_root(&mut self, root: &Path) -> Result<bool, TransitionError> {
        self.require_not_scanning("remove a folder")?;
        let before = self.roots.len();
        self.roots.retain(|r| r != root);
        if self.roots.len() == before {
            return Ok(false);
        }
        self.roots_changed();
        Ok(true)
    }

    fn require_not_scanning(&self, action: &'static str) -> Result<(), TransitionError> {
        if self.state == AppState::Scanning {
            Err(TransitionError {
                from: self.state,
                action,
            })
        } else {
            Ok(())
        }
    }

    // ==================== Scanning ====================

    /// Start scanning the chosen roots in the background.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Transition`] unless folders are chosen and no scan
    ///   or review is in progress
    /// - [`SessionError::Spawn`] if the worker thread cannot be created
    pub fn start_scan(&mut self) -> Result<(), SessionError> {
        self.require(
            &[
                AppState::FoldersChosen,
                AppState::NoResults,
                AppState::Cleaned,
            ],
            "start a scan",
        )?;

        self.clear_results();
        self.cancel.reset();
        let worker = ScanWorker::spawn(
            self.roots.clone(),
            self.finder_config.clone(),
            self.cancel.clone(),
            self.observer.clone(),
        )?;
        self.worker = Some(worker);
        log::info!("Scanning {} folder(s)", self.roots.len());
        self.transition(AppState::Scanning);
        Ok(())
    }

    fn handle_event(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Progress(text) => self.progress = Some(text),
            ScanEvent::Summary(summary) => self.summary = Some(summary),
            ScanEvent::Finished(groups) => {
                if let Some(worker) = self.worker.take() {
                    worker.join();
                }
                self.groups = groups;
                let next = if self.groups.is_empty() {
                    AppState::NoResults
                } else {
                    AppState::ResultsReady
                };
                log::info!("Scan finished with {} group(s)", self.groups.len());
                self.transition(next);
            }
        }
    }

    /// Apply every event the worker has sent so far; never blocks.
    pub fn poll(&mut self) -> AppState {
        while self.state == AppState::Scanning {
            let Some(event) = self.worker.as_ref().and_then(ScanWorker::try_next) else {
                break;
            };
            self.handle_event(event);
        }
        self.state
    }

    /// Block until the running scan finishes. Returns immediately when no
    /// scan is running.
    pub fn wait(&mut self) -> AppState {
        while self.state == AppState::Scanning {
            let Some(event) = self.worker.as_ref().and_then(ScanWorker::next_blocking) else {
                // Worker vanished without a result.
                self.worker = None;
                self.transition(AppState::NoResults);
                break;
            };
            self.handle_event(event);
        }
        self.state
    }

    /// Cancel the running scan and return to the chosen folders.
    ///
    /// # Errors
    ///
    /// Refused unless a scan is running.
    pub fn stop_scan(&mut self) -> Result<(), TransitionError> {
        self.require(&[AppState::Scanning], "stop the scan")?;
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.clear_results();
        log::info!("Scan stopped");
        self.transition(AppState::FoldersChosen);
        Ok(())
    }

    /// Forget everything, cancelling a running scan.
    pub fn reset(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.roots.clear();
        self.clear_results();
        self.transition(AppState::Idle);
    }

    // ==================== Selection ====================

    const SELECTABLE: [AppState; 2] = [AppState::ResultsReady, AppState::Reviewing];

    /// Replace the selection with every copy except the one `policy` keeps.
    ///
    /// # Errors
    ///
    /// Refused unless results are being reviewed.
    pub fn auto_select(&mut self, policy: KeepPolicy) -> Result<(), TransitionError> {
        self.require(&Self::SELECTABLE, "select files")?;
        self.selection = select::auto_select(&self.groups, policy);
        self.transition(AppState::Reviewing);
        Ok(())
    }

    /// Flip the selection of one file; returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Transition`] unless results are being reviewed
    /// - [`SessionError::Selection`] if the file is unknown or is the last
    ///   unselected copy of its group
    pub fn toggle(&mut self, id: FileId) -> Result<bool, SessionError> {
        self.require(&Self::SELECTABLE, "select files")?;
        let group = self
            .groups
            .iter()
            .find(|g| g.contains(id))
            .ok_or(SelectionError::NotInGroup(id))?;
        let selected = self.selection.toggle(id, group)?;
        self.transition(AppState::Reviewing);
        Ok(selected)
    }

    /// Clear the selection.
    ///
    /// # Errors
    ///
    /// Refused unless results are being reviewed.
    pub fn deselect_all(&mut self) -> Result<(), TransitionError> {
        self.require(&Self::SELECTABLE, "select files")?;
        self.selection.deselect_all();
        self.transition(AppState::Reviewing);
        Ok(())
    }

    // ==================== Views ====================

    /// Groups ordered by `key`, restricted by `filter`.
    #[must_use]
    pub fn sorted_groups(&self, key: SortKey, filter: ViewFilter) -> Vec<DuplicateGroup> {
        let mut view: Vec<DuplicateGroup> = self
            .groups
            .iter()
            .filter(|g| match filter {
                ViewFilter::All => true,
                ViewFilter::SelectedOnly => self.selection.touches(g),
            })
            .cloned()
            .collect();
        sort_groups(&mut view, key);
        view
    }

    /// Space held by redundant copies across all groups.
    #[must_use]
    pub fn total_duplicate_size(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::wasted_size).sum()
    }

    /// Total size of the selected files.
    #[must_use]
    pub fn selected_size(&self) -> u64 {
        self.selection.selected_size(&self.groups)
    }

    /// Bytes moved away since the last scan.
    #[must_use]
    pub fn cleaned_size(&self) -> u64 {
        self.cleaned_bytes
    }

    // ==================== Disposal ====================

    /// Move the selected files away with `disposer`.
    ///
    /// Moved files leave their groups; groups left with fewer than two
    /// members are dropped. The selection is cleared once the batch is done,
    /// whatever its outcome. The session becomes [`AppState::Cleaned`] when
    /// at least one file moved, otherwise it stays in review.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Transition`] unless results are being reviewed
    /// - [`SessionError::Delete`] if the selection would remove every copy of
    ///   a group; nothing is moved in that case
    pub fn dispose_selected(
        &mut self,
        disposer: &dyn Disposer,
        config: &DisposalConfig,
    ) -> Result<DisposalReport, SessionError> {
        self.require(&[AppState::Reviewing], "remove files")?;
        for group in &self.groups {
            validate_preserves_keeper(&self.selection, group)?;
        }

        let records: Vec<FileRecord> = self
            .selection
            .selected_records(&self.groups)
            .into_iter()
            .cloned()
            .collect();
        let report = dispose(&records, disposer, config);

        for group in &mut self.groups {
            group.files.retain(|f| !report.moved.contains(&f.id));
        }
        self.groups.retain(|g| g.len() >= 2);
        self.selection.deselect_all();
        self.cleaned_bytes += report.moved_bytes;

        if report.moved_count > 0 {
            self.transition(AppState::Cleaned);
        }
        Ok(report)
    }
}
