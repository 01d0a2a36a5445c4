//! JSON output formatter for duplicate scan results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00Z",
//!   "duplicates": [
//!     {
//!       "hash": "abc123...",
//!       "size": 1024,
//!       "wasted": 1024,
//!       "files": [
//!         { "id": 3, "path": "/a/x.bin", "modified": "2025-12-31T08:00:00Z", "selected": false },
//!         { "id": 9, "path": "/b/y.bin", "modified": null, "selected": true }
//!       ]
//!     }
//!   ],
//!   "summary": { "total_files": 100, "duplicate_groups": 1, "...": "..." },
//!   "selection": { "policy": "newest", "count": 1, "bytes": 1024 },
//!   "disposal": { "destination": "trash", "moved_count": 1, "moved_bytes": 1024, "failures": [] },
//!   "exit_code": 0,
//!   "exit_code_name": "DD000"
//! }
//! ```
//!
//! `summary`, `selection` and `disposal` are omitted when not applicable.

use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::delete::DisposalReport;
use crate::actions::select::{KeepPolicy, SelectionSet};
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::FileRecord;

/// One member of a group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Session-unique file id
    pub id: u64,
    /// Path as scanned
    pub path: String,
    /// Last modification time, if known
    pub modified: Option<DateTime<Utc>>,
    /// Whether the file is selected for removal
    pub selected: bool,
}

impl JsonFile {
    fn from_record(record: &FileRecord, selection: Option<&SelectionSet>) -> Self {
        Self {
            id: record.id.as_u64(),
            path: path_string(&record.path),
            modified: record.modified.map(to_utc),
            selected: selection.is_some_and(|s| s.contains(record.id)),
        }
    }
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// BLAKE3 hash as hexadecimal string (64 characters)
    pub hash: String,
    /// File size in bytes
    pub size: u64,
    /// Bytes held by the redundant copies
    pub wasted: u64,
    /// Members in discovery order
    pub files: Vec<JsonFile>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group, marking selected members.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup, selection: Option<&SelectionSet>) -> Self {
        Self {
            hash: group.hash_hex(),
            size: group.size,
            wasted: group.wasted_size(),
            files: group
                .files
                .iter()
                .map(|f| JsonFile::from_record(f, selection))
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files scanned
    pub total_files: usize,
    /// Total size of all scanned files in bytes
    pub total_size: u64,
    /// Files ruled out because no other file had their size
    pub eliminated_by_size: usize,
    /// Files ruled out by the partial fingerprint
    pub eliminated_by_prehash: usize,
    /// Files that could not be read
    pub skipped_files: usize,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding one per group)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Walk and hashing errors as messages
    pub errors: Vec<String>,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            eliminated_by_size: summary.eliminated_by_size,
            eliminated_by_prehash: summary.eliminated_by_prehash,
            skipped_files: summary.skipped_files,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            errors: summary
                .scan_errors
                .iter()
                .map(ToString::to_string)
                .chain(summary.hash_errors.iter().map(ToString::to_string))
                .collect(),
        }
    }
}

/// Automatic selection applied before output.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSelection {
    /// Which copy of each group was kept
    pub policy: KeepPolicy,
    /// Number of selected files
    pub count: usize,
    /// Total size of the selected files
    pub bytes: u64,
}

/// A file that could not be moved.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    /// Path of the file
    pub path: String,
    /// Why it was left in place
    pub reason: String,
}

/// Outcome of a disposal.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDisposal {
    /// Trash or quarantine directory
    pub destination: String,
    /// Number of files moved
    pub moved_count: usize,
    /// Bytes moved
    pub moved_bytes: u64,
    /// Files left in place
    pub failures: Vec<JsonFailure>,
}

impl JsonDisposal {
    /// Create the JSON form of a disposal report.
    #[must_use]
    pub fn from_report(report: &DisposalReport, destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            moved_count: report.moved_count,
            moved_bytes: report.moved_bytes,
            failures: report
                .failures
                .iter()
                .map(|(record, reason)| JsonFailure {
                    path: path_string(&record.path),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the document was produced
    pub generated_at: DateTime<Utc>,
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan summary statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<JsonSummary>,
    /// Selection, when a keep policy was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<JsonSelection>,
    /// Disposal outcome, when files were removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposal: Option<JsonDisposal>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DD000")
    pub exit_code_name: String,
}

impl JsonOutput {
    /// Create a new JSON output from duplicate groups and a summary.
    ///
    /// # Example
    ///
    /// ```
    /// use dedupify::duplicates::{DuplicateGroup, ScanSummary};
    /// use dedupify::output::json::JsonOutput;
    /// use dedupify::scanner::FileRecord;
    /// use std::path::PathBuf;
    ///
    /// let groups = vec![DuplicateGroup::new(
    ///     [0u8; 32],
    ///     1024,
    ///     vec![
    ///         FileRecord::new(PathBuf::from("/file1.txt"), 1024, None),
    ///         FileRecord::new(PathBuf::from("/file2.txt"), 1024, None),
    ///     ],
    /// )];
    ///
    /// let output = JsonOutput::new(&groups, Some(&ScanSummary::default()));
    /// assert_eq!(output.duplicates.len(), 1);
    /// assert_eq!(output.duplicates[0].wasted, 1024);
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: Option<&ScanSummary>) -> Self {
        Self {
            generated_at: Utc::now(),
            duplicates: groups
                .iter()
                .map(|g| JsonDuplicateGroup::from_duplicate_group(g, None))
                .collect(),
            summary: summary.map(JsonSummary::from_scan_summary),
            selection: None,
            disposal: None,
            exit_code: ExitCode::Success.as_i32(),
            exit_code_name: ExitCode::Success.code_prefix().to_string(),
        }
    }

    /// Mark selected files and record the policy that chose them.
    #[must_use]
    pub fn with_selection(
        mut self,
        groups: &[DuplicateGroup],
        selection: &SelectionSet,
        policy: KeepPolicy,
    ) -> Self {
        self.duplicates = groups
            .iter()
            .map(|g| JsonDuplicateGroup::from_duplicate_group(g, Some(selection)))
            .collect();
        self.selection = Some(JsonSelection {
            policy,
            count: selection.len(),
            bytes: selection.selected_size(groups),
        });
        self
    }

    /// Record a disposal outcome.
    #[must_use]
    pub fn with_disposal(mut self, report: &DisposalReport, destination: impl Into<String>) -> Self {
        self.disposal = Some(JsonDisposal::from_report(report, destination));
        self
    }

    /// Set the exit code reported in the document.
    #[must_use]
    pub fn with_exit_code(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code.as_i32();
        self.exit_code_name = exit_code.code_prefix().to_string();
        self
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
