//! File actions module.
//!
//! This module provides functionality for:
//! - Choosing which copies to remove (automatic or one at a time)
//! - Moving the chosen copies to the trash or a quarantine directory
//!
//! # Selection
//!
//! ```
//! use dedupify::actions::select::{auto_select, KeepPolicy};
//!
//! let selection = auto_select(&[], KeepPolicy::Newest);
//! assert!(selection.is_empty());
//! ```
//!
//! # Disposal
//!
//! Disposal is always reversible and verifies each file against its scanned
//! size and modification time first.
//!
//! ```no_run
//! use dedupify::actions::delete::{dispose, DisposalConfig, QuarantineDir};
//!
//! let report = dispose(&[], &QuarantineDir::new("/tmp/held"), &DisposalConfig::default());
//! assert_eq!(report.moved_count, 0);
//! ```

pub mod delete;
pub mod select;

// Re-export commonly used types
pub use delete::{
    dispose, validate_preserves_keeper, DeleteError, DisposalConfig, DisposalReport, Disposer,
    FileSnapshot, QuarantineDir, SystemTrash,
};
pub use select::{auto_select, keep_order, keeper, KeepPolicy, SelectionError, SelectionSet};
