//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping (Phase 1)
//! - Three-window prehash comparison (Phase 2)
//! - Full hash confirmation (Phase 3)
//! - Duplicate group metrics and ordering

pub mod finder;
pub mod groups;

pub use finder::{
    phase2_prehash, phase3_fullhash, scan, scan_with_config, DuplicateFinder, FinderConfig,
    FinderError, FullhashStats, PhaseConfig, PrehashGroups, PrehashStats, ScanSummary,
};
pub use groups::{group_by_size, sort_groups, DuplicateGroup, GroupingStats, SortKey};
