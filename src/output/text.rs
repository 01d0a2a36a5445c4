//! Human-readable listing of scan results.
//!
//! ```text
//! Group 1: 3 copies of 1.0 MiB, 2.0 MiB reclaimable
//!   keep   /photos/2024/beach.jpg
//!   remove /backup/beach.jpg
//!   remove /backup/old/beach.jpg
//!
//! 1 duplicate group, 2 redundant files, 2.0 MiB reclaimable (12 files scanned in 0.3s)
//! ```
//!
//! Without a selection every member is printed with a plain indent.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::actions::delete::DisposalReport;
use crate::actions::select::SelectionSet;
use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Text renderer over borrowed results.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    selection: Option<&'a SelectionSet>,
}

impl<'a> TextOutput<'a> {
    /// List `groups` in the order given.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self {
            groups,
            selection: None,
        }
    }

    /// Mark each member as kept or removed.
    #[must_use]
    pub fn with_selection(mut self, selection: &'a SelectionSet) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Whether there is nothing to list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Write every group.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_groups<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (index, group) in self.groups.iter().enumerate() {
            writeln!(
                writer,
                "Group {}: {} copies of {}, {} reclaimable",
                index + 1,
                group.len(),
                ByteSize(group.size),
                ByteSize(group.wasted_size())
            )?;
            for file in &group.files {
                let marker = match self.selection {
                    Some(sel) if sel.contains(file.id) => "remove ",
                    Some(_) => "keep   ",
                    None => "",
                };
                writeln!(writer, "  {}{}", marker, file.path.display())?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Write the one-line scan summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_summary<W: Write>(&self, writer: &mut W, summary: &ScanSummary) -> io::Result<()> {
        let groups = self.groups.len();
        let redundant: usize = self.groups.iter().map(DuplicateGroup::duplicate_count).sum();
        let reclaimable: u64 = self.groups.iter().map(DuplicateGroup::wasted_size).sum();
        writeln!(
            writer,
            "{} duplicate group{}, {} redundant file{}, {} reclaimable ({} files scanned in {:.1}s)",
            groups,
            plural(groups),
            redundant,
            plural(redundant),
            ByteSize(reclaimable),
            summary.total_files,
            summary.scan_duration.as_secs_f64()
        )?;

        let problems = summary.scan_errors.len() + summary.hash_errors.len();
        if problems > 0 {
            writeln!(
                writer,
                "{} path{} could not be read (run with -v for details)",
                problems,
                plural(problems)
            )?;
        }
        Ok(())
    }

    /// Write the selection totals; `dry_run` adds a hint on how to apply it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_selection<W: Write>(&self, writer: &mut W, dry_run: bool) -> io::Result<()> {
        let Some(selection) = self.selection else {
            return Ok(());
        };
        writeln!(
            writer,
            "{} file{} selected ({})",
            selection.len(),
            plural(selection.len()),
            ByteSize(selection.selected_size(self.groups))
        )?;
        if dry_run && !selection.is_empty() {
            writeln!(writer, "Dry run: pass --delete --yes to remove them")?;
        }
        Ok(())
    }
}

/// Write a disposal report: the totals, then one line per failure.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_disposal<W: Write>(
    writer: &mut W,
    report: &DisposalReport,
    destination: &str,
) -> io::Result<()> {
    writeln!(writer, "{} (to {})", report.summary(), destination)?;
    for (record, reason) in &report.failures {
        writeln!(writer, "  failed: {}: {}", record.path.display(), reason)?;
    }
    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
