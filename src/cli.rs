//! Command-line interface definitions for Dedupify.
//!
//! This module defines all CLI arguments, subcommands, and options using the
//! clap derive API. Global options (verbosity, config file, error format) come
//! before the subcommand.
//!
//! # Example
//!
//! ```bash
//! # List duplicates under two folders
//! dedupify scan ~/Pictures ~/Backup
//!
//! # Show what keeping the newest copy would remove (dry run)
//! dedupify scan ~/Pictures --keep newest --delete
//!
//! # Move the older copies to the trash
//! dedupify scan ~/Pictures --keep newest --delete --yes
//!
//! # JSON for scripting
//! dedupify scan ~/Pictures --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::actions::select::KeepPolicy;
use crate::duplicates::SortKey;

/// Byte-identical duplicate file finder.
///
/// Dedupify groups files whose content is exactly the same (BLAKE3) and can
/// move the redundant copies to the trash or a quarantine directory.
#[derive(Debug, Parser)]
#[command(name = "dedupify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, value_name = "FILE", env = "DEDUPIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for Dedupify.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan directories for duplicate files
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories to scan, in priority order
    #[arg(value_name = "ROOT", required = true, num_args = 1..)]
    pub roots: Vec<PathBuf>,

    /// Select every copy except the newest or oldest of each group
    #[arg(short, long, value_enum, value_name = "POLICY")]
    pub keep: Option<KeepPolicy>,

    /// Order of the listed groups
    #[arg(short, long, value_enum, value_name = "KEY")]
    pub sort: Option<SortKey>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Number of I/O threads for each hashing stage (default: 4)
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Extra directory names to skip (can be specified multiple times)
    #[arg(long = "ignore-dir", value_name = "NAME")]
    pub ignore_dirs: Vec<String>,

    /// Remove the selected copies (needs a keep policy and --yes)
    #[arg(long)]
    pub delete: bool,

    /// Move removed copies into this directory instead of the trash
    #[arg(long, value_name = "DIR", requires = "delete")]
    pub quarantine: Option<PathBuf>,

    /// Confirm removal; without it --delete is a dry run
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
