//! Dedupify - byte-identical duplicate file finder
//!
//! Finds files with exactly the same content under one or more folders
//! (size, then a three-window BLAKE3 fingerprint, then a full BLAKE3 hash),
//! and moves the redundant copies to the trash or a quarantine directory.
//!
//! The [`app::App`] session drives scanning, selection and disposal; the
//! `dedupify` binary is a thin command-line front end over it.

pub mod actions;
pub mod app;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::delete::{DisposalConfig, DisposalReport, Disposer, QuarantineDir, SystemTrash};
use crate::app::{App, AppState, ViewFilter};
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{FinderConfig, FinderError, ScanSummary};
use crate::error::ExitCode;
use crate::output::{write_disposal, JsonOutput, TextOutput};
use crate::progress::ConsoleProgress;
use crate::scanner::WalkerConfig;

/// Run the parsed command line and return the process exit code.
///
/// # Errors
///
/// Returns an error for invalid option combinations, a failed scan start,
/// an interrupted scan ([`FinderError::Interrupted`]) or unwritable output.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Scan(args) => run_scan(args, &config, cli.quiet),
    }
}

fn finder_config(args: &ScanArgs, config: &Config) -> FinderConfig {
    let walker = WalkerConfig::with_extra_ignored(
        config
            .extra_ignored_dirs
            .iter()
            .chain(args.ignore_dirs.iter())
            .cloned(),
    );
    FinderConfig::default()
        .with_io_threads(args.io_threads.unwrap_or(config.io_threads))
        .with_walker_config(walker)
        .with_progress_interval(config.progress_interval())
}

fn run_scan(args: ScanArgs, config: &Config, quiet: bool) -> Result<ExitCode> {
    let keep = args.keep.or(config.keep);
    let sort = args.sort.unwrap_or(config.sort);
    if args.delete && keep.is_none() {
        anyhow::bail!("--delete needs a keep policy (--keep newest|oldest)");
    }
    let remove = args.delete && args.yes;
    if args.delete && !args.yes {
        log::warn!("--delete without --yes: showing the selection only");
    }

    let cancel = signal::install_handler().context("failed to install Ctrl+C handler")?;
    let console = Arc::new(ConsoleProgress::new(quiet));

    let mut app = App::new()
        .with_finder_config(finder_config(&args, config))
        .with_cancel_token(cancel.clone())
        .with_progress_sink(console.clone());
    app.set_roots(args.roots.clone())?;
    app.start_scan().context("could not start the scan")?;
    let state = app.wait();
    console.finish();

    if cancel.is_cancelled() {
        return Err(FinderError::Interrupted.into());
    }

    let groups = app.sorted_groups(sort, ViewFilter::All);
    let mut report: Option<(DisposalReport, String)> = None;

    if state == AppState::ResultsReady {
        if let Some(policy) = keep {
            app.auto_select(policy)?;
        }
    }
    let selection = app.selection().clone();

    if remove && state == AppState::ResultsReady && !selection.is_empty() {
        let disposer: Box<dyn Disposer> = match &args.quarantine {
            Some(dir) => Box::new(QuarantineDir::new(dir)),
            None => Box::new(SystemTrash),
        };
        let disposal_config =
            DisposalConfig::default().with_verify_unchanged(config.verify_before_delete);
        let outcome = app
            .dispose_selected(disposer.as_ref(), &disposal_config)
            .context("could not remove the selected files")?;
        report = Some((outcome, disposer.destination()));
    }

    let exit_code = match (&report, groups.is_empty()) {
        (_, true) => ExitCode::NoDuplicates,
        (Some((r, _)), false) if !r.all_succeeded() => ExitCode::PartialSuccess,
        _ => ExitCode::Success,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Json => {
            let mut doc = JsonOutput::new(&groups, app.summary());
            if let Some(policy) = keep.filter(|_| !groups.is_empty()) {
                doc = doc.with_selection(&groups, &selection, policy);
            }
            if let Some((r, destination)) = &report {
                doc = doc.with_disposal(r, destination.clone());
            }
            doc.with_exit_code(exit_code)
                .write_to(&mut out, true)
                .context("failed to write JSON output")?;
        }
        OutputFormat::Text => {
            let mut text = TextOutput::new(&groups);
            if keep.is_some() {
                text = text.with_selection(&selection);
            }
            write_text(&mut out, &text, app.summary(), report.as_ref(), !remove)
                .context("failed to write output")?;
        }
    }

    Ok(exit_code)
}

fn write_text<W: Write>(
    out: &mut W,
    text: &TextOutput<'_>,
    summary: Option<&ScanSummary>,
    report: Option<&(DisposalReport, String)>,
    dry_run: bool,
) -> std::io::Result<()> {
    if text.is_empty() {
        writeln!(out, "No duplicates found")?;
    }
    text.write_groups(out)?;
    if let Some(summary) = summary {
        text.write_summary(out, summary)?;
    }
    text.write_selection(out, dry_run)?;
    if let Some((report, destination)) = report {
        write_disposal(out, report, destination)?;
    }
    Ok(())
}
