//! Progress reporting for the scan pipeline.
//!
//! The pipeline speaks in short human-readable strings ("Found 120 files...",
//! "Verifying content 40% - photo.jpg"). Three pieces are provided:
//!
//! - [`ProgressSink`], the receiving end. Closures `Fn(&str)` implement it.
//! - [`ThrottledProgress`], which delivers at most one message per interval
//!   and lets stage-boundary messages through unconditionally.
//! - [`ConsoleProgress`], an indicatif spinner for the command line.
//!
//! Progress is best effort: a slow sink never holds up a hashing thread for
//! longer than one message and dropped messages are never retried.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Default minimum spacing between delivered messages.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Receives progress text from the scan pipeline.
pub trait ProgressSink: Send + Sync {
    /// Called with each delivered message.
    fn message(&self, text: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn message(&self, text: &str) {
        self(text);
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn message(&self, _text: &str) {}
}

/// Rate limiter in front of a [`ProgressSink`].
pub struct ThrottledProgress {
    sink: Arc<dyn ProgressSink>,
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for ThrottledProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledProgress")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl ThrottledProgress {
    /// Wrap `sink`, delivering at most one message per `interval`.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>, interval: Duration) -> Self {
        Self {
            sink,
            interval,
            last: Mutex::new(None),
        }
    }

    /// Deliver a message if the interval has elapsed.
    ///
    /// `text` is only evaluated when the message will actually be sent.
    /// Returns whether it was delivered.
    pub fn report_with<F>(&self, text: F) -> bool
    where
        F: FnOnce() -> String,
    {
        let now = Instant::now();
        {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(prev) = *last {
                if now.duration_since(prev) < self.interval {
                    return false;
                }
            }
            *last = Some(now);
        }
        self.sink.message(&text());
        true
    }

    /// Deliver a message if the interval has elapsed.
    pub fn report(&self, text: &str) -> bool {
        self.report_with(|| text.to_string())
    }

    /// Deliver a stage-boundary message regardless of the interval.
    pub fn force(&self, text: &str) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.sink.message(text);
    }
}

/// Integer percentage of `done` out of `total`, clamped to 100.
#[must_use]
pub fn percent(done: usize, total: usize) -> usize {
    if total == 0 {
        100
    } else {
        (done.saturating_mul(100) / total).min(100)
    }
}

/// Progress texts emitted by the pipeline.
pub mod messages {
    /// Start of enumeration.
    pub const SCANNING: &str = "Scanning directory structure...";
    /// Start of group assembly.
    pub const FINALIZING: &str = "Finalizing results...";

    /// Running file count during enumeration.
    #[must_use]
    pub fn found(count: usize) -> String {
        format!("Found {} files...", count)
    }

    /// Partial-hash stage progress.
    #[must_use]
    pub fn prescanning(pct: usize) -> String {
        format!("Pre-scanning {}%...", pct)
    }

    /// Full-hash stage progress with the current file name.
    #[must_use]
    pub fn verifying(pct: usize, name: &str) -> String {
        format!("Verifying content {}% - {}", pct, name)
    }
}

/// Console spinner showing the latest progress text.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// Create a spinner; when `quiet` it draws nothing.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { bar }
    }

    /// Remove the spinner from the terminal.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ConsoleProgress {
    fn message(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }
}
