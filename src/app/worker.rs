//! Background scan thread.
//!
//! A [`ScanWorker`] runs one scan on its own thread and reports back over a
//! channel. Progress messages arrive as [`ScanEvent::Progress`]; the last
//! event is always [`ScanEvent::Finished`], carrying an empty list when the
//! scan was cancelled.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::duplicates::{DuplicateFinder, DuplicateGroup, FinderConfig, FinderError, ScanSummary};
use crate::progress::ProgressSink;
use crate::signal::CancelToken;

/// Message from a running scan.
#[derive(Debug)]
pub enum ScanEvent {
    /// Human-readable progress text.
    Progress(String),
    /// Statistics of a scan that ran to completion; sent just before `Finished`.
    Summary(ScanSummary),
    /// Final result. Empty when cancelled or when nothing was found.
    Finished(Vec<DuplicateGroup>),
}

/// Handle to a scan running on a background thread.
pub struct ScanWorker {
    events: Receiver<ScanEvent>,
    handle: Option<JoinHandle<()>>,
    cancel: CancelToken,
}

impl std::fmt::Debug for ScanWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanWorker")
            .field("running", &self.handle.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ScanWorker {
    /// Start scanning `roots` on a new thread.
    ///
    /// `config`'s shutdown flag is replaced by `cancel`. Every progress
    /// message is sent on the channel and also passed to `observer`, if any,
    /// from the scan thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(
        roots: Vec<PathBuf>,
        config: FinderConfig,
        cancel: CancelToken,
        observer: Option<Arc<dyn ProgressSink>>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();

        let progress_tx = tx.clone();
        let sink = move |text: &str| {
            if let Some(observer) = &observer {
                observer.message(text);
            }
            let _ = progress_tx.send(ScanEvent::Progress(text.to_string()));
        };

        let config = config
            .with_shutdown_flag(cancel.get_flag())
            .with_progress(Arc::new(sink));

        let handle = thread::Builder::new()
            .name("dedupify-scan".to_string())
            .spawn(move || {
                let finder = DuplicateFinder::new(config);
                let groups = match finder.find_duplicates(&roots) {
                    Ok((groups, summary)) => {
                        let _ = tx.send(ScanEvent::Summary(summary));
                        groups
                    }
                    Err(FinderError::Interrupted) => {
                        log::info!("Scan cancelled, discarding partial results");
                        Vec::new()
                    }
                    Err(e) => {
                        log::error!("Scan failed: {}", e);
                        Vec::new()
                    }
                };
                let _ = tx.send(ScanEvent::Finished(groups));
            })?;

        log::debug!("Scan worker started");
        Ok(Self {
            events: rx,
            handle: Some(handle),
            cancel,
        })
    }

    /// Next event if one is ready; never blocks.
    #[must_use]
    pub fn try_next(&self) -> Option<ScanEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Next event, waiting for it. `None` once the worker is gone.
    #[must_use]
    pub fn next_blocking(&self) -> Option<ScanEvent> {
        self.events.recv().ok()
    }

    /// Request cancellation without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel the scan and wait for the thread to exit.
    pub fn stop(mut self) {
        self.cancel();
        self.join_thread();
    }

    /// Wait for a worker that already sent `Finished`; the token is left alone.
    pub fn join(mut self) {
        self.join_thread();
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Scan worker panicked");
            }
        }
    }
}

impl Drop for ScanWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
            self.join_thread();
        }
    }
}
