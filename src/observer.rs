//! Progress reporting for batch runs.
//!
//! The batch driver never logs per-file results on its own; it hands them to
//! a [`BatchObserver`] chosen by the caller. [`LogObserver`] forwards to the
//! `log` facade, which is what the CLI uses.

use crate::engine::{BatchSummary, FileOutcome};

/// Receives per-file and end-of-run events from a batch run.
///
/// Files may be processed in parallel, so implementations must be `Sync`.
/// Per-file events are delivered once the files are processed, in the order
/// the walk found them, followed by a single `on_finished`.
pub trait BatchObserver: Sync {
    /// A file was watermarked and written.
    fn on_file_done(&self, _outcome: &FileOutcome) {}

    /// A file could not be decoded or written. The run continues.
    fn on_file_failed(&self, _outcome: &FileOutcome) {}

    /// The run is over.
    fn on_finished(&self, _summary: &BatchSummary) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl BatchObserver for NullObserver {}

/// Reports events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn on_file_done(&self, outcome: &FileOutcome) {
        log::info!("Watermarked image saved: {}", outcome.output.display());
    }

    fn on_file_failed(&self, outcome: &FileOutcome) {
        log::error!("{}: {}", outcome.path.display(), outcome.message);
    }

    fn on_finished(&self, summary: &BatchSummary) {
        log::info!(
            "Processed {} images. Failed: {}.",
            summary.processed,
            summary.failed
        );
    }
}
