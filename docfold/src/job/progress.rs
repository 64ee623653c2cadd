//! Progress events published by the executor.

use serde::Serialize;
use tokio::sync::mpsc;

/// Sending half of the progress channel.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Phase of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    /// Planning, conversion and accumulation.
    Merging,
    /// Copying the final artifact to the output path.
    Writing,
    /// Finished successfully.
    Done,
    /// Stopped by the user.
    Canceled,
}

/// One progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Inputs fully processed.
    pub completed: usize,
    /// Total inputs.
    pub total: usize,
    /// 0..=100; capped at 95 while merging.
    pub percent: u8,
    /// Human-readable description of the current step.
    pub label: String,
    /// Current phase.
    pub phase: ProgressPhase,
    /// Set on the terminal success event.
    pub done: bool,
}

/// Percent shown while merging: `min(95, round(completed / max(1, total) * 95))`.
pub fn merging_percent(completed: usize, total: usize) -> u8 {
    let ratio = completed as f64 / total.max(1) as f64;
    (ratio * 95.0).round().min(95.0) as u8
}

/// Publishes events for one job. Sending never fails the job.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<ProgressSender>,
    total: usize,
}

impl ProgressReporter {
    /// Reporter for a job with `total` inputs.
    pub fn new(tx: Option<ProgressSender>, total: usize) -> Self {
        Self { tx, total }
    }

    /// Total input count.
    pub fn total(&self) -> usize {
        self.total
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver just means nobody is listening anymore.
            let _ = tx.send(event);
        }
    }

    /// Merging-phase status.
    pub fn merging(&self, completed: usize, label: &str) {
        self.send(ProgressEvent {
            completed,
            total: self.total,
            percent: merging_percent(completed, self.total),
            label: label.to_string(),
            phase: ProgressPhase::Merging,
            done: false,
        });
    }

    /// Final copy to the destination is starting.
    pub fn writing(&self) {
        self.send(ProgressEvent {
            completed: self.total,
            total: self.total,
            percent: 99,
            label: "Writing file to disk".to_string(),
            phase: ProgressPhase::Writing,
            done: false,
        });
    }

    /// Terminal success event.
    pub fn done(&self) {
        self.send(ProgressEvent {
            completed: self.total,
            total: self.total,
            percent: 100,
            label: "Finished".to_string(),
            phase: ProgressPhase::Done,
            done: true,
        });
    }

    /// Terminal cancellation event.
    pub fn canceled(&self, completed: usize) {
        self.send(ProgressEvent {
            completed,
            total: self.total,
            percent: 0,
            label: "Canceled".to_string(),
            phase: ProgressPhase::Canceled,
            done: false,
        });
    }
}
