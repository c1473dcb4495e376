//! Run statistics aggregation and periodic progress reporting

use artsync_types::{DispatchOutcome, FailedPath, OutcomeStatus, RunSummary, SyncEvent};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::info;

/// Emit a progress report every this many completed outcomes.
const REPORT_EVERY: usize = 50;

/// Thread-safe accumulator of dispatch outcomes.
///
/// Aggregation is commutative, so the completion order across workers
/// never changes the final summary.
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    event_tx: broadcast::Sender<SyncEvent>,
    /// Planned outcomes for the whole run.
    total: usize,
    started: Instant,
    started_at: DateTime<Utc>,
}

#[derive(Default)]
struct TrackerState {
    succeeded: usize,
    skipped: usize,
    failed: usize,
    bytes_transferred: u64,
    failed_paths: Vec<FailedPath>,
}

impl ProgressTracker {
    pub fn new(total: usize, event_tx: broadcast::Sender<SyncEvent>) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            event_tx,
            total,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Record one completed outcome from any worker.
    pub fn record(&self, outcome: DispatchOutcome) {
        let report = {
            let mut state = self.state.lock();
            match outcome.status {
                OutcomeStatus::Success => {
                    state.succeeded += 1;
                    state.bytes_transferred += outcome.bytes_transferred.unwrap_or(0);
                }
                OutcomeStatus::Skipped => state.skipped += 1,
                OutcomeStatus::Failed => {
                    state.failed += 1;
                    state.failed_paths.push(FailedPath {
                        path: outcome.path.clone(),
                        reason: outcome
                            .error
                            .clone()
                            .unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
            }

            let processed = state.succeeded + state.skipped + state.failed;
            (processed % REPORT_EVERY == 0 || processed == self.total).then(|| {
                SyncEvent::Progress {
                    processed,
                    total: self.total,
                    succeeded: state.succeeded,
                    skipped: state.skipped,
                    failed: state.failed,
                    bytes_transferred: state.bytes_transferred,
                    per_second: processed as f64
                        / self.started.elapsed().as_secs_f64().max(f64::EPSILON),
                }
            })
        };

        let _ = self.event_tx.send(SyncEvent::ArtifactFinished { outcome });

        if let Some(event) = report {
            if let SyncEvent::Progress {
                processed,
                total,
                per_second,
                ..
            } = &event
            {
                info!("progress: {processed}/{total} outcomes ({per_second:.2}/s)");
            }
            let _ = self.event_tx.send(event);
        }
    }

    /// Build the final summary. `not_attempted` counts planned outcomes
    /// that were never claimed before the run stopped.
    pub fn finalize(&self, not_attempted: usize) -> RunSummary {
        let state = self.state.lock();
        // Failures are listed in path order regardless of which worker hit them.
        let mut failed_paths = state.failed_paths.clone();
        failed_paths.sort_by(|a, b| a.path.cmp(&b.path));

        RunSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            total: self.total,
            succeeded: state.succeeded,
            skipped: state.skipped,
            failed: state.failed,
            not_attempted,
            bytes_transferred: state.bytes_transferred,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            failed_paths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artsync_types::ArtifactAction;
    use std::time::Duration;

    fn outcomes() -> Vec<DispatchOutcome> {
        vec![
            DispatchOutcome::success(
                "a.jar",
                ArtifactAction::Download,
                Some(100),
                Duration::from_millis(5),
            ),
            DispatchOutcome::skipped("b.jar", ArtifactAction::Download, Duration::from_millis(1)),
            DispatchOutcome::failed(
                "c.jar",
                ArtifactAction::Download,
                "HTTP 500",
                Duration::from_millis(3),
            ),
            DispatchOutcome::success(
                "d.jar",
                ArtifactAction::Download,
                Some(250),
                Duration::from_millis(8),
            ),
        ]
    }

    #[test]
    fn aggregates_counts_and_bytes() {
        let (tx, _rx) = broadcast::channel(16);
        let tracker = ProgressTracker::new(4, tx);
        for outcome in outcomes() {
            tracker.record(outcome);
        }

        let summary = tracker.finalize(0);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.bytes_transferred, 350);
        assert_eq!(summary.failed_paths.len(), 1);
        assert_eq!(summary.failed_paths[0].path, "c.jar");
        assert_eq!(summary.failed_paths[0].reason, "HTTP 500");
    }

    #[test]
    fn aggregation_is_order_independent() {
        let (tx, _rx) = broadcast::channel(16);
        let forward = ProgressTracker::new(4, tx.clone());
        for outcome in outcomes() {
            forward.record(outcome);
        }

        let reversed = ProgressTracker::new(4, tx);
        for outcome in outcomes().into_iter().rev() {
            reversed.record(outcome);
        }

        let a = forward.finalize(0);
        let b = reversed.finalize(0);
        assert_eq!(a.succeeded, b.succeeded);
        assert_eq!(a.skipped, b.skipped);
        assert_eq!(a.failed, b.failed);
        assert_eq!(a.bytes_transferred, b.bytes_transferred);
        assert_eq!(a.failed_paths, b.failed_paths);
    }
}
