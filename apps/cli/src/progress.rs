//! Terminal progress rendering from engine events

use artsync_types::{OutcomeStatus, SyncEvent};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::{error::RecvError, Receiver};

pub struct SyncProgress;

impl SyncProgress {
    /// Consume engine events until the run finishes: a spinner during
    /// discovery, a bar during dispatch.
    pub async fn drive(mut events: Receiver<SyncEvent>, render: bool, actions_per_artifact: usize) {
        let bar = if render {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        bar.set_message("discovering artifacts...");
        bar.enable_steady_tick(Duration::from_millis(120));

        loop {
            match events.recv().await {
                Ok(SyncEvent::DiscoveryPage { total, .. }) => {
                    bar.set_message(format!("discovering artifacts... {total} found"));
                }

                Ok(SyncEvent::DiscoveryComplete { total }) => {
                    bar.disable_steady_tick();
                    bar.set_style(
                        ProgressStyle::default_bar()
                            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta}) {msg}")
                            .unwrap()
                            .progress_chars("█▓▒░  "),
                    );
                    bar.set_length((total * actions_per_artifact) as u64);
                    bar.set_position(0);
                    bar.set_message("");
                }

                Ok(SyncEvent::ArtifactFinished { outcome }) => {
                    bar.inc(1);
                    if outcome.status == OutcomeStatus::Failed {
                        bar.set_message(format!("{} {}", style("✗").red(), outcome.path));
                    }
                }

                Ok(SyncEvent::Progress { .. }) => {}

                Ok(SyncEvent::RunFinished { .. }) => {
                    bar.finish_and_clear();
                    break;
                }

                Err(RecvError::Lagged(_)) => continue,

                Err(RecvError::Closed) => {
                    bar.finish_and_clear();
                    break;
                }
            }
        }
    }
}
