//! Dispatch pool: bounded-concurrency application of actions to artifacts
//!
//! A fixed pool of workers shares one claim cursor over the ordered
//! catalog, so artifacts are claimed in catalog order even though
//! completion order across workers is free. A single artifact failing
//! never stops the pool; its outcome is recorded and the next artifact is
//! claimed.

use crate::engine::{ProgressTracker, RateLimiter};
use crate::error::SyncError;
use artsync_types::{
    ArtifactAction, ArtifactRecord, Credentials, DispatchOutcome, SyncConfig, TargetConfig,
};
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tracing::{debug, error};
use url::Url;

/// Upper bound on dispatch workers.
pub const MAX_PARALLELISM: usize = 20;

/// Cooperative stop signal checked by workers between artifacts.
///
/// Cancelling lets in-flight operations finish normally, which keeps the
/// temp-file-then-rename guarantee intact.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Bounded worker pool applying the configured action(s) to every record.
pub struct DispatchPool {
    client: Client,
    limiter: RateLimiter,
    config: Arc<SyncConfig>,
    credentials: Option<Credentials>,
    tracker: Arc<ProgressTracker>,
    cancel: CancelFlag,
}

impl DispatchPool {
    pub fn new(
        client: Client,
        limiter: RateLimiter,
        config: Arc<SyncConfig>,
        credentials: Option<Credentials>,
        tracker: Arc<ProgressTracker>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            client,
            limiter,
            config,
            credentials,
            tracker,
            cancel,
        }
    }

    /// Run the pool to completion (or cancellation). Returns how many
    /// artifacts were claimed before the pool stopped.
    pub async fn run(&self, records: Arc<Vec<ArtifactRecord>>) -> usize {
        let cursor = Arc::new(AtomicUsize::new(0));
        let mut workers = JoinSet::new();

        for worker in 0..self.config.parallelism {
            let ctx = WorkerContext {
                client: self.client.clone(),
                limiter: self.limiter.clone(),
                config: Arc::clone(&self.config),
                credentials: self.credentials.clone(),
                tracker: Arc::clone(&self.tracker),
                cancel: self.cancel.clone(),
                records: Arc::clone(&records),
                cursor: Arc::clone(&cursor),
            };
            workers.spawn(async move { ctx.run(worker).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!("dispatch worker panicked: {err}");
            }
        }

        cursor.load(Ordering::Acquire).min(records.len())
    }
}

struct WorkerContext {
    client: Client,
    limiter: RateLimiter,
    config: Arc<SyncConfig>,
    credentials: Option<Credentials>,
    tracker: Arc<ProgressTracker>,
    cancel: CancelFlag,
    records: Arc<Vec<ArtifactRecord>>,
    cursor: Arc<AtomicUsize>,
}

impl WorkerContext {
    async fn run(self, worker: usize) {
        loop {
            if self.cancel.is_cancelled() {
                debug!(worker, "stopping on cancellation");
                break;
            }

            let index = self.cursor.fetch_add(1, Ordering::AcqRel);
            let Some(record) = self.records.get(index) else {
                break;
            };

            for &action in self.config.mode.actions() {
                let outcome = match action {
                    ArtifactAction::CacheProbe => self.probe(record).await,
                    ArtifactAction::Download => self.download(record).await,
                };
                if let Some(reason) = &outcome.error {
                    debug!(worker, path = %record.path, %action, "artifact failed: {reason}");
                }
                self.tracker.record(outcome);
            }
        }
    }

    /// Metadata-only request that makes the target cache server pull the
    /// artifact. Any 2xx/3xx answer means the fill happened or was
    /// already done.
    async fn probe(&self, record: &ArtifactRecord) -> DispatchOutcome {
        let action = ArtifactAction::CacheProbe;
        let started = Instant::now();

        let Some(target) = &self.config.target else {
            return DispatchOutcome::failed(
                &record.path,
                action,
                "no probe target configured",
                started.elapsed(),
            );
        };
        let url = match probe_url(target, &record.path) {
            Ok(url) => url,
            Err(reason) => {
                return DispatchOutcome::failed(&record.path, action, reason, started.elapsed())
            }
        };

        self.limiter.acquire().await;
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() || status.is_redirection() {
                    DispatchOutcome::success(&record.path, action, None, started.elapsed())
                } else {
                    DispatchOutcome::failed(
                        &record.path,
                        action,
                        SyncError::Status(status).to_string(),
                        started.elapsed(),
                    )
                }
            }
            Err(err) => DispatchOutcome::failed(
                &record.path,
                action,
                format!("request error: {err}"),
                started.elapsed(),
            ),
        }
    }

    async fn download(&self, record: &ArtifactRecord) -> DispatchOutcome {
        let action = ArtifactAction::Download;
        let started = Instant::now();

        let dest = match destination_path(
            &self.config.destination_root,
            &record.path,
            self.config.preserve_structure,
        ) {
            Ok(dest) => dest,
            Err(reason) => {
                return DispatchOutcome::failed(&record.path, action, reason, started.elapsed())
            }
        };

        // Resume: an existing file whose size matches the listing (or whose
        // expected size is unknown) is already complete.
        if let Ok(meta) = fs::metadata(&dest).await {
            if meta.is_file() && record.size.map_or(true, |expected| expected == meta.len()) {
                return DispatchOutcome::skipped(&record.path, action, started.elapsed());
            }
        }

        let Some(url) = record.download_url.as_deref() else {
            return DispatchOutcome::failed(
                &record.path,
                action,
                "listing provided no download URL",
                started.elapsed(),
            );
        };

        if let Some(parent) = dest.parent() {
            if let Err(err) = fs::create_dir_all(parent).await {
                return DispatchOutcome::failed(
                    &record.path,
                    action,
                    format!("create {}: {err}", parent.display()),
                    started.elapsed(),
                );
            }
        }

        let temp = temp_path(&dest);
        self.limiter.acquire().await;
        match self.fetch_to_file(url, &temp, record.size).await {
            Ok(bytes) => match fs::rename(&temp, &dest).await {
                Ok(()) => {
                    DispatchOutcome::success(&record.path, action, Some(bytes), started.elapsed())
                }
                Err(err) => {
                    let _ = fs::remove_file(&temp).await;
                    DispatchOutcome::failed(
                        &record.path,
                        action,
                        format!("finalize {}: {err}", dest.display()),
                        started.elapsed(),
                    )
                }
            },
            Err(reason) => {
                let _ = fs::remove_file(&temp).await;
                DispatchOutcome::failed(&record.path, action, reason, started.elapsed())
            }
        }
    }

    /// Stream the body into `temp` and verify the byte count. The caller
    /// renames the temp file into place only on success, so an interrupted
    /// transfer never leaves a complete-looking file at the destination.
    async fn fetch_to_file(
        &self,
        url: &str,
        temp: &Path,
        expected: Option<u64>,
    ) -> Result<u64, String> {
        let mut request = self.client.get(url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request
            .send()
            .await
            .map_err(|err| format!("request error: {err}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status).to_string());
        }

        let mut file = File::create(temp)
            .await
            .map_err(|err| format!("create {}: {err}", temp.display()))?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| format!("transfer error: {err}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|err| format!("write {}: {err}", temp.display()))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|err| format!("flush {}: {err}", temp.display()))?;
        file.sync_all()
            .await
            .map_err(|err| format!("sync {}: {err}", temp.display()))?;

        if let Some(expected) = expected {
            if written != expected {
                return Err(format!(
                    "size mismatch: got {written} bytes, expected {expected}"
                ));
            }
        }

        Ok(written)
    }
}

/// Build the probe URL `{target base}/{repository}/{artifact path}` with
/// each path segment percent-encoded.
fn probe_url(target: &TargetConfig, artifact_path: &str) -> Result<Url, String> {
    let mut url = target.base_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| format!("probe target URL {} cannot take a path", target.base_url))?;
        segments.pop_if_empty();
        segments.push(&target.repository);
        segments.extend(artifact_path.split('/').filter(|s| !s.is_empty()));
    }
    Ok(url)
}

/// Map an artifact path to its local destination. Flattened names keep the
/// whole path (separators replaced), so two distinct artifacts never share
/// a destination file.
pub(crate) fn destination_path(
    root: &Path,
    artifact_path: &str,
    preserve_structure: bool,
) -> Result<PathBuf, String> {
    if artifact_path.is_empty() {
        return Err("empty artifact path".to_string());
    }

    if preserve_structure {
        let mut dest = root.to_path_buf();
        for segment in artifact_path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(format!("unsafe artifact path: {artifact_path}"));
            }
            dest.push(segment);
        }
        Ok(dest)
    } else {
        Ok(root.join(artifact_path.replace('/', "_")))
    }
}

/// In-progress downloads go to a dot-file next to the destination and are
/// renamed into place once verified.
fn temp_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.part"))
}
