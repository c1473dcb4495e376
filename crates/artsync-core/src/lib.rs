//! Artsync Core - Discovery and Dispatch Engine
//!
//! Walks a remote binary repository's two paginated listing APIs, merges
//! them into a deduplicated, ordered artifact catalog, then drives a
//! bounded pool of workers that either probe a cache server or download
//! each artifact, all under one shared request rate limit.

mod catalog;
mod engine;
mod error;
mod listing;
pub mod maven;

pub use catalog::{merge_records, ArtifactCatalog};
pub use engine::{CancelFlag, RateLimiter, MAX_PARALLELISM};
pub use error::SyncError;
pub use listing::PaginatedLister;

use crate::engine::{DispatchPool, ProgressTracker};
use artsync_types::{
    ArtifactRecord, RepositoryInfo, RunSummary, SourceConfig, SyncConfig, SyncEvent, SyncMode,
};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// The sync engine: configuration, HTTP client and event stream for a run.
pub struct ArtsyncCore {
    source: SourceConfig,
    config: Arc<SyncConfig>,
    client: Client,
    limiter: RateLimiter,
    event_tx: broadcast::Sender<SyncEvent>,
    cancel: CancelFlag,
}

impl ArtsyncCore {
    /// Create an engine instance, validating the configuration.
    pub fn new(source: SourceConfig, config: SyncConfig) -> Result<Self, SyncError> {
        validate_config(&config)?;

        let client = Client::builder()
            .user_agent(concat!("artsync/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .timeout(config.timeout())
            .build()
            .map_err(|err| SyncError::Configuration(format!("http client: {err}")))?;

        let limiter = RateLimiter::new(config.rate_limit);
        let (event_tx, _) = broadcast::channel(1024);

        Ok(Self {
            source,
            config: Arc::new(config),
            client,
            limiter,
            event_tx,
            cancel: CancelFlag::new(),
        })
    }

    /// Subscribe to progress events for this engine's runs.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Handle for cooperative cancellation. Once fired, workers stop
    /// claiming new artifacts; in-flight operations finish normally.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Single-shot reachability check against the status endpoint.
    ///
    /// `Ok(false)` means the server answered but rejected the credentials;
    /// an unreachable server surfaces as a network error. Servers without
    /// a status endpoint are treated as reachable.
    pub async fn check_connectivity(&self) -> Result<bool, SyncError> {
        let url = listing::api_endpoint(&self.source.base_url, &["service", "rest", "v1", "status"])?;
        let response = self.authed(self.client.get(url)).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(true);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            warn!("status endpoint rejected credentials with HTTP {status}");
            return Ok(false);
        }
        warn!("status endpoint returned HTTP {status}; continuing anyway");
        Ok(true)
    }

    /// Single-shot listing of the repositories the server exposes.
    pub async fn list_repositories(&self) -> Result<Vec<RepositoryInfo>, SyncError> {
        let url = listing::api_endpoint(
            &self.source.base_url,
            &["service", "rest", "v1", "repositories"],
        )?;
        let response = self.authed(self.client.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status));
        }
        Ok(response.json().await?)
    }

    /// Fully materialize the artifact catalog from both listing sources.
    ///
    /// Discovery is strictly sequential and completes before any dispatch
    /// starts; the merge needs to see both sources completely.
    pub async fn discover(&self) -> Result<Vec<ArtifactRecord>, SyncError> {
        let mut catalog = ArtifactCatalog::new();

        let mut assets = PaginatedLister::assets(&self.client, &self.limiter, &self.source)?;
        self.drain(&mut assets, &mut catalog).await?;

        let mut components =
            PaginatedLister::components(&self.client, &self.limiter, &self.source)?;
        self.drain(&mut components, &mut catalog).await?;

        info!("discovery complete: {} distinct artifacts", catalog.len());
        let records = catalog.into_ordered();
        let _ = self.event_tx.send(SyncEvent::DiscoveryComplete {
            total: records.len(),
        });
        Ok(records)
    }

    async fn drain(
        &self,
        lister: &mut PaginatedLister<'_>,
        catalog: &mut ArtifactCatalog,
    ) -> Result<(), SyncError> {
        let mut page = 0u32;
        while let Some(records) = lister.next_page().await? {
            page += 1;
            let entries = records.len();
            catalog.absorb_all(records);
            info!(
                source = %lister.source(),
                page,
                entries,
                total = catalog.len(),
                "listing page consumed"
            );
            let _ = self.event_tx.send(SyncEvent::DiscoveryPage {
                source: lister.source(),
                page,
                entries,
                total: catalog.len(),
            });
        }
        Ok(())
    }

    /// Execute a full run: discovery, dispatch, summary.
    ///
    /// Only discovery and configuration problems abort the run; everything
    /// that goes wrong for a single artifact lands in the summary.
    pub async fn run(&self) -> Result<RunSummary, SyncError> {
        dispatch_preflight(&self.config)?;

        let records = Arc::new(self.discover().await?);
        if records.is_empty() {
            warn!("catalog is empty; nothing to dispatch");
        }

        let actions = self.config.mode.actions().len();
        let tracker = Arc::new(ProgressTracker::new(
            records.len() * actions,
            self.event_tx.clone(),
        ));
        let pool = DispatchPool::new(
            self.client.clone(),
            self.limiter.clone(),
            Arc::clone(&self.config),
            self.source.credentials.clone(),
            Arc::clone(&tracker),
            self.cancel.clone(),
        );

        let claimed = pool.run(Arc::clone(&records)).await;
        let not_attempted = (records.len() - claimed) * actions;
        let summary = tracker.finalize(not_attempted);

        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            not_attempted = summary.not_attempted,
            bytes = summary.bytes_transferred,
            "run finished"
        );
        let _ = self.event_tx.send(SyncEvent::RunFinished {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.source.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }
}

fn validate_config(config: &SyncConfig) -> Result<(), SyncError> {
    if config.parallelism == 0 || config.parallelism > MAX_PARALLELISM {
        return Err(SyncError::Configuration(format!(
            "parallelism must be between 1 and {MAX_PARALLELISM}, got {}",
            config.parallelism
        )));
    }
    if config.timeout_secs == 0 {
        return Err(SyncError::Configuration(
            "request timeout must be at least 1 second".to_string(),
        ));
    }
    Ok(())
}

/// Mode-specific checks that must hold before a run may start.
fn dispatch_preflight(config: &SyncConfig) -> Result<(), SyncError> {
    let wants_probe = matches!(config.mode, SyncMode::CacheOnly | SyncMode::Both);
    if wants_probe && config.target.is_none() {
        return Err(SyncError::Configuration(
            "cache mode requires a probe target".to_string(),
        ));
    }

    let wants_download = matches!(config.mode, SyncMode::DownloadOnly | SyncMode::Both);
    if wants_download {
        ensure_writable(&config.destination_root)?;
    }

    Ok(())
}

fn ensure_writable(root: &Path) -> Result<(), SyncError> {
    std::fs::create_dir_all(root)
        .map_err(|err| SyncError::Configuration(format!("destination {}: {err}", root.display())))?;

    let probe = root.join(".artsync-write-check");
    std::fs::write(&probe, b"").map_err(|err| {
        SyncError::Configuration(format!(
            "destination {} is not writable: {err}",
            root.display()
        ))
    })?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}
