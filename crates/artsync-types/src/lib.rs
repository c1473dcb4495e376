//! Shared types for Artsync
//!
//! This crate contains the data structures used across the CLI and the
//! core sync engine: artifact records, dispatch outcomes, run summaries,
//! configuration and progress events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

// ============================================================================
// Artifact Types
// ============================================================================

/// Which listing API reported an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceApi {
    Assets,
    Components,
}

impl fmt::Display for SourceApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceApi::Assets => write!(f, "assets"),
            SourceApi::Components => write!(f, "components"),
        }
    }
}

/// An algorithm-tagged checksum as reported by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: String,
    pub value: String,
}

impl Checksum {
    pub fn new(algorithm: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            value: value.into(),
        }
    }
}

/// A single artifact discovered in the remote repository.
///
/// Records are keyed by `path` (repository-relative, forward-slash
/// separated). Once merged into the catalog a record is immutable; the
/// dispatch workers only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Repository-relative location, e.g. `com/acme/app/1.0/app-1.0.jar`.
    pub path: String,
    /// Absolute URL for direct byte retrieval, when the listing API
    /// supplies one.
    pub download_url: Option<String>,
    /// Expected size in bytes, used for resume and verification.
    pub size: Option<u64>,
    /// Opportunistic integrity information, not required.
    pub checksum: Option<Checksum>,
    /// Provenance, used for merge tie-breaking.
    pub source: SourceApi,
}

impl ArtifactRecord {
    pub fn new(path: impl Into<String>, source: SourceApi) -> Self {
        Self {
            path: path.into(),
            download_url: None,
            size: None,
            checksum: None,
            source,
        }
    }
}

// ============================================================================
// Dispatch Types
// ============================================================================

/// The side-effecting operation applied to an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactAction {
    /// Metadata-only HEAD request that makes a proxying cache server
    /// fetch and store the artifact.
    CacheProbe,
    /// Full byte download to local storage.
    Download,
}

impl fmt::Display for ArtifactAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactAction::CacheProbe => write!(f, "cache-probe"),
            ArtifactAction::Download => write!(f, "download"),
        }
    }
}

/// Terminal state of one (artifact, action) attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    Failed,
}

/// Result of applying one action to one artifact. Created once, never
/// mutated, only aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub path: String,
    pub action: ArtifactAction,
    pub status: OutcomeStatus,
    pub bytes_transferred: Option<u64>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl DispatchOutcome {
    pub fn success(
        path: impl Into<String>,
        action: ArtifactAction,
        bytes_transferred: Option<u64>,
        duration: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            action,
            status: OutcomeStatus::Success,
            bytes_transferred,
            error: None,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn skipped(path: impl Into<String>, action: ArtifactAction, duration: Duration) -> Self {
        Self {
            path: path.into(),
            action,
            status: OutcomeStatus::Skipped,
            bytes_transferred: None,
            error: None,
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn failed(
        path: impl Into<String>,
        action: ArtifactAction,
        reason: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            path: path.into(),
            action,
            status: OutcomeStatus::Failed,
            bytes_transferred: None,
            error: Some(reason.into()),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// A failed artifact path together with the reason, for operator follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPath {
    pub path: String,
    pub reason: String,
}

/// Final, immutable result of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Planned outcomes: artifacts in the catalog times actions per artifact.
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Outcomes never attempted because the run was cancelled.
    pub not_attempted: usize,
    pub bytes_transferred: u64,
    pub elapsed_ms: u64,
    pub failed_paths: Vec<FailedPath>,
}

impl RunSummary {
    /// Whether every attempted outcome completed without failure.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Credentials for the source repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where artifacts are discovered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the repository manager, e.g. `http://nexus:8081`.
    pub base_url: Url,
    /// Repository name within the manager.
    pub repository: String,
    pub credentials: Option<Credentials>,
}

/// The cache server probed in cache-fill mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub base_url: Url,
    pub repository: String,
}

/// Which action(s) the dispatch pool applies to each artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    CacheOnly,
    DownloadOnly,
    Both,
}

impl SyncMode {
    /// Actions applied per artifact, in order.
    pub fn actions(&self) -> &'static [ArtifactAction] {
        match self {
            SyncMode::CacheOnly => &[ArtifactAction::CacheProbe],
            SyncMode::DownloadOnly => &[ArtifactAction::Download],
            SyncMode::Both => &[ArtifactAction::CacheProbe, ArtifactAction::Download],
        }
    }
}

/// Run configuration for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Outbound requests per second across all workers. 0 means unlimited.
    pub rate_limit: u32,
    /// Number of concurrent dispatch workers (1..=20).
    pub parallelism: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Mirror the repository path hierarchy under the destination root,
    /// or flatten everything into a single directory.
    pub preserve_structure: bool,
    pub destination_root: PathBuf,
    pub mode: SyncMode,
    /// Required for `CacheOnly` and `Both`.
    pub target: Option<TargetConfig>,
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Event Types
// ============================================================================

/// Progress events broadcast by the engine while a run is in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SyncEvent {
    DiscoveryPage {
        source: SourceApi,
        page: u32,
        entries: usize,
        /// Distinct paths in the catalog so far.
        total: usize,
    },
    DiscoveryComplete {
        total: usize,
    },
    ArtifactFinished {
        outcome: DispatchOutcome,
    },
    Progress {
        processed: usize,
        total: usize,
        succeeded: usize,
        skipped: usize,
        failed: usize,
        bytes_transferred: u64,
        per_second: f64,
    },
    RunFinished {
        summary: RunSummary,
    },
}

// ============================================================================
// Repository & Maven Types
// ============================================================================

/// One entry from the repository-manager listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub format: String,
    #[serde(rename = "type")]
    pub repo_type: String,
    pub url: Option<String>,
}

/// A Maven `groupId:artifactId:version` coordinate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gav {
    #[serde(rename = "groupId")]
    pub group: String,
    #[serde(rename = "artifactId")]
    pub artifact: String,
    pub version: String,
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}
