//! Error types for the Artsync core

use thiserror::Error;

/// Errors surfaced by the sync engine.
///
/// Only `DiscoveryFailed` and `Configuration` abort a run; everything that
/// goes wrong for a single artifact during dispatch is captured in its
/// [`DispatchOutcome`](artsync_types::DispatchOutcome) instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}
