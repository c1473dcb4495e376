//! Paginated walkers for the repository listing APIs
//!
//! The repository manager exposes two independent listing endpoints: the
//! assets API (flat entries with download URL, size and checksums) and the
//! components API (entries nested under their owning component). Both are
//! paginated with an opaque continuation token and normalize into
//! [`ArtifactRecord`]s here.
//!
//! A lister is lazy, finite and non-restartable: each `next_page` call is
//! one rate-limited network round trip. Page fetches retry a fixed number
//! of times and then abort the whole run, because the downstream merge
//! assumes it has seen both sources completely.

use crate::engine::RateLimiter;
use crate::error::SyncError;
use artsync_types::{ArtifactRecord, Checksum, SourceApi, SourceConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Attempts per page before discovery is declared failed.
const PAGE_ATTEMPTS: u32 = 3;
/// Fixed delay between page retry attempts.
const PAGE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Join REST path segments onto a base URL, keeping any base path prefix.
pub(crate) fn api_endpoint(base: &Url, segments: &[&str]) -> Result<Url, SyncError> {
    let mut url = base.clone();
    {
        let mut parts = url
            .path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(base.to_string()))?;
        parts.pop_if_empty();
        parts.extend(segments);
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct ListingPage<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(rename = "continuationToken")]
    continuation_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetEntry {
    #[serde(default)]
    path: String,
    #[serde(rename = "downloadUrl")]
    download_url: Option<String>,
    #[serde(rename = "fileSize")]
    file_size: Option<u64>,
    checksum: Option<ChecksumEntry>,
}

impl AssetEntry {
    fn into_record(self, source: SourceApi) -> Option<ArtifactRecord> {
        if self.path.is_empty() {
            return None;
        }
        Some(ArtifactRecord {
            path: self.path,
            download_url: self.download_url,
            size: self.file_size,
            checksum: self.checksum.and_then(ChecksumEntry::strongest),
            source,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct ChecksumEntry {
    sha256: Option<String>,
    sha1: Option<String>,
    md5: Option<String>,
}

impl ChecksumEntry {
    fn strongest(self) -> Option<Checksum> {
        if let Some(value) = self.sha256 {
            return Some(Checksum::new("sha256", value));
        }
        if let Some(value) = self.sha1 {
            return Some(Checksum::new("sha1", value));
        }
        self.md5.map(|value| Checksum::new("md5", value))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ComponentEntry {
    #[serde(default)]
    assets: Vec<AssetEntry>,
}

/// Continuation-token page walker over one listing source.
pub struct PaginatedLister<'a> {
    client: &'a Client,
    limiter: &'a RateLimiter,
    source_config: &'a SourceConfig,
    endpoint: Url,
    source: SourceApi,
    token: Option<String>,
    seen_tokens: HashSet<String>,
    exhausted: bool,
    page: u32,
}

impl<'a> PaginatedLister<'a> {
    /// Lister over the assets API.
    pub fn assets(
        client: &'a Client,
        limiter: &'a RateLimiter,
        source_config: &'a SourceConfig,
    ) -> Result<Self, SyncError> {
        let endpoint = api_endpoint(&source_config.base_url, &["service", "rest", "v1", "assets"])?;
        Ok(Self::new(client, limiter, source_config, endpoint, SourceApi::Assets))
    }

    /// Lister over the components API.
    pub fn components(
        client: &'a Client,
        limiter: &'a RateLimiter,
        source_config: &'a SourceConfig,
    ) -> Result<Self, SyncError> {
        let endpoint =
            api_endpoint(&source_config.base_url, &["service", "rest", "v1", "components"])?;
        Ok(Self::new(client, limiter, source_config, endpoint, SourceApi::Components))
    }

    fn new(
        client: &'a Client,
        limiter: &'a RateLimiter,
        source_config: &'a SourceConfig,
        endpoint: Url,
        source: SourceApi,
    ) -> Self {
        Self {
            client,
            limiter,
            source_config,
            endpoint,
            source,
            token: None,
            seen_tokens: HashSet::new(),
            exhausted: false,
            page: 0,
        }
    }

    pub fn source(&self) -> SourceApi {
        self.source
    }

    /// Fetch the next page of records, or `None` once the listing is
    /// exhausted. Fatal once the per-page retries are used up.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ArtifactRecord>>, SyncError> {
        if self.exhausted {
            return Ok(None);
        }
        self.page += 1;

        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("repository", &self.source_config.repository);
            if let Some(token) = &self.token {
                query.append_pair("continuationToken", token);
            }
        }

        let body = self.fetch_page(&url).await?;
        let (records, next_token) = self.parse(&body)?;

        debug!(
            source = %self.source,
            page = self.page,
            entries = records.len(),
            "fetched listing page"
        );

        match next_token {
            Some(token) => {
                if records.is_empty() {
                    warn!(
                        source = %self.source,
                        "continuation token on an empty page; treating listing as exhausted"
                    );
                    self.exhausted = true;
                } else if !self.seen_tokens.insert(token.clone()) {
                    warn!(
                        source = %self.source,
                        token,
                        "server repeated a continuation token; treating listing as exhausted"
                    );
                    self.exhausted = true;
                } else {
                    self.token = Some(token);
                }
            }
            None => self.exhausted = true,
        }

        Ok(Some(records))
    }

    async fn fetch_page(&self, url: &Url) -> Result<String, SyncError> {
        let mut last_error = String::new();
        for attempt in 1..=PAGE_ATTEMPTS {
            self.limiter.acquire().await;
            match self.request(url).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    warn!(
                        source = %self.source,
                        page = self.page,
                        attempt,
                        "page fetch failed: {err}"
                    );
                    last_error = err.to_string();
                    if attempt < PAGE_ATTEMPTS {
                        tokio::time::sleep(PAGE_RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(SyncError::DiscoveryFailed(format!(
            "{} listing page {} failed after {} attempts: {}",
            self.source, self.page, PAGE_ATTEMPTS, last_error
        )))
    }

    async fn request(&self, url: &Url) -> Result<String, SyncError> {
        let mut request = self.client.get(url.clone());
        if let Some(creds) = &self.source_config.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status));
        }
        Ok(response.text().await?)
    }

    /// Malformed pages are fatal, not retried.
    fn parse(&self, body: &str) -> Result<(Vec<ArtifactRecord>, Option<String>), SyncError> {
        match self.source {
            SourceApi::Assets => {
                let page: ListingPage<AssetEntry> = self.decode(body)?;
                let records = page
                    .items
                    .into_iter()
                    .filter_map(|entry| entry.into_record(SourceApi::Assets))
                    .collect();
                Ok((records, page.continuation_token))
            }
            SourceApi::Components => {
                let page: ListingPage<ComponentEntry> = self.decode(body)?;
                let records = page
                    .items
                    .into_iter()
                    .flat_map(|component| component.assets)
                    .filter_map(|entry| entry.into_record(SourceApi::Components))
                    .collect();
                Ok((records, page.continuation_token))
            }
        }
    }

    fn decode<T: DeserializeOwned>(&self, body: &str) -> Result<T, SyncError> {
        serde_json::from_str(body).map_err(|err| {
            SyncError::DiscoveryFailed(format!(
                "malformed {} listing page {}: {err}",
                self.source, self.page
            ))
        })
    }
}
