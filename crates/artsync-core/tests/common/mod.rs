//! Shared fixtures for the integration tests: mock listing endpoints and
//! ready-made configurations.

#![allow(dead_code)]

use artsync_types::{SourceConfig, SyncConfig, SyncMode, TargetConfig};
use serde_json::{json, Value};
use std::path::Path;
use url::Url;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn asset_item(artifact_path: &str, download_url: Option<&str>, size: Option<u64>) -> Value {
    let mut item = json!({ "path": artifact_path });
    if let Some(url) = download_url {
        item["downloadUrl"] = json!(url);
    }
    if let Some(size) = size {
        item["fileSize"] = json!(size);
    }
    item
}

pub fn component_item(assets: Vec<Value>) -> Value {
    json!({ "assets": assets })
}

pub fn listing_page(items: Vec<Value>, token: Option<&str>) -> Value {
    json!({ "items": items, "continuationToken": token })
}

/// Mount the first assets page (no continuation token on the request).
pub async fn mount_assets(server: &MockServer, page: Value) {
    Mock::given(method("GET"))
        .and(path("/service/rest/v1/assets"))
        .and(query_param_is_missing("continuationToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .mount(server)
        .await;
}

/// Mount a follow-up assets page keyed by its continuation token.
pub async fn mount_assets_page(server: &MockServer, token: &str, page: Value) {
    Mock::given(method("GET"))
        .and(path("/service/rest/v1/assets"))
        .and(query_param("continuationToken", token))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .mount(server)
        .await;
}

pub async fn mount_components(server: &MockServer, page: Value) {
    Mock::given(method("GET"))
        .and(path("/service/rest/v1/components"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .mount(server)
        .await;
}

pub async fn mount_empty_components(server: &MockServer) {
    mount_components(server, listing_page(vec![], None)).await;
}

/// Catalog of bare paths served from the assets API only.
pub async fn mount_flat_catalog(server: &MockServer, paths: &[&str]) {
    let items = paths.iter().map(|p| asset_item(p, None, None)).collect();
    mount_assets(server, listing_page(items, None)).await;
    mount_empty_components(server).await;
}

pub fn source_config(server: &MockServer) -> SourceConfig {
    SourceConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        repository: "releases".to_string(),
        credentials: None,
    }
}

/// Cache-probe configuration pointing back at the mock server under `/cache`.
pub fn cache_config(server: &MockServer, parallelism: usize, rate_limit: u32) -> SyncConfig {
    SyncConfig {
        rate_limit,
        parallelism,
        timeout_secs: 10,
        preserve_structure: true,
        destination_root: std::env::temp_dir(),
        mode: SyncMode::CacheOnly,
        target: Some(TargetConfig {
            base_url: Url::parse(&format!("{}/cache", server.uri())).unwrap(),
            repository: "mirror".to_string(),
        }),
    }
}

pub fn download_config(dest: &Path, parallelism: usize, preserve_structure: bool) -> SyncConfig {
    SyncConfig {
        rate_limit: 0,
        parallelism,
        timeout_secs: 10,
        preserve_structure,
        destination_root: dest.to_path_buf(),
        mode: SyncMode::DownloadOnly,
        target: None,
    }
}
