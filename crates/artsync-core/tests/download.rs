//! Download action behavior: resume, verification and partial-file safety.

mod common;

use artsync_core::ArtsyncCore;
use common::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn artifact_url(server: &MockServer, artifact_path: &str) -> String {
    format!("{}/repository/releases/{artifact_path}", server.uri())
}

async fn mount_download(server: &MockServer, artifact_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/repository/releases/{artifact_path}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn downloads_then_skips_on_rerun() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_assets(
        &server,
        listing_page(
            vec![
                asset_item(
                    "com/acme/a.jar",
                    Some(&artifact_url(&server, "com/acme/a.jar")),
                    Some(5),
                ),
                asset_item(
                    "com/acme/b.jar",
                    Some(&artifact_url(&server, "com/acme/b.jar")),
                    Some(6),
                ),
            ],
            None,
        ),
    )
    .await;
    mount_empty_components(&server).await;
    mount_download(&server, "com/acme/a.jar", b"hello").await;
    mount_download(&server, "com/acme/b.jar", b"world!").await;

    let first = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 2, true))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.succeeded, 2);
    assert_eq!(first.bytes_transferred, 11);
    assert_eq!(
        std::fs::read(dir.path().join("com/acme/a.jar")).unwrap(),
        b"hello"
    );

    // Second run over an unchanged destination: everything skips, nothing
    // is transferred.
    let second = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 2, true))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.bytes_transferred, 0);
}

#[tokio::test]
async fn wrong_sized_existing_file_is_redownloaded() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_assets(
        &server,
        listing_page(
            vec![asset_item(
                "a.jar",
                Some(&artifact_url(&server, "a.jar")),
                Some(5),
            )],
            None,
        ),
    )
    .await;
    mount_empty_components(&server).await;
    mount_download(&server, "a.jar", b"hello").await;

    std::fs::write(dir.path().join("a.jar"), b"stale bytes").unwrap();

    let summary = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 1, true))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(std::fs::read(dir.path().join("a.jar")).unwrap(), b"hello");
}

#[tokio::test]
async fn truncated_transfer_leaves_no_final_file_and_recovers() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    // The listing claims 100 bytes but the server delivers 5: the transfer
    // is treated as incomplete.
    mount_assets(
        &server,
        listing_page(
            vec![asset_item(
                "a.jar",
                Some(&artifact_url(&server, "a.jar")),
                Some(100),
            )],
            None,
        ),
    )
    .await;
    mount_empty_components(&server).await;
    mount_download(&server, "a.jar", b"hello").await;

    let first = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 1, true))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.failed, 1);
    assert!(first.failed_paths[0].reason.contains("size mismatch"));
    assert!(!dir.path().join("a.jar").exists());
    // No leftover temp file either.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // A later run against a consistent listing succeeds.
    server.reset().await;
    mount_assets(
        &server,
        listing_page(
            vec![asset_item(
                "a.jar",
                Some(&artifact_url(&server, "a.jar")),
                Some(5),
            )],
            None,
        ),
    )
    .await;
    mount_empty_components(&server).await;
    mount_download(&server, "a.jar", b"hello").await;

    let second = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 1, true))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.succeeded, 1);
    assert_eq!(std::fs::read(dir.path().join("a.jar")).unwrap(), b"hello");
}

#[tokio::test]
async fn missing_download_url_fails_only_that_artifact() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_assets(
        &server,
        listing_page(
            vec![
                asset_item("a.jar", Some(&artifact_url(&server, "a.jar")), Some(5)),
                asset_item("b.jar", None, Some(6)),
            ],
            None,
        ),
    )
    .await;
    mount_empty_components(&server).await;
    mount_download(&server, "a.jar", b"hello").await;

    let summary = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 2, true))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_paths[0].path, "b.jar");
    assert!(summary.failed_paths[0].reason.contains("download URL"));
}

#[tokio::test]
async fn flattened_layout_keeps_full_path_in_name() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_assets(
        &server,
        listing_page(
            vec![asset_item(
                "com/acme/app/1.0/app-1.0.jar",
                Some(&artifact_url(&server, "com/acme/app/1.0/app-1.0.jar")),
                Some(5),
            )],
            None,
        ),
    )
    .await;
    mount_empty_components(&server).await;
    mount_download(&server, "com/acme/app/1.0/app-1.0.jar", b"hello").await;

    let summary = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 1, false))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        std::fs::read(dir.path().join("com_acme_app_1.0_app-1.0.jar")).unwrap(),
        b"hello"
    );
}

#[tokio::test]
async fn failed_download_status_is_recorded_not_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_assets(
        &server,
        listing_page(
            vec![
                asset_item("a.jar", Some(&artifact_url(&server, "a.jar")), Some(5)),
                asset_item("gone.jar", Some(&artifact_url(&server, "gone.jar")), Some(9)),
            ],
            None,
        ),
    )
    .await;
    mount_empty_components(&server).await;
    mount_download(&server, "a.jar", b"hello").await;
    Mock::given(method("GET"))
        .and(path("/repository/releases/gone.jar"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let summary = ArtsyncCore::new(source_config(&server), download_config(dir.path(), 2, true))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_paths[0].path, "gone.jar");
    assert!(!dir.path().join("gone.jar").exists());
}
