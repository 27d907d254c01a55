//! Pipeline download and upload against mock clusters.

#![allow(clippy::pedantic)]

mod common;

use serde_json::{json, Value};
use std::collections::BTreeSet;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use elastic_migrate::config::PipelineFilter;
use elastic_migrate::{pipelines, CredentialStore, Role, Session};

async fn session(server: &MockServer, dir: &TempDir) -> Session {
    common::mount_ping(server).await;
    let cluster = common::cluster(&server.uri(), "http://localhost:5601", Some("test-key"));
    let config = common::config(cluster.clone(), cluster, dir.path());
    let store = CredentialStore::open(dir.path().join("creds.yaml"));
    Session::connect(&config, Role::Source, &store).await.unwrap()
}

async fn mount_pattern(server: &MockServer, pattern: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/_ingest/pipeline/{pattern}")))
        .and(header("authorization", "ApiKey test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_acknowledging_put(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path_regex(r"^/_ingest/pipeline/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .mount(server)
        .await;
}

fn processors(destination: &str) -> Value {
    json!({
        "description": "test",
        "processors": [{"reroute": {"destination": destination}}]
    })
}

#[tokio::test]
async fn test_download_writes_one_file_per_pipeline() {
    let server = MockServer::start().await;
    mount_pattern(
        &server,
        ".REMAP*",
        json!({".REMAP-logs": processors("logs"), ".REMAP-metrics": processors("metrics")}),
    )
    .await;
    mount_pattern(&server, "master*", json!({"master": processors("master-out")})).await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let pipelines_dir = dir.path().join("pipelines");

    let downloaded = pipelines::download(&session, &PipelineFilter::defaults(), &pipelines_dir)
        .await
        .unwrap();

    assert_eq!(downloaded.len(), 3);
    assert!(pipelines_dir.join("remap_pipelines/.REMAP-logs.json").is_file());
    assert!(pipelines_dir.join("remap_pipelines/.REMAP-metrics.json").is_file());
    assert!(pipelines_dir.join("master_pipeline/master.json").is_file());

    let stored: Value = serde_json::from_str(
        &std::fs::read_to_string(pipelines_dir.join("master_pipeline/master.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(stored, json!({"master": processors("master-out")}));
}

#[tokio::test]
async fn test_download_missing_pattern_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_ingest/pipeline/.REMAP*"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&server)
        .await;
    mount_pattern(&server, "master*", json!({"master": processors("x")})).await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let pipelines_dir = dir.path().join("pipelines");

    let downloaded = pipelines::download(&session, &PipelineFilter::defaults(), &pipelines_dir)
        .await
        .unwrap();

    assert_eq!(downloaded.keys().collect::<Vec<_>>(), vec!["master"]);
    assert!(pipelines_dir.join("remap_pipelines").is_dir());
}

#[tokio::test]
async fn test_download_last_filter_wins() {
    let server = MockServer::start().await;
    mount_pattern(&server, "a*", json!({"shared": processors("first")})).await;
    mount_pattern(&server, "s*", json!({"shared": processors("second")})).await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let filters = vec![
        PipelineFilter::new("a*", "first"),
        PipelineFilter::new("s*", "second"),
    ];

    let downloaded = pipelines::download(&session, &filters, &dir.path().join("pipelines"))
        .await
        .unwrap();

    assert_eq!(downloaded.len(), 1);
    assert_eq!(downloaded["shared"], processors("second"));
}

#[tokio::test]
async fn test_download_server_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_ingest/pipeline/.REMAP*"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;

    let result =
        pipelines::download(&session, &PipelineFilter::defaults(), &dir.path().join("p")).await;

    assert!(matches!(
        result,
        Err(elastic_migrate::Error::Api { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_upload_acknowledged_pipeline() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/_ingest/pipeline/p1"))
        .and(header("authorization", "ApiKey test-key"))
        .and(body_json(processors("out")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let pipelines_dir = dir.path().join("pipelines");
    std::fs::create_dir_all(&pipelines_dir).unwrap();
    std::fs::write(
        pipelines_dir.join("p1.json"),
        json!({"p1": processors("out")}).to_string(),
    )
    .unwrap();

    let report = pipelines::upload(&session, &pipelines_dir).await.unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.get("p1"), Some(true));
}

#[tokio::test]
async fn test_upload_empty_mapping_is_recorded_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let pipelines_dir = dir.path().join("pipelines");
    std::fs::create_dir_all(&pipelines_dir).unwrap();
    std::fs::write(pipelines_dir.join("empty.json"), "{}").unwrap();

    let report = pipelines::upload(&session, &pipelines_dir).await.unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.get("{}"), Some(false));
}

#[tokio::test]
async fn test_upload_records_every_file() {
    let server = MockServer::start().await;
    mount_acknowledging_put(&server).await;
    Mock::given(method("PUT"))
        .and(path("/_ingest/pipeline/rejected"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "bad processor"})))
        .with_priority(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let pipelines_dir = dir.path().join("pipelines");
    std::fs::create_dir_all(pipelines_dir.join("nested")).unwrap();
    std::fs::write(pipelines_dir.join("good.json"), json!({"good": processors("a")}).to_string())
        .unwrap();
    std::fs::write(
        pipelines_dir.join("nested/rejected.json"),
        json!({"rejected": processors("b")}).to_string(),
    )
    .unwrap();
    std::fs::write(pipelines_dir.join("scalar.json"), json!({"scalar": 42}).to_string()).unwrap();
    let broken = pipelines_dir.join("broken.json");
    std::fs::write(&broken, "{\"oops\": ").unwrap();
    std::fs::write(pipelines_dir.join("README.md"), "ignored").unwrap();

    let report = pipelines::upload(&session, &pipelines_dir).await.unwrap();

    assert_eq!(report.len(), 4);
    assert_eq!(report.get("good"), Some(true));
    assert_eq!(report.get("rejected"), Some(false));
    assert_eq!(report.get("scalar"), Some(false));
    assert_eq!(report.get(&broken.display().to_string()), Some(false));
    assert_eq!(report.succeeded(), 1);
}

#[tokio::test]
async fn test_upload_escapes_reserved_characters_in_ids() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/_ingest/pipeline/logs%3Fv2"))
        .and(body_json(processors("logs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/_ingest/pipeline/team%23a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/_ingest/pipeline/(logs|team)$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let pipelines_dir = dir.path().join("pipelines");
    std::fs::create_dir_all(&pipelines_dir).unwrap();
    std::fs::write(
        pipelines_dir.join("logs.json"),
        json!({"logs?v2": processors("logs")}).to_string(),
    )
    .unwrap();
    std::fs::write(
        pipelines_dir.join("team.json"),
        json!({"team#a": processors("team")}).to_string(),
    )
    .unwrap();

    let report = pipelines::upload(&session, &pipelines_dir).await.unwrap();

    assert_eq!(report.get("logs?v2"), Some(true));
    assert_eq!(report.get("team#a"), Some(true));
    let puts: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .collect();
    assert_eq!(puts.len(), 2);
    assert!(puts.iter().all(|r| r.url.query().is_none()));
}

#[tokio::test]
async fn test_download_escapes_reserved_characters_in_patterns() {
    let server = MockServer::start().await;
    mount_pattern(&server, "logs%3F*", json!({"logs?v2": processors("logs")})).await;

    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;
    let filters = vec![PipelineFilter::new("logs?*", "logs")];
    let pipelines_dir = dir.path().join("pipelines");

    let downloaded = pipelines::download(&session, &filters, &pipelines_dir)
        .await
        .unwrap();

    assert_eq!(downloaded.keys().collect::<Vec<_>>(), vec!["logs?v2"]);
    assert!(pipelines_dir.join("logs/logs?v2.json").is_file());
}

#[tokio::test]
async fn test_upload_missing_directory_is_empty() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let session = session(&server, &dir).await;

    let report = pipelines::upload(&session, &dir.path().join("absent"))
        .await
        .unwrap();

    assert!(report.is_empty());
}

#[tokio::test]
async fn test_round_trip_reproduces_identifiers() {
    let source = MockServer::start().await;
    mount_pattern(
        &source,
        ".REMAP*",
        json!({".REMAP-a": processors("a"), ".REMAP-b": processors("b")}),
    )
    .await;
    mount_pattern(&source, "master*", json!({"master": processors("m")})).await;

    let target = MockServer::start().await;
    mount_acknowledging_put(&target).await;

    let dir = TempDir::new().unwrap();
    let source_session = session(&source, &dir).await;
    let target_session = session(&target, &dir).await;
    let pipelines_dir = dir.path().join("pipelines");

    let downloaded =
        pipelines::download(&source_session, &PipelineFilter::defaults(), &pipelines_dir)
            .await
            .unwrap();
    let report = pipelines::upload(&target_session, &pipelines_dir)
        .await
        .unwrap();

    let downloaded_ids: BTreeSet<String> = downloaded.keys().cloned().collect();
    let uploaded_ids: BTreeSet<String> = report.iter().map(|(k, _)| k.to_string()).collect();
    assert_eq!(downloaded_ids, uploaded_ids);
    assert_eq!(report.len(), 3);
    assert!(report.all_succeeded());

    let written: BTreeSet<String> = target
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| {
            r.url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(written, downloaded_ids);
}
