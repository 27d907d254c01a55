//! Saved-object export and import against a mock dashboard service.

#![allow(clippy::pedantic)]

mod common;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use elastic_migrate::dashboards::{self, ImportVerdict};
use elastic_migrate::{DashboardEndpoint, Error, ObjectKind, Role};

const EXPORT: &str = concat!(
    r#"{"id":"d1","type":"dashboard","attributes":{"title":"Ops"},"updated_at":"2024-05-01T10:00:00.000Z","references":[]}"#,
    "\n",
    r#"{"id":"v1","type":"visualization","attributes":{"title":"Latency"},"updated_at":"2024-04-01T10:00:00.000Z","references":[]}"#,
    "\n",
    "{not json\n",
    "\n",
    r#"{"exportedCount":2,"missingRefCount":0,"missingReferences":[]}"#,
    "\n",
);

fn endpoint(kibana: &MockServer, dir: &TempDir) -> DashboardEndpoint {
    let cluster = common::cluster("http://localhost:9200", &kibana.uri(), Some("k"));
    let config = common::config(cluster.clone(), cluster, dir.path());
    DashboardEndpoint::from_config(&config, Role::Target).unwrap()
}

fn write_export(dir: &std::path::Path, name: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), EXPORT).unwrap();
}

#[tokio::test]
async fn test_download_stores_raw_export_and_parses_objects() {
    let kibana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saved_objects/_export"))
        .and(header("kbn-xsrf", "true"))
        .and(header("authorization", common::BASIC_AUTH))
        .and(body_partial_json(json!({"type": "*", "includeReferencesDeep": true})))
        .respond_with(ResponseTemplate::new(200).set_body_string(EXPORT))
        .expect(1)
        .mount(&kibana)
        .await;

    let dir = TempDir::new().unwrap();
    let endpoint = endpoint(&kibana, &dir);
    let dashboards_dir = dir.path().join("dashboards");

    let objects = dashboards::download(&endpoint, &dashboards_dir).await.unwrap();

    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].kind, ObjectKind::Dashboard);
    assert_eq!(objects[1].title(), Some("Latency"));
    assert_eq!(
        std::fs::read_to_string(dashboards_dir.join("dashboards.ndjson")).unwrap(),
        EXPORT
    );

    let catalog = dashboards::classify(&objects);
    assert_eq!(catalog.dashboards.len(), 1);
    assert_eq!(catalog.visualizations.len(), 1);
    assert!(catalog.index_patterns.is_empty());
}

#[tokio::test]
async fn test_download_failure_writes_nothing() {
    let kibana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saved_objects/_export"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&kibana)
        .await;

    let dir = TempDir::new().unwrap();
    let endpoint = endpoint(&kibana, &dir);
    let dashboards_dir = dir.path().join("dashboards");

    let result = dashboards::download(&endpoint, &dashboards_dir).await;

    assert!(matches!(result, Err(Error::Api { status: 500, .. })));
    assert!(!dashboards_dir.join("dashboards.ndjson").exists());
}

#[tokio::test]
async fn test_upload_posts_multipart_file() {
    let kibana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saved_objects/_import"))
        .and(query_param("createNewCopies", "true"))
        .and(header("kbn-xsrf", "true"))
        .and(header("authorization", common::BASIC_AUTH))
        .and(body_string_contains("filename=\"dashboards.ndjson\""))
        .and(body_string_contains("application/ndjson"))
        .and(body_string_contains("\"id\":\"d1\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "successCount": 2, "errors": []})),
        )
        .expect(1)
        .mount(&kibana)
        .await;

    let dir = TempDir::new().unwrap();
    let endpoint = endpoint(&kibana, &dir);
    let dashboards_dir = dir.path().join("dashboards");
    write_export(&dashboards_dir, "dashboards.ndjson");

    let report = dashboards::upload(&endpoint, &dashboards_dir).await.unwrap();

    assert_eq!(report.len(), 1);
    let outcome = report.get("dashboards/dashboards.ndjson").unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.success_count, 2);
    assert_eq!(report.verdict(), ImportVerdict::FullSuccess);
}

#[tokio::test]
async fn test_upload_partial_import() {
    let kibana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saved_objects/_import"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "successCount": 1,
            "errors": [{"id": "v1", "type": "visualization", "error": {"type": "conflict"}}]
        })))
        .mount(&kibana)
        .await;

    let dir = TempDir::new().unwrap();
    let endpoint = endpoint(&kibana, &dir);
    let dashboards_dir = dir.path().join("dashboards");
    write_export(&dashboards_dir, "dashboards.ndjson");

    let report = dashboards::upload(&endpoint, &dashboards_dir).await.unwrap();

    assert_eq!(report.verdict(), ImportVerdict::Partial);
    assert_eq!(report.total_success_count(), 1);
    assert_eq!(
        report.get("dashboards/dashboards.ndjson").unwrap().errors.len(),
        1
    );
}

#[tokio::test]
async fn test_upload_skips_unreadable_response() {
    let kibana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saved_objects/_import"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .expect(2)
        .mount(&kibana)
        .await;

    let dir = TempDir::new().unwrap();
    let endpoint = endpoint(&kibana, &dir);
    let dashboards_dir = dir.path().join("dashboards");
    write_export(&dashboards_dir, "a.ndjson");
    write_export(&dashboards_dir.join("older"), "b.ndjson");

    let report = dashboards::upload(&endpoint, &dashboards_dir).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.verdict(), ImportVerdict::Empty);
}

#[tokio::test]
async fn test_upload_rejected_credentials_abort() {
    let kibana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/saved_objects/_import"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"statusCode": 401, "error": "Unauthorized"})),
        )
        .mount(&kibana)
        .await;

    let dir = TempDir::new().unwrap();
    let endpoint = endpoint(&kibana, &dir);
    let dashboards_dir = dir.path().join("dashboards");
    write_export(&dashboards_dir, "dashboards.ndjson");

    let err = dashboards::upload(&endpoint, &dashboards_dir)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn test_upload_without_files_sends_nothing() {
    let kibana = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&kibana)
        .await;

    let dir = TempDir::new().unwrap();
    let endpoint = endpoint(&kibana, &dir);

    let report = dashboards::upload(&endpoint, &dir.path().join("dashboards"))
        .await
        .unwrap();

    assert_eq!(report.verdict(), ImportVerdict::Empty);
}
