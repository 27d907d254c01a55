//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use serde_json::json;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use elastic_migrate::{ClusterConfig, MigrationConfig};

/// `Authorization` value for `elastic:secret`.
pub const BASIC_AUTH: &str = "Basic ZWxhc3RpYzpzZWNyZXQ=";

/// A deployment section pointing at mock servers.
pub fn cluster(es_url: &str, kibana_url: &str, api_key: Option<&str>) -> ClusterConfig {
    ClusterConfig {
        es_url: es_url.to_string(),
        kibana_url: kibana_url.to_string(),
        username: Some("elastic".to_string()),
        password: Some("secret".to_string()),
        api_key: api_key.map(String::from),
    }
}

/// A configuration with no settle delay and storage under `root`.
pub fn config(source: ClusterConfig, target: ClusterConfig, root: &Path) -> MigrationConfig {
    let mut config = MigrationConfig::default();
    config.source = source;
    config.target = target;
    config.storage.root = root.to_path_buf();
    config.options.api_key_settle_ms = 0;
    config.options.request_timeout_secs = 30;
    config
}

/// Answers `GET /` like a healthy cluster.
pub async fn mount_ping(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "node-1",
            "cluster_name": "test-cluster",
            "version": {"number": "8.13.2"}
        })))
        .mount(server)
        .await;
}
