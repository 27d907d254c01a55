//! HTTP plumbing shared by the cluster and dashboard-service clients.
//!
//! Client construction, URL handling, and the mapping from HTTP failures to
//! [`Error`] variants.

use reqwest::Client;
use std::time::Duration;

use crate::config::MigrationOptions;
use crate::error::{Error, Result};

/// Header Kibana requires on every state-changing request.
pub const XSRF_HEADER: &str = "kbn-xsrf";

/// Service name used in Elasticsearch error messages.
pub const ELASTICSEARCH: &str = "Elasticsearch";

/// Service name used in Kibana error messages.
pub const KIBANA: &str = "Kibana";

/// Creates an HTTP client with the configured timeouts.
#[must_use]
pub fn create_http_client(options: &MigrationOptions) -> Client {
    build_client(options.request_timeout(), options.connect_timeout())
}

fn build_client(timeout: Duration, connect_timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(concat!("elastic-migrate/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Validates that a URL uses http or https.
pub fn validate_url(url: &str) -> Result<()> {
    let has_valid_scheme = ["http://", "https://"].iter().any(|s| url.starts_with(s));

    if !has_valid_scheme {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{}'. Allowed: http, https",
            url
        )));
    }

    if url.len() <= "https://".len() {
        return Err(Error::Config(format!("Invalid URL format: {}", url)));
    }

    Ok(())
}

/// Joins a base URL and an API path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Handles HTTP error responses and returns appropriate errors.
pub fn handle_http_error(status_code: u16, body: &str, service: &'static str) -> Error {
    match status_code {
        429 => Error::RateLimit(60),
        401 | 403 => Error::Authentication(format!("{} rejected credentials: {}", service, body)),
        _ => Error::Api {
            service,
            status: status_code,
            body: body.to_string(),
        },
    }
}

/// Maps a transport failure, keeping timeouts distinct from other failures.
pub fn request_error(err: reqwest::Error, service: &'static str) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("{} request: {}", service, err))
    } else if err.is_connect() || err.is_request() {
        Error::Connection(format!("{} request failed: {}", service, err))
    } else {
        Error::Http(err)
    }
}

/// Checks a response status and turns failures into errors.
pub async fn ensure_success(
    response: reqwest::Response,
    service: &'static str,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(handle_http_error(status.as_u16(), &body, service))
}
