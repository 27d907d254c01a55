//! Error types for elastic-migrate.
//!
//! Session-level and service-level failures surface as [`Error`]. Per-object
//! failures during uploads (a malformed pipeline file, a rejected write) are
//! not errors: they become entries in the transfer reports.

use thiserror::Error;

/// Result type alias for elastic-migrate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while migrating objects between deployments.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The cluster or dashboard service could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A request did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The service asked us to slow down (retry after N seconds).
    #[error("Rate limited, retry after {0}s")]
    RateLimit(u64),

    /// The service answered with an unexpected status.
    #[error("{service} returned {status}: {body}")]
    Api {
        /// Service name ("Elasticsearch" or "Kibana").
        service: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// A service response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Response(String),

    /// A local file exists and parses but does not hold what it should.
    #[error("Malformed file {}: {reason}", .path.display())]
    MalformedFile {
        /// The offending file.
        path: std::path::PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// An interactive prompt was aborted.
    #[error("Prompt cancelled: {0}")]
    Prompt(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Layered configuration extraction error.
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// Directory traversal error.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Whether this error means the session itself is unusable.
    ///
    /// These are the errors the CLI treats as fatal before any transfer starts.
    #[must_use]
    pub fn is_fatal_session_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Authentication(_) | Self::Timeout(_)
        )
    }
}
