//! Configuration types for elastic-migrate.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`ELASTIC_MIGRATE_<SECTION>__<KEY>`)
//! 2. Configuration file (`elastic-migrate.yaml`)
//! 3. Default values

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::validate_url;

/// Default configuration (and credential store) file name.
pub const DEFAULT_CONFIG_FILE: &str = "elastic-migrate.yaml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ELASTIC_MIGRATE_";

/// Main migration configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Deployment objects are read from.
    #[serde(default)]
    pub source: ClusterConfig,
    /// Deployment objects are written to.
    #[serde(default)]
    pub target: ClusterConfig,
    /// Local storage for downloaded objects.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Which side of a migration a deployment plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read side.
    Source,
    /// Write side.
    Target,
}

impl Role {
    /// Key of this role's section in the credential store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoints and credentials for one deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Elasticsearch URL (e.g., https://my-deployment.es.io:9243).
    #[serde(default)]
    pub es_url: String,
    /// Kibana URL. The dashboard service has its own endpoint.
    #[serde(default)]
    pub kibana_url: String,
    /// Username for Basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for Basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Previously minted, encoded API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ClusterConfig {
    /// Returns the Basic auth pair when both halves are present.
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Returns the API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Validates the Elasticsearch half of this section.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is missing or invalid, or if neither an
    /// API key nor Basic credentials are configured.
    pub fn validate_cluster(&self, role: Role) -> Result<()> {
        if self.es_url.is_empty() {
            return Err(Error::Config(format!("{role}.es_url is not set")));
        }
        validate_url(&self.es_url)?;
        if self.api_key().is_none() && self.basic_credentials().is_none() {
            return Err(Error::Config(format!(
                "{role} needs either api_key or username/password"
            )));
        }
        Ok(())
    }

    /// Validates the Kibana half of this section.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is missing or invalid, or if Basic
    /// credentials are missing.
    pub fn validate_dashboards(&self, role: Role) -> Result<()> {
        if self.kibana_url.is_empty() {
            return Err(Error::Config(format!("{role}.kibana_url is not set")));
        }
        validate_url(&self.kibana_url)?;
        if self.basic_credentials().is_none() {
            return Err(Error::Config(format!(
                "{role} needs username/password for the dashboard service"
            )));
        }
        Ok(())
    }
}

/// Local storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for downloaded objects.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// A glob over pipeline ids plus the subdirectory its matches are stored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFilter {
    /// Identifier pattern, e.g. `master*`.
    pub pattern: String,
    /// Category subdirectory under the pipelines directory.
    pub directory: String,
}

impl PipelineFilter {
    /// Creates a new filter.
    pub fn new(pattern: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            directory: directory.into(),
        }
    }

    /// The remap and master filters.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(".REMAP*", "remap_pipelines"),
            Self::new("master*", "master_pipeline"),
        ]
    }
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Pipeline filters, applied in order (later filters win on collisions).
    #[serde(default = "PipelineFilter::defaults")]
    pub pipeline_filters: Vec<PipelineFilter>,
    /// Timeout for a whole request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for establishing a connection, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Name given to minted API keys.
    #[serde(default = "default_api_key_name")]
    pub api_key_name: String,
    /// Pause after minting an API key before it is first used, in milliseconds.
    #[serde(default = "default_api_key_settle_ms")]
    pub api_key_settle_ms: u64,
    /// Saved object types to export.
    #[serde(default = "default_export_types")]
    pub export_types: Vec<String>,
    /// Export referenced objects too.
    #[serde(default = "default_true")]
    pub include_references_deep: bool,
    /// Give imported objects fresh ids instead of overwriting.
    #[serde(default = "default_true")]
    pub create_new_copies: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            pipeline_filters: PipelineFilter::defaults(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            api_key_name: default_api_key_name(),
            api_key_settle_ms: default_api_key_settle_ms(),
            export_types: default_export_types(),
            include_references_deep: true,
            create_new_copies: true,
        }
    }
}

impl MigrationOptions {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Settle delay after minting an API key.
    pub fn api_key_settle(&self) -> Duration {
        Duration::from_millis(self.api_key_settle_ms)
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./stored_objects")
}

fn default_request_timeout_secs() -> u64 {
    10_000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_api_key_name() -> String {
    "elastic-migrate".to_string()
}

fn default_api_key_settle_ms() -> u64 {
    2_000
}

fn default_export_types() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

impl MigrationConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    ///
    /// A missing file is not an error; the configuration can come entirely
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an override cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(figment.extract()?)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Returns the section for a role.
    pub fn cluster(&self, role: Role) -> &ClusterConfig {
        match role {
            Role::Source => &self.source,
            Role::Target => &self.target,
        }
    }

    /// Validates the options shared by every command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate_options(&self) -> Result<()> {
        if self.options.pipeline_filters.is_empty() {
            return Err(Error::Config(
                "at least one pipeline filter is required".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for filter in &self.options.pipeline_filters {
            if filter.pattern.trim().is_empty() {
                return Err(Error::Config("pipeline filter pattern is empty".to_string()));
            }
            if filter.directory.trim().is_empty()
                || filter.directory.contains(['/', '\\'])
                || filter.directory == ".."
            {
                return Err(Error::Config(format!(
                    "invalid directory '{}' for pipeline filter '{}'",
                    filter.directory, filter.pattern
                )));
            }
            if !seen.insert(filter.directory.as_str()) {
                return Err(Error::Config(format!(
                    "pipeline filter directory '{}' is used twice",
                    filter.directory
                )));
            }
        }
        if self.options.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.options.export_types.is_empty() {
            return Err(Error::Config("export_types cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Validates the whole configuration: options and both deployments.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.validate_options()?;
        for role in [Role::Source, Role::Target] {
            let cluster = self.cluster(role);
            cluster.validate_cluster(role)?;
            cluster.validate_dashboards(role)?;
        }
        Ok(())
    }
}

/// Template written by `elastic-migrate init`.
pub const CONFIG_TEMPLATE: &str = r#"# elastic-migrate configuration and credential store
#
# Every value can be overridden from the environment, e.g.
#   ELASTIC_MIGRATE_SOURCE__PASSWORD=...
# A freshly minted API key is written back under <role>.api_key.

source:
  es_url: https://source-deployment.es.example.com:9243
  kibana_url: https://source-deployment.kb.example.com:9243
  username: elastic
  password: changeme
  # api_key: base64-encoded-key

target:
  es_url: https://target-deployment.es.example.com:9243
  kibana_url: https://target-deployment.kb.example.com:9243
  username: elastic
  password: changeme
  # api_key: base64-encoded-key

storage:
  root: ./stored_objects

options:
  pipeline_filters:
    - pattern: ".REMAP*"
      directory: remap_pipelines
    - pattern: "master*"
      directory: master_pipeline
  request_timeout_secs: 10000
  connect_timeout_secs: 10
  api_key_name: elastic-migrate
  create_new_copies: true
"#;
