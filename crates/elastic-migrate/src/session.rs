//! Authenticated handles on the two services of a deployment.
//!
//! [`Session`] talks to Elasticsearch with an API key, minting and caching
//! one on first use. [`DashboardEndpoint`] talks to Kibana with Basic auth.

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::{MigrationConfig, Role};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::http::{
    create_http_client, ensure_success, join_url, request_error, ELASTICSEARCH, XSRF_HEADER,
};

/// Body of `POST /_security/api_key`.
#[derive(Debug, Serialize)]
struct CreateApiKeyRequest<'a> {
    name: &'a str,
}

/// Response of `POST /_security/api_key`.
#[derive(Debug, Deserialize)]
struct CreateApiKeyResponse {
    #[allow(dead_code)]
    id: Option<String>,
    encoded: Option<String>,
}

/// Cluster identity returned by `GET /`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterInfo {
    /// Node name.
    #[serde(default)]
    pub name: String,
    /// Cluster name.
    #[serde(default)]
    pub cluster_name: String,
    /// Version block.
    #[serde(default)]
    pub version: ClusterVersion,
}

/// Version block of [`ClusterInfo`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterVersion {
    /// Version number, e.g. `8.13.2`.
    #[serde(default)]
    pub number: String,
}

/// What to show the user once a session is up.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Role of the deployment.
    pub role: Role,
    /// Elasticsearch URL.
    pub es_url: String,
    /// Kibana URL.
    pub kibana_url: String,
    /// Username used for Basic auth, if any.
    pub username: Option<String>,
    /// The API key in use.
    pub api_key: String,
    /// Whether the key was minted during this run.
    pub minted: bool,
    /// Cluster identity.
    pub cluster: ClusterInfo,
}

/// A connected Elasticsearch session.
pub struct Session {
    role: Role,
    url: String,
    api_key: String,
    client: Client,
    info: ConnectionInfo,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connects to the Elasticsearch deployment for `role`.
    ///
    /// Reuses the configured API key when there is one. Otherwise mints a key
    /// with Basic auth and persists it to `store`. Either way the cluster is
    /// pinged before the session is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the cluster cannot be reached,
    /// [`Error::Authentication`] if credentials are rejected, and
    /// [`Error::Config`] if the role's section is incomplete.
    pub async fn connect(
        config: &MigrationConfig,
        role: Role,
        store: &CredentialStore,
    ) -> Result<Self> {
        let cluster = config.cluster(role);
        cluster.validate_cluster(role)?;

        let client = create_http_client(&config.options);
        let url = cluster.es_url.trim_end_matches('/').to_string();

        let (api_key, minted) = match cluster.api_key() {
            Some(key) => {
                info!("API key already exists for {}, using existing key", role);
                (key.to_string(), false)
            }
            None => {
                let (user, pass) = cluster.basic_credentials().ok_or_else(|| {
                    Error::Config(format!("{role} needs username/password to mint an API key"))
                })?;
                let key =
                    mint_api_key(&client, &url, user, pass, &config.options.api_key_name).await?;
                store.save_api_key(role, &key)?;

                let settle = config.options.api_key_settle();
                if !settle.is_zero() {
                    debug!("Waiting {:?} for the new API key to propagate", settle);
                    tokio::time::sleep(settle).await;
                }
                (key, true)
            }
        };

        let mut session = Self {
            role,
            url,
            api_key,
            client,
            info: ConnectionInfo {
                role,
                es_url: cluster.es_url.clone(),
                kibana_url: cluster.kibana_url.clone(),
                username: cluster.username.clone(),
                api_key: String::new(),
                minted,
                cluster: ClusterInfo::default(),
            },
        };

        let cluster_info = session.ping().await?;
        info!(
            "Connected to Elasticsearch {} ({}, {})",
            session.url, role, cluster_info.version.number
        );
        session.info.api_key = session.api_key.clone();
        session.info.cluster = cluster_info;

        Ok(session)
    }

    /// Checks the cluster answers with this session's key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] (or [`Error::Timeout`]) on any failure.
    pub async fn ping(&self) -> Result<ClusterInfo> {
        let response = self
            .request(Method::GET, "/")
            .send()
            .await
            .map_err(|e| match request_error(e, ELASTICSEARCH) {
                Error::Timeout(msg) => Error::Timeout(msg),
                other => Error::Connection(format!("Could not connect to {}: {}", self.url, other)),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Connection(format!(
                "Could not connect to {}: HTTP {}",
                self.url, status
            )));
        }

        Ok(response.json().await.unwrap_or_default())
    }

    /// Role of this session.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Elasticsearch base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Details for the connection table.
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Builds an authenticated request against `path`.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorized(self.client.request(method, join_url(&self.url, path)))
    }

    /// Builds an authenticated request whose path is `segments`, each one
    /// percent-encoded as a single path segment.
    ///
    /// Ids such as `logs?v2` or `team#a` stay intact instead of turning into
    /// a query string or a fragment.
    pub(crate) fn request_segments(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder> {
        let url = segment_url(&self.url, segments)?;
        Ok(self.authorized(self.client.request(method, url)))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("ApiKey {}", self.api_key))
    }
}

/// Appends `segments` to `base`, escaping `/`, `?`, `#`, `%` and friends.
fn segment_url(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| Error::Config(format!("Invalid URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| Error::Config(format!("'{base}' cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn mint_api_key(
    client: &Client,
    url: &str,
    username: &str,
    password: &str,
    name: &str,
) -> Result<String> {
    info!("Creating API key '{}' on {}", name, url);

    let response = client
        .post(join_url(url, "/_security/api_key"))
        .basic_auth(username, Some(password))
        .json(&CreateApiKeyRequest { name })
        .send()
        .await
        .map_err(|e| request_error(e, ELASTICSEARCH))?;
    let response = ensure_success(response, ELASTICSEARCH).await?;

    let created: CreateApiKeyResponse = response
        .json()
        .await
        .map_err(|e| Error::Response(format!("Failed to parse API key response: {e}")))?;

    created
        .encoded
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::Response("API key response has no 'encoded' field".to_string()))
}

/// Kibana endpoint plus the Basic credentials it needs.
#[derive(Clone)]
pub struct DashboardEndpoint {
    role: Role,
    url: String,
    username: String,
    password: String,
    client: Client,
    export_types: Vec<String>,
    include_references_deep: bool,
    create_new_copies: bool,
}

impl fmt::Debug for DashboardEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardEndpoint")
            .field("role", &self.role)
            .field("url", &self.url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl DashboardEndpoint {
    /// Builds the Kibana endpoint for `role`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL or credentials are missing.
    pub fn from_config(config: &MigrationConfig, role: Role) -> Result<Self> {
        let cluster = config.cluster(role);
        cluster.validate_dashboards(role)?;
        let (username, password) = cluster.basic_credentials().ok_or_else(|| {
            Error::Config(format!("{role} needs username/password for the dashboard service"))
        })?;

        Ok(Self {
            role,
            url: cluster.kibana_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            client: create_http_client(&config.options),
            export_types: config.options.export_types.clone(),
            include_references_deep: config.options.include_references_deep,
            create_new_copies: config.options.create_new_copies,
        })
    }

    /// Saved object types requested on export.
    pub fn export_types(&self) -> &[String] {
        &self.export_types
    }

    /// Whether exports follow references.
    pub fn include_references_deep(&self) -> bool {
        self.include_references_deep
    }

    /// Whether imports get fresh ids.
    pub fn create_new_copies(&self) -> bool {
        self.create_new_copies
    }

    /// Role of this endpoint.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Kibana base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Builds an authenticated POST with the anti-forgery header set.
    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(join_url(&self.url, path))
            .header(XSRF_HEADER, "true")
            .basic_auth(&self.username, Some(&self.password))
    }
}
