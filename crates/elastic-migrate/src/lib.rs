// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # elastic-migrate
//!
//! `elastic-migrate` is a CLI tool and library for moving ingest pipelines
//! and Kibana saved objects (dashboards, visualizations, index patterns)
//! from one Elastic deployment to another.
//!
//! ## What Gets Migrated
//!
//! | Object | Read from | Written to |
//! |--------|-----------|------------|
//! | Ingest pipelines | `GET /_ingest/pipeline/{pattern}` | `PUT /_ingest/pipeline/{id}` |
//! | Saved objects | `POST /api/saved_objects/_export` | `POST /api/saved_objects/_import` |
//!
//! Objects pass through a local directory, so a download can be inspected
//! or edited before it is uploaded.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a template configuration
//! elastic-migrate init
//!
//! # Interactive menu
//! elastic-migrate
//!
//! # Source -> local -> target, pipelines only
//! elastic-migrate migrate --only pipelines
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   es_url: https://source.es.example.com:9243
//!   kibana_url: https://source.kb.example.com:9243
//!   username: elastic
//!   password: changeme
//!
//! target:
//!   es_url: https://target.es.example.com:9243
//!   kibana_url: https://target.kb.example.com:9243
//!   username: elastic
//!   password: changeme
//!
//! storage:
//!   root: ./stored_objects
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod dashboards;
pub mod error;
pub mod http;
pub mod migrate;
pub mod pipelines;
pub mod progress;
pub mod report;
pub mod session;
pub mod storage;
pub mod wizard;

pub use config::{ClusterConfig, MigrationConfig, MigrationOptions, PipelineFilter, Role};
pub use credentials::CredentialStore;
pub use dashboards::{Catalog, ImportOutcome, ImportReport, ImportVerdict, ObjectKind, SavedObject};
pub use error::{Error, Result};
pub use migrate::{DownloadReport, MigrationReport, Migrator, Scope};
pub use pipelines::{PipelineRecord, PipelineReport};
pub use session::{DashboardEndpoint, Session};
pub use storage::StorageLayout;
