//! Migration orchestration.
//!
//! Download always reads from the source deployment, upload always writes to
//! the target, and migrate does one after the other through local storage.
//! Nothing is transactional: an upload that fails halfway leaves the objects
//! written so far in place.

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::config::{MigrationConfig, PipelineFilter, Role};
use crate::credentials::CredentialStore;
use crate::dashboards::{self, ImportReport, ImportVerdict, SavedObject};
use crate::error::{Error, Result};
use crate::pipelines::{self, PipelineMap, PipelineReport};
use crate::report;
use crate::session::{DashboardEndpoint, Session};
use crate::storage::StorageLayout;

/// Which object classes an operation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Ingest pipelines only.
    Pipelines,
    /// Saved objects only.
    Dashboards,
    /// Both, pipelines first.
    Both,
}

impl Scope {
    /// Whether pipelines are part of this scope.
    pub fn includes_pipelines(self) -> bool {
        matches!(self, Self::Pipelines | Self::Both)
    }

    /// Whether saved objects are part of this scope.
    pub fn includes_dashboards(self) -> bool {
        matches!(self, Self::Dashboards | Self::Both)
    }
}

/// Downloads every pipeline from `source`, then uploads every local pipeline
/// file to `target`.
///
/// Files already present in `dir` are uploaded as well.
///
/// # Errors
///
/// Returns an error if either side fails at the transport level.
pub async fn migrate_pipelines(
    source: &Session,
    target: &Session,
    filters: &[PipelineFilter],
    dir: &Path,
) -> Result<PipelineReport> {
    pipelines::download(source, filters, dir).await?;
    pipelines::upload(target, dir).await
}

/// Exports every saved object from `source`, then imports every local
/// export file into `target`.
///
/// # Errors
///
/// Returns an error if the export fails or the import hits a transport or
/// authentication failure.
pub async fn migrate_dashboards(
    source: &DashboardEndpoint,
    target: &DashboardEndpoint,
    dir: &Path,
) -> Result<ImportReport> {
    dashboards::download(source, dir).await?;
    dashboards::upload(target, dir).await
}

/// What a download fetched.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Pipelines by id, when pipelines were in scope.
    pub pipelines: Option<PipelineMap>,
    /// Saved objects, when dashboards were in scope.
    pub objects: Option<Vec<SavedObject>>,
    /// Duration in seconds.
    pub duration_secs: f64,
}

/// What an upload (or a full migration) wrote.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Per-pipeline outcomes, when pipelines were in scope.
    pub pipelines: Option<PipelineReport>,
    /// Per-file import outcomes, when dashboards were in scope.
    pub dashboards: Option<ImportReport>,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl MigrationReport {
    /// Pipelines acknowledged plus saved objects imported.
    #[must_use]
    pub fn objects_written(&self) -> u64 {
        let pipelines = self
            .pipelines
            .as_ref()
            .map_or(0, |r| r.succeeded() as u64);
        let objects = self
            .dashboards
            .as_ref()
            .map_or(0, ImportReport::total_success_count);
        pipelines + objects
    }

    /// Whether nothing in scope failed.
    ///
    /// An empty pipeline upload and an empty import count as clean.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        let pipelines_ok = self.pipelines.as_ref().map_or(true, |r| r.failed() == 0);
        let dashboards_ok = self.dashboards.as_ref().map_or(true, |r| {
            matches!(r.verdict(), ImportVerdict::FullSuccess | ImportVerdict::Empty)
        });
        pipelines_ok && dashboards_ok
    }
}

/// Objects currently in local storage.
#[derive(Debug, Clone, Default)]
pub struct LocalObjects {
    /// Well-formed local pipelines.
    pub pipelines: PipelineMap,
    /// Local pipeline files an upload would record as failures.
    pub unusable_pipeline_files: Vec<PathBuf>,
    /// Saved objects from every local export file.
    pub objects: Vec<SavedObject>,
}

/// Runs downloads, uploads and migrations for one configuration.
///
/// Cluster sessions are opened on first use and reused afterwards.
pub struct Migrator {
    config: MigrationConfig,
    store: CredentialStore,
    layout: StorageLayout,
    source: Option<Session>,
    target: Option<Session>,
    show_connections: bool,
}

impl Migrator {
    /// Creates a migrator. No connection is made yet.
    pub fn new(config: MigrationConfig, store: CredentialStore) -> Self {
        let layout = StorageLayout::from_config(&config.storage);
        Self {
            config,
            store,
            layout,
            source: None,
            target: None,
            show_connections: true,
        }
    }

    /// Turns the connection table printed on first connect on or off.
    #[must_use]
    pub fn with_connection_tables(mut self, show: bool) -> Self {
        self.show_connections = show;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The local storage layout.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Opens the session for `role` unless it is already open.
    ///
    /// # Errors
    ///
    /// Returns the session error (see [`Session::connect`]).
    pub async fn connect(&mut self, role: Role) -> Result<&Session> {
        let slot = match role {
            Role::Source => &mut self.source,
            Role::Target => &mut self.target,
        };
        if slot.is_none() {
            let session = Session::connect(&self.config, role, &self.store).await?;
            if self.show_connections {
                report::print_connection(session.info());
            }
            *slot = Some(session);
        }
        slot.as_ref()
            .ok_or_else(|| Error::Connection(format!("no {role} session")))
    }

    /// Downloads the objects in `scope` from the source into local storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached or a file cannot be
    /// written.
    pub async fn download(&mut self, scope: Scope) -> Result<DownloadReport> {
        let start = Instant::now();
        let filters = self.config.options.pipeline_filters.clone();
        self.layout.ensure(&filters)?;

        let mut report = DownloadReport::default();
        if scope.includes_pipelines() {
            let dir = self.layout.pipelines_dir().to_path_buf();
            let source = self.connect(Role::Source).await?;
            report.pipelines = Some(pipelines::download(source, &filters, &dir).await?);
        }
        if scope.includes_dashboards() {
            let endpoint = DashboardEndpoint::from_config(&self.config, Role::Source)?;
            let dir = self.layout.dashboards_dir();
            report.objects = Some(dashboards::download(&endpoint, dir).await?);
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        info!("Download complete in {:.2}s", report.duration_secs);
        Ok(report)
    }

    /// Uploads the objects in `scope` from local storage to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be reached.
    pub async fn upload(&mut self, scope: Scope) -> Result<MigrationReport> {
        let start = Instant::now();
        let mut report = MigrationReport::default();

        if scope.includes_pipelines() {
            let dir = self.layout.pipelines_dir().to_path_buf();
            let target = self.connect(Role::Target).await?;
            report.pipelines = Some(pipelines::upload(target, &dir).await?);
        }
        if scope.includes_dashboards() {
            let endpoint = DashboardEndpoint::from_config(&self.config, Role::Target)?;
            let dir = self.layout.dashboards_dir();
            report.dashboards = Some(dashboards::upload(&endpoint, dir).await?);
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        info!(
            "Upload complete: {} object(s) written in {:.2}s",
            report.objects_written(),
            report.duration_secs
        );
        Ok(report)
    }

    /// Copies the objects in `scope` from the source to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if either deployment cannot be reached.
    pub async fn migrate(&mut self, scope: Scope) -> Result<MigrationReport> {
        let start = Instant::now();
        let filters = self.config.options.pipeline_filters.clone();
        self.layout.ensure(&filters)?;

        let mut report = MigrationReport::default();
        if scope.includes_pipelines() {
            self.connect(Role::Source).await?;
            self.connect(Role::Target).await?;
            let (source, target) = self.sessions()?;
            let dir = self.layout.pipelines_dir();
            report.pipelines = Some(migrate_pipelines(source, target, &filters, dir).await?);
        }
        if scope.includes_dashboards() {
            let source = DashboardEndpoint::from_config(&self.config, Role::Source)?;
            let target = DashboardEndpoint::from_config(&self.config, Role::Target)?;
            let dir = self.layout.dashboards_dir();
            report.dashboards = Some(migrate_dashboards(&source, &target, dir).await?);
        }

        report.duration_secs = start.elapsed().as_secs_f64();
        info!(
            "Migration complete: {} object(s) written in {:.2}s",
            report.objects_written(),
            report.duration_secs
        );
        Ok(report)
    }

    /// Reads what is currently in local storage. Makes no network call.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage cannot be read.
    pub fn local(&self) -> Result<LocalObjects> {
        let local = pipelines::read_local(self.layout.pipelines_dir())?;
        Ok(LocalObjects {
            pipelines: local.pipelines,
            unusable_pipeline_files: local.unusable,
            objects: dashboards::read_local(self.layout.dashboards_dir())?,
        })
    }

    fn sessions(&self) -> Result<(&Session, &Session)> {
        match (&self.source, &self.target) {
            (Some(source), Some(target)) => Ok((source, target)),
            _ => Err(Error::Connection(
                "source and target sessions are not both connected".to_string(),
            )),
        }
    }
}
