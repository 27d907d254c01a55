//! Local storage layout.
//!
//! ```text
//! <root>/
//!   pipelines/<category>/<pipeline-id>.json
//!   dashboards/dashboards.ndjson
//! ```

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{PipelineFilter, StorageConfig};
use crate::error::Result;

/// Name of the file a dashboard export is written to.
pub const EXPORT_FILE_NAME: &str = "dashboards.ndjson";

/// Directory tree that connects downloads and uploads.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    pipelines_dir: PathBuf,
    dashboards_dir: PathBuf,
}

impl StorageLayout {
    /// Derives the layout from a root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            pipelines_dir: root.join("pipelines"),
            dashboards_dir: root.join("dashboards"),
            root,
        }
    }

    /// Derives the layout from the storage section of the configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root)
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one subdirectory per pipeline category.
    pub fn pipelines_dir(&self) -> &Path {
        &self.pipelines_dir
    }

    /// Directory holding dashboard exports.
    pub fn dashboards_dir(&self) -> &Path {
        &self.dashboards_dir
    }

    /// Creates the directory tree, one pipeline subdirectory per filter.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure(&self, filters: &[PipelineFilter]) -> Result<()> {
        for filter in filters {
            std::fs::create_dir_all(self.pipelines_dir.join(&filter.directory))?;
        }
        std::fs::create_dir_all(&self.pipelines_dir)?;
        std::fs::create_dir_all(&self.dashboards_dir)?;
        debug!("Storage ready under {}", self.root.display());
        Ok(())
    }
}

/// Recursively collects regular files with `extension` under `dir`.
///
/// A missing directory yields an empty list.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
