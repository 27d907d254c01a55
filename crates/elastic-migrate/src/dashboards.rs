//! Dashboard and saved-object transfer through the Kibana bulk APIs.
//!
//! Download stores the raw export (NDJSON) before parsing it, so what lands
//! on disk is exactly what the service returned. Upload posts every local
//! `*.ndjson` file to the import API as a multipart form.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::http::{ensure_success, handle_http_error, request_error, KIBANA};
use crate::progress;
use crate::session::DashboardEndpoint;
use crate::storage::{files_with_extension, EXPORT_FILE_NAME};

const EXPORT_PATH: &str = "/api/saved_objects/_export";
const IMPORT_PATH: &str = "/api/saved_objects/_import";
const NDJSON_MIME: &str = "application/ndjson";

/// Saved object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    /// `dashboard`
    Dashboard,
    /// `visualization`
    Visualization,
    /// `index-pattern`
    IndexPattern,
    /// Anything else (`search`, `lens`, `tag`, ...). Empty when absent.
    Other(String),
}

impl Default for ObjectKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl ObjectKind {
    /// Type name as used by the saved objects API.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Visualization => "visualization",
            Self::IndexPattern => "index-pattern",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for ObjectKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "dashboard" => Self::Dashboard,
            "visualization" => Self::Visualization,
            "index-pattern" => Self::IndexPattern,
            _ => Self::Other(kind),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a bulk export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedObject {
    /// Object id.
    #[serde(default)]
    pub id: String,
    /// Object type.
    #[serde(rename = "type", default)]
    pub kind: ObjectKind,
    /// Attributes, including the display title.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Last-updated timestamp (ISO 8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// References to other saved objects.
    #[serde(default)]
    pub references: Vec<Value>,
}

impl SavedObject {
    /// Display title, if set and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.attributes
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// Trailing summary line of a bulk export.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    /// Number of exported objects.
    #[serde(default)]
    pub exported_count: u64,
    /// Number of references that could not be resolved.
    #[serde(default)]
    pub missing_ref_count: u64,
    /// The unresolved references.
    #[serde(default)]
    pub missing_references: Vec<Value>,
}

/// Result of parsing a bulk export.
#[derive(Debug, Clone, Default)]
pub struct ParsedExport {
    /// Saved objects, in export order.
    pub objects: Vec<SavedObject>,
    /// Export summary line, if present.
    pub summary: Option<ExportSummary>,
    /// Number of malformed lines dropped.
    pub skipped: usize,
}

/// Parses NDJSON export bytes.
///
/// Blank lines are ignored, the summary line is split off, and malformed
/// lines are dropped with a warning.
pub fn parse_export(bytes: &[u8]) -> ParsedExport {
    let text = String::from_utf8_lossy(bytes);
    let mut parsed = ParsedExport::default();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value = match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                warn!("Export line {} is not a JSON object, skipping", index + 1);
                parsed.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("Export line {} is not valid JSON ({}), skipping", index + 1, e);
                parsed.skipped += 1;
                continue;
            }
        };

        if value.get("exportedCount").is_some() && value.get("type").is_none() {
            match serde_json::from_value::<ExportSummary>(value) {
                Ok(summary) => parsed.summary = Some(summary),
                Err(e) => warn!("Unreadable export summary: {}", e),
            }
            continue;
        }

        match serde_json::from_value::<SavedObject>(value) {
            Ok(object) => parsed.objects.push(object),
            Err(e) => {
                warn!("Export line {} is not a saved object ({}), skipping", index + 1, e);
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

/// Exports every saved object from `endpoint` into `dir`.
///
/// The response is written verbatim to `<dir>/dashboards.ndjson` and then
/// parsed.
///
/// # Errors
///
/// Returns an error on transport failures or a non-success status. Nothing
/// is written in that case.
pub async fn download(endpoint: &DashboardEndpoint, dir: &Path) -> Result<Vec<SavedObject>> {
    let pb = progress::spinner(format!("Exporting saved objects from {}", endpoint.url()));
    let result = export(endpoint).await;
    pb.finish_and_clear();
    let bytes = result?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(EXPORT_FILE_NAME);
    std::fs::write(&path, &bytes)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());

    let parsed = parse_export(&bytes);
    if let Some(summary) = &parsed.summary {
        info!(
            "Export summary: {} exported, {} missing references",
            summary.exported_count, summary.missing_ref_count
        );
    }
    if parsed.skipped > 0 {
        warn!("Dropped {} malformed export line(s)", parsed.skipped);
    }
    info!(
        "Downloaded {} saved object(s) from {}",
        parsed.objects.len(),
        endpoint.role()
    );

    Ok(parsed.objects)
}

async fn export(endpoint: &DashboardEndpoint) -> Result<Vec<u8>> {
    let types = match endpoint.export_types() {
        [single] => Value::String(single.clone()),
        many => Value::from(many.to_vec()),
    };
    let body = json!({
        "type": types,
        "includeReferencesDeep": endpoint.include_references_deep(),
    });

    let response = endpoint
        .post(EXPORT_PATH)
        .json(&body)
        .send()
        .await
        .map_err(|e| request_error(e, KIBANA))?;
    let response = ensure_success(response, KIBANA).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| request_error(e, KIBANA))?;
    Ok(bytes.to_vec())
}

/// Parses every local export file under `dir`.
///
/// # Errors
///
/// Returns an error if a file cannot be read.
pub fn read_local(dir: &Path) -> Result<Vec<SavedObject>> {
    let mut objects = Vec::new();
    for path in files_with_extension(dir, "ndjson")? {
        let bytes = std::fs::read(&path)?;
        objects.extend(parse_export(&bytes).objects);
    }
    Ok(objects)
}

/// Row of a catalog table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Object id.
    pub id: String,
    /// Display title.
    pub name: String,
    /// Last-updated timestamp, empty if unknown.
    pub updated_at: String,
    /// Object type.
    pub kind: String,
}

/// Saved objects grouped for display, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Dashboards.
    pub dashboards: Vec<CatalogEntry>,
    /// Visualizations.
    pub visualizations: Vec<CatalogEntry>,
    /// Index patterns.
    pub index_patterns: Vec<CatalogEntry>,
}

impl Catalog {
    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.dashboards.is_empty() && self.visualizations.is_empty() && self.index_patterns.is_empty()
    }

    /// Total number of classified objects.
    pub fn len(&self) -> usize {
        self.dashboards.len() + self.visualizations.len() + self.index_patterns.len()
    }
}

/// Buckets objects by type.
///
/// Only objects with an id, a title, and one of the three displayed types
/// are kept.
pub fn classify(objects: &[SavedObject]) -> Catalog {
    let mut catalog = Catalog::default();

    for object in objects {
        let Some(title) = object.title() else {
            continue;
        };
        if object.id.is_empty() {
            continue;
        }

        let bucket = match object.kind {
            ObjectKind::Dashboard => &mut catalog.dashboards,
            ObjectKind::Visualization => &mut catalog.visualizations,
            ObjectKind::IndexPattern => &mut catalog.index_patterns,
            ObjectKind::Other(_) => continue,
        };
        bucket.push(CatalogEntry {
            id: object.id.clone(),
            name: title.to_string(),
            updated_at: object.updated_at.clone().unwrap_or_default(),
            kind: object.kind.to_string(),
        });
    }

    for bucket in [
        &mut catalog.dashboards,
        &mut catalog.visualizations,
        &mut catalog.index_patterns,
    ] {
        bucket.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    catalog
}

/// Response of the import API for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    /// Whether every object in the file was imported.
    #[serde(default)]
    pub success: bool,
    /// Number of objects imported.
    #[serde(default)]
    pub success_count: u64,
    /// Per-object errors reported by the service.
    #[serde(default)]
    pub errors: Vec<Value>,
}

/// Overall result of an import across every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportVerdict {
    /// Every file imported completely.
    FullSuccess,
    /// Some objects were imported, some were not.
    Partial,
    /// Nothing was imported.
    TotalFailure,
    /// No file produced a readable response.
    Empty,
}

impl fmt::Display for ImportVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FullSuccess => "all objects imported",
            Self::Partial => "partially imported",
            Self::TotalFailure => "import failed",
            Self::Empty => "nothing to import",
        };
        f.write_str(text)
    }
}

/// Per-file outcomes of an import, keyed by `<dir>/<file>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    results: BTreeMap<String, ImportOutcome>,
}

impl ImportReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for a file.
    pub fn record(&mut self, label: impl Into<String>, outcome: ImportOutcome) {
        self.results.insert(label.into(), outcome);
    }

    /// Outcome for a label.
    pub fn get(&self, label: &str) -> Option<&ImportOutcome> {
        self.results.get(label)
    }

    /// Number of recorded files.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no file was recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Entries in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ImportOutcome)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Objects imported across every file.
    pub fn total_success_count(&self) -> u64 {
        self.results.values().map(|o| o.success_count).sum()
    }

    /// Summarizes every recorded file.
    pub fn verdict(&self) -> ImportVerdict {
        if self.results.is_empty() {
            ImportVerdict::Empty
        } else if self.results.values().all(|o| o.success) {
            ImportVerdict::FullSuccess
        } else if self.total_success_count() == 0 && !self.results.values().any(|o| o.success) {
            ImportVerdict::TotalFailure
        } else {
            ImportVerdict::Partial
        }
    }
}

/// Imports every `*.ndjson` file under `dir` into `endpoint`.
///
/// Files whose response is not JSON are skipped with a warning and do not
/// appear in the report.
///
/// # Errors
///
/// Returns an error on transport failures, rejected credentials, or when a
/// file cannot be read.
pub async fn upload(endpoint: &DashboardEndpoint, dir: &Path) -> Result<ImportReport> {
    let files = files_with_extension(dir, "ndjson")?;
    let mut report = ImportReport::new();

    info!("Importing {} export file(s) into {}", files.len(), endpoint.role());
    let pb = progress::object_bar(files.len() as u64);

    for path in &files {
        let label = file_label(path);
        pb.set_message(label.clone());

        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| EXPORT_FILE_NAME.to_string());
        let part = Part::bytes(bytes).file_name(file_name).mime_str(NDJSON_MIME)?;
        let form = Form::new().part("file", part);

        let response = endpoint
            .post(IMPORT_PATH)
            .query(&[("createNewCopies", endpoint.create_new_copies())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(e, KIBANA))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| request_error(e, KIBANA))?;
        if matches!(status.as_u16(), 401 | 403) {
            pb.finish_and_clear();
            return Err(handle_http_error(status.as_u16(), &text, KIBANA));
        }

        match serde_json::from_str::<ImportOutcome>(&text) {
            Ok(outcome) => {
                log_outcome(&label, &outcome);
                report.record(label, outcome);
            }
            Err(e) => {
                warn!("Failed to import {} (HTTP {}): {}", path.display(), status, e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Import finished: {} ({} object(s))",
        report.verdict(),
        report.total_success_count()
    );
    Ok(report)
}

fn log_outcome(label: &str, outcome: &ImportOutcome) {
    if outcome.success {
        info!("Imported {} object(s) from {}", outcome.success_count, label);
    } else if outcome.success_count > 0 {
        warn!(
            "Imported {} object(s) from {}, {} error(s)",
            outcome.success_count,
            label,
            outcome.errors.len()
        );
    } else {
        warn!("Failed to import anything from {}", label);
    }
}

/// `<parent-dir>/<file>` label for an export file.
fn file_label(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.parent().and_then(Path::file_name) {
        Some(parent) => format!("{}/{}", parent.to_string_lossy(), file),
        None => file,
    }
}

#[cfg(test)]
#[path = "dashboards_tests.rs"]
mod tests;
