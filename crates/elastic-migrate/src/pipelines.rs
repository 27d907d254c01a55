//! Ingest pipeline transfer.
//!
//! Pipelines are downloaded per filter into `<dir>/<category>/<id>.json`,
//! each file holding a single `{ "<id>": <definition> }` mapping. Upload walks
//! the directory and writes every file back with `PUT /_ingest/pipeline/{id}`.

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::PipelineFilter;
use crate::error::{Error, Result};
use crate::http::{ensure_success, handle_http_error, request_error, ELASTICSEARCH};
use crate::progress;
use crate::session::Session;
use crate::storage::files_with_extension;

/// Pipelines keyed by id.
pub type PipelineMap = BTreeMap<String, Value>;

/// A single pipeline and its processor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRecord {
    /// Pipeline id, unique within a cluster.
    pub id: String,
    /// Pipeline definition (description, processors, ...).
    pub definition: Value,
}

impl PipelineRecord {
    /// Creates a record.
    pub fn new(id: impl Into<String>, definition: Value) -> Self {
        Self {
            id: id.into(),
            definition,
        }
    }

    /// The single-key document stored on disk.
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.id.clone(), self.definition.clone());
        Value::Object(map)
    }
}

/// What a local pipeline file turned out to contain.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineFile {
    /// `{}`: no pipeline at all.
    Empty,
    /// A pipeline, taken from the first key.
    Pipeline(PipelineRecord),
}

/// Per-pipeline outcome of an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    results: BTreeMap<String, bool>,
}

impl PipelineReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an outcome. A later entry for the same key replaces the earlier one.
    pub fn record(&mut self, key: impl Into<String>, success: bool) {
        self.results.insert(key.into(), success);
    }

    /// Outcome for a key.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.results.get(key).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.results.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of successful writes.
    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|ok| **ok).count()
    }

    /// Number of failures.
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Whether there is at least one entry and every entry succeeded.
    pub fn all_succeeded(&self) -> bool {
        !self.is_empty() && self.failed() == 0
    }
}

/// Row shown in the pipelines table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Pipeline id.
    pub name: String,
    /// `reroute.destination` of the last processor, `N/A` if it has none,
    /// empty if the pipeline has no processors.
    pub reroute_destination: String,
    /// Whether the pipeline has any processors.
    pub has_processors: bool,
}

impl PipelineSummary {
    /// Summarizes a pipeline definition.
    pub fn from_definition(name: &str, definition: &Value) -> Self {
        let processors = definition
            .get("processors")
            .and_then(Value::as_array)
            .filter(|p| !p.is_empty());

        let reroute_destination = match processors.and_then(|p| p.last()) {
            Some(last) => last
                .get("reroute")
                .and_then(|r| r.get("destination"))
                .and_then(Value::as_str)
                .unwrap_or("N/A")
                .to_string(),
            None => String::new(),
        };

        Self {
            name: name.to_string(),
            reroute_destination,
            has_processors: processors.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AcknowledgedResponse {
    #[serde(default)]
    acknowledged: bool,
}

/// Downloads every pipeline matching `filters` into `dir`.
///
/// Filters are queried in order and merged; when two filters match the same
/// id, the later one wins in the returned map.
///
/// # Errors
///
/// Returns an error on transport failures, rejected credentials, or when a
/// file cannot be written. A 404 for a pattern is not an error.
pub async fn download(
    session: &Session,
    filters: &[PipelineFilter],
    dir: &Path,
) -> Result<PipelineMap> {
    for filter in filters {
        std::fs::create_dir_all(dir.join(&filter.directory))?;
    }

    let mut merged = PipelineMap::new();
    for filter in filters {
        let pb = progress::spinner(format!("Fetching pipelines matching {}", filter.pattern));
        let found = fetch_pipelines(session, &filter.pattern).await;
        pb.finish_and_clear();
        let found = found?;

        info!(
            "Found {} pipeline(s) matching '{}'",
            found.len(),
            filter.pattern
        );

        let category_dir = dir.join(&filter.directory);
        for (id, definition) in found {
            let record = PipelineRecord::new(id, definition);
            let path = write_pipeline_file(&category_dir, &record)?;
            debug!("Wrote {}", path.display());
            merged.insert(record.id, record.definition);
        }
    }

    info!("Downloaded {} pipeline(s) from {}", merged.len(), session.role());
    Ok(merged)
}

/// Fetches the pipelines whose id matches `pattern`.
///
/// # Errors
///
/// Returns an error on transport failures or a non-success status other than 404.
pub async fn fetch_pipelines(session: &Session, pattern: &str) -> Result<PipelineMap> {
    let response = session
        .request_segments(Method::GET, &["_ingest", "pipeline", pattern])?
        .send()
        .await
        .map_err(|e| request_error(e, ELASTICSEARCH))?;

    if response.status() == StatusCode::NOT_FOUND {
        debug!("No pipelines match '{}'", pattern);
        return Ok(PipelineMap::new());
    }

    let response = ensure_success(response, ELASTICSEARCH).await?;
    let body: Map<String, Value> = response
        .json()
        .await
        .map_err(|e| Error::Response(format!("Failed to parse pipelines response: {e}")))?;

    Ok(body.into_iter().collect())
}

/// Uploads every `*.json` file under `dir` to the session's cluster.
///
/// Every file gets an entry: malformed files are recorded as failures keyed
/// by their path, `{}` files under `"{}"`, and pipelines under their id.
///
/// # Errors
///
/// Only transport failures abort the upload.
pub async fn upload(session: &Session, dir: &Path) -> Result<PipelineReport> {
    let files = files_with_extension(dir, "json")?;
    let mut report = PipelineReport::new();

    info!("Uploading {} pipeline file(s) to {}", files.len(), session.role());
    let pb = progress::object_bar(files.len() as u64);

    for path in &files {
        match parse_pipeline_file(path) {
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                report.record(path.display().to_string(), false);
            }
            Ok(PipelineFile::Empty) => {
                warn!("Skipping {}: no pipeline in file", path.display());
                report.record(Value::Object(Map::new()).to_string(), false);
            }
            Ok(PipelineFile::Pipeline(record)) => {
                pb.set_message(record.id.clone());
                if !record.definition.is_object() {
                    warn!("Pipeline {} in {} is not an object", record.id, path.display());
                    report.record(record.id, false);
                } else {
                    let ok = put_pipeline(session, &record).await?;
                    report.record(record.id, ok);
                }
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Pipeline upload finished: {} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

/// Writes one pipeline with `PUT /_ingest/pipeline/{id}`.
///
/// Returns the `acknowledged` flag. A non-success status is logged and
/// reported as `false`.
///
/// # Errors
///
/// Returns an error on transport failures.
pub async fn put_pipeline(session: &Session, record: &PipelineRecord) -> Result<bool> {
    let response = session
        .request_segments(Method::PUT, &["_ingest", "pipeline", record.id.as_str()])?
        .json(&record.definition)
        .send()
        .await
        .map_err(|e| request_error(e, ELASTICSEARCH))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(
            "Pipeline {} rejected: {}",
            record.id,
            handle_http_error(status.as_u16(), &body, ELASTICSEARCH)
        );
        return Ok(false);
    }

    match response.json::<AcknowledgedResponse>().await {
        Ok(ack) => {
            debug!("Pipeline {} acknowledged={}", record.id, ack.acknowledged);
            Ok(ack.acknowledged)
        }
        Err(e) => {
            warn!("Unreadable response for pipeline {}: {}", record.id, e);
            Ok(false)
        }
    }
}

/// Reads and interprets a local pipeline file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not JSON, or its top
/// level is not an object.
pub fn parse_pipeline_file(path: &Path) -> Result<PipelineFile> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let Value::Object(map) = value else {
        return Err(Error::MalformedFile {
            path: path.to_path_buf(),
            reason: "top level is not a JSON object".to_string(),
        });
    };

    if map.len() > 1 {
        warn!(
            "{} holds {} keys, only the first is used",
            path.display(),
            map.len()
        );
    }

    Ok(match map.into_iter().next() {
        Some((id, definition)) => PipelineFile::Pipeline(PipelineRecord::new(id, definition)),
        None => PipelineFile::Empty,
    })
}

/// Writes `record` to `<dir>/<id>.json` with 4-space indentation.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_pipeline_file(dir: &Path, record: &PipelineRecord) -> Result<PathBuf> {
    let path = dir.join(format!("{}.json", file_stem(&record.id)));
    std::fs::write(&path, to_pretty_json(&record.to_document())?)?;
    Ok(path)
}

/// Local pipeline storage as read from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalPipelines {
    /// Well-formed pipelines by id.
    pub pipelines: PipelineMap,
    /// Files that hold no usable pipeline (empty, unreadable, or not an
    /// object). An upload records each of them as a failure.
    pub unusable: Vec<PathBuf>,
}

/// Reads every local pipeline file.
///
/// Files that hold no usable pipeline are listed in
/// [`LocalPipelines::unusable`] and logged as warnings.
///
/// # Errors
///
/// Returns an error if the directory cannot be traversed.
pub fn read_local(dir: &Path) -> Result<LocalPipelines> {
    let mut local = LocalPipelines::default();
    for path in files_with_extension(dir, "json")? {
        match parse_pipeline_file(&path) {
            Ok(PipelineFile::Pipeline(record)) if record.definition.is_object() => {
                local.pipelines.insert(record.id, record.definition);
            }
            Ok(PipelineFile::Pipeline(record)) => {
                warn!("Pipeline {} in {} is not an object", record.id, path.display());
                local.unusable.push(path);
            }
            Ok(PipelineFile::Empty) => {
                warn!("{} holds no pipeline", path.display());
                local.unusable.push(path);
            }
            Err(e) => {
                warn!("Cannot use {}: {}", path.display(), e);
                local.unusable.push(path);
            }
        }
    }
    Ok(local)
}

/// Maps a pipeline id to a file stem that stays inside its directory.
fn file_stem(id: &str) -> String {
    id.replace(['/', '\\'], "_")
}

fn to_pretty_json(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
#[path = "pipelines_tests.rs"]
mod tests;
