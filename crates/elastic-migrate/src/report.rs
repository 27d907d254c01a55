//! Tabular console output.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use console::style;
use std::path::PathBuf;

use crate::dashboards::{classify, Catalog, CatalogEntry, ImportReport, ImportVerdict};
use crate::migrate::{DownloadReport, LocalObjects, MigrationReport};
use crate::pipelines::{PipelineMap, PipelineReport, PipelineSummary};
use crate::session::ConnectionInfo;

fn new_table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    let header: Vec<Cell> = columns
        .iter()
        .map(|c| Cell::new(c).fg(Color::Cyan))
        .collect();
    table.set_header(header);
    table
}

fn status_cell(ok: bool) -> Cell {
    if ok {
        Cell::new("OK").fg(Color::Green)
    } else {
        Cell::new("FAILED").fg(Color::Red)
    }
}

/// Keeps the first four characters of a secret and hides the rest.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "********".to_string()
    } else {
        format!("{visible}********")
    }
}

/// Table describing a freshly opened session.
pub fn connection_table(info: &ConnectionInfo) -> Table {
    let mut table = new_table(&["Setting", "Value"]);
    let key = if info.minted {
        format!("{} (new)", mask_secret(&info.api_key))
    } else {
        mask_secret(&info.api_key)
    };
    let cluster = if info.cluster.cluster_name.is_empty() {
        "-".to_string()
    } else {
        info.cluster.cluster_name.clone()
    };
    let version = if info.cluster.version.number.is_empty() {
        "-".to_string()
    } else {
        info.cluster.version.number.clone()
    };

    for (setting, value) in [
        ("Role", info.role.to_string()),
        ("Elasticsearch", info.es_url.clone()),
        ("Kibana", info.kibana_url.clone()),
        ("Username", info.username.clone().unwrap_or_else(|| "-".to_string())),
        ("API key", key),
        ("Cluster", cluster),
        ("Version", version),
    ] {
        table.add_row(vec![Cell::new(setting), Cell::new(value)]);
    }
    table
}

/// Prints the connection table.
pub fn print_connection(info: &ConnectionInfo) {
    println!();
    println!(
        "{} Connected to {} deployment",
        style("✓").green().bold(),
        info.role
    );
    println!("{}", connection_table(info));
}

/// Table of pipelines: name, reroute destination, whether it has processors.
pub fn pipelines_table(pipelines: &PipelineMap) -> Table {
    let mut table = new_table(&["name", "reroute dest", "has_processors"]);
    for (name, definition) in pipelines {
        let summary = PipelineSummary::from_definition(name, definition);
        table.add_row(vec![
            Cell::new(summary.name),
            Cell::new(summary.reroute_destination),
            Cell::new(if summary.has_processors { "Yes" } else { "No" }),
        ]);
    }
    table
}

/// Prints the pipelines table.
pub fn print_pipelines(pipelines: &PipelineMap) {
    if pipelines.is_empty() {
        println!("{}", style("No pipelines found").dim());
        return;
    }
    println!("{}", style(" --- PIPELINES ---").bold());
    println!("{}", pipelines_table(pipelines));
    println!();
}

/// Table of classified saved objects.
pub fn catalog_table(entries: &[CatalogEntry]) -> Table {
    let mut table = new_table(&["id", "name", "updated_at", "type"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.id),
            Cell::new(&entry.name),
            Cell::new(&entry.updated_at),
            Cell::new(&entry.kind),
        ]);
    }
    table
}

/// Prints one table per non-empty bucket.
pub fn print_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        println!("{}", style("No objects found").dim());
        return;
    }

    for (title, entries) in [
        ("DASHBOARDS", &catalog.dashboards),
        ("VISUALIZATIONS", &catalog.visualizations),
        ("INDEX PATTERNS", &catalog.index_patterns),
    ] {
        if entries.is_empty() {
            continue;
        }
        println!("{}", style(format!(" --- {title} ---")).bold());
        println!("{}", catalog_table(entries));
        println!();
    }
}

/// Per-pipeline upload status table.
pub fn pipeline_report_table(report: &PipelineReport) -> Table {
    let mut table = new_table(&["pipeline", "status"]);
    for (key, ok) in report.iter() {
        table.add_row(vec![Cell::new(key), status_cell(ok)]);
    }
    table
}

/// Prints the pipeline upload report.
pub fn print_pipeline_report(report: &PipelineReport) {
    if report.is_empty() {
        println!("{}", style("No pipeline files to upload").dim());
        return;
    }
    println!("{}", pipeline_report_table(report));
    let line = format!(
        "{} pipeline(s) uploaded, {} failed",
        report.succeeded(),
        report.failed()
    );
    if report.failed() == 0 {
        println!("{}", style(line).green());
    } else {
        println!("{}", style(line).yellow());
    }
}

/// Per-file import status table.
pub fn import_report_table(report: &ImportReport) -> Table {
    let mut table = new_table(&["file", "status", "imported", "errors"]);
    for (label, outcome) in report.iter() {
        table.add_row(vec![
            Cell::new(label),
            status_cell(outcome.success),
            Cell::new(outcome.success_count),
            Cell::new(outcome.errors.len()),
        ]);
    }
    table
}

/// Prints the import report and its overall verdict.
pub fn print_import_report(report: &ImportReport) {
    if !report.is_empty() {
        println!("{}", import_report_table(report));
    }
    let verdict = report.verdict();
    let line = format!(
        "Saved objects: {} ({} imported)",
        verdict,
        report.total_success_count()
    );
    match verdict {
        ImportVerdict::FullSuccess => println!("{}", style(line).green()),
        ImportVerdict::Partial => println!("{}", style(line).yellow()),
        ImportVerdict::TotalFailure => println!("{}", style(line).red()),
        ImportVerdict::Empty => println!("{}", style(line).dim()),
    }
}

/// Prints what a download fetched.
pub fn print_download(report: &DownloadReport) {
    if let Some(pipelines) = &report.pipelines {
        print_pipelines(pipelines);
    }
    if let Some(objects) = &report.objects {
        print_catalog(&classify(objects));
    }
}

/// Prints what an upload or migration wrote.
pub fn print_migration(report: &MigrationReport) {
    if let Some(pipelines) = &report.pipelines {
        println!("{}", style(" --- PIPELINES ---").bold());
        print_pipeline_report(pipelines);
        println!();
    }
    if let Some(dashboards) = &report.dashboards {
        println!("{}", style(" --- SAVED OBJECTS ---").bold());
        print_import_report(dashboards);
        println!();
    }
}

/// Local files that hold no usable pipeline.
pub fn unusable_files_table(files: &[PathBuf]) -> Table {
    let mut table = new_table(&["file", "status"]);
    for file in files {
        table.add_row(vec![
            Cell::new(file.display()),
            Cell::new("UNUSABLE").fg(Color::Yellow),
        ]);
    }
    table
}

/// Prints the contents of local storage.
///
/// Pipeline files that an upload would record as failures are listed after
/// the pipelines table.
pub fn print_local(local: &LocalObjects) {
    print_pipelines(&local.pipelines);
    if !local.unusable_pipeline_files.is_empty() {
        println!(
            "{}",
            style(format!(
                " --- UNUSABLE PIPELINE FILES ({}) ---",
                local.unusable_pipeline_files.len()
            ))
            .yellow()
            .bold()
        );
        println!("{}", unusable_files_table(&local.unusable_pipeline_files));
        println!();
    }
    print_catalog(&classify(&local.objects));
}
