//! Console UI formatting for the menu.

use console::{style, Style};
use std::path::Path;

use crate::migrate::{DownloadReport, MigrationReport};

/// Console UI handler for the menu.
#[derive(Debug, Default)]
pub struct WizardUI;

impl WizardUI {
    /// Creates a new UI handler.
    pub fn new() -> Self {
        Self
    }

    /// Prints the menu header.
    pub fn print_header(&self) {
        let cyan = Style::new().cyan().bold();

        println!();
        println!(
            "{}",
            cyan.apply_to("╔═══════════════════════════════════════════════════════════════╗")
        );
        println!(
            "{}",
            cyan.apply_to("║         ELASTIC MIGRATE                                       ║")
        );
        println!(
            "{}",
            cyan.apply_to("║         Pipelines and dashboards between deployments          ║")
        );
        println!(
            "{}",
            cyan.apply_to("╚═══════════════════════════════════════════════════════════════╝")
        );
        println!();
    }

    /// Prints the action about to run.
    pub fn print_running(&self, label: &str) {
        println!();
        println!("{} {}...", style("⚡").bold(), label);
        println!();
    }

    /// Prints a download summary.
    pub fn print_downloaded(&self, report: &DownloadReport, root: &Path) {
        let green = Style::new().green().bold();
        let bold = Style::new().bold();

        println!("{}", green.apply_to("✅ Download Complete!"));
        if let Some(pipelines) = &report.pipelines {
            println!("   {} {}", bold.apply_to("Pipelines:    "), pipelines.len());
        }
        if let Some(objects) = &report.objects {
            println!("   {} {}", bold.apply_to("Saved objects:"), objects.len());
        }
        println!(
            "   {} {:.1}s",
            bold.apply_to("Duration:     "),
            report.duration_secs
        );
        println!("   {} {}", bold.apply_to("Stored in:    "), root.display());
        println!();
    }

    /// Prints an upload or migration summary.
    pub fn print_success(&self, report: &MigrationReport) {
        let bold = Style::new().bold();

        if report.is_clean() {
            println!("{}", Style::new().green().bold().apply_to("✅ Migration Complete!"));
        } else {
            println!(
                "{}",
                Style::new()
                    .yellow()
                    .bold()
                    .apply_to("⚠ Migration finished with failures")
            );
        }
        println!(
            "   {} {}",
            bold.apply_to("Objects written:"),
            report.objects_written()
        );
        println!(
            "   {} {:.1}s",
            bold.apply_to("Duration:       "),
            report.duration_secs
        );
        if let Some(pipelines) = &report.pipelines {
            if pipelines.failed() > 0 {
                println!(
                    "   {} {} pipeline(s)",
                    style("Failed:").yellow(),
                    pipelines.failed()
                );
            }
        }
        println!();
    }

    /// Prints cancellation message.
    pub fn print_cancelled(&self) {
        println!();
        println!("{} Cancelled.", style("ℹ").blue());
    }

    /// Prints the exit message.
    pub fn print_goodbye(&self) {
        println!("{} Bye.", style("ℹ").blue());
    }

    /// Prints error message.
    pub fn print_error(&self, message: &str) {
        eprintln!();
        eprintln!("{} {}", style("❌").red().bold(), message);
    }
}
