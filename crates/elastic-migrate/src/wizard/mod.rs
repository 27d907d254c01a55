//! Interactive menu.
//!
//! Lists the available actions, asks for confirmation, and runs the chosen
//! one. Printing local objects returns to the menu; declining the
//! confirmation asks again.

mod prompts;
mod ui;

pub use prompts::WizardPrompts;
pub use ui::WizardUI;

use crate::error::Result;
use crate::migrate::{Migrator, Scope};
use crate::report;

/// What an action does with the objects in its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Source to local storage.
    Download,
    /// Local storage to target.
    Upload,
    /// Source to target through local storage.
    Migrate,
}

/// One entry of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Run an operation over a scope.
    Run(Operation, Scope),
    /// Print what is in local storage.
    ShowLocal,
    /// Leave the menu.
    Quit,
}

impl MenuAction {
    /// Every menu entry, in display order.
    pub fn all() -> Vec<Self> {
        vec![
            Self::Run(Operation::Migrate, Scope::Both),
            Self::Run(Operation::Download, Scope::Both),
            Self::Run(Operation::Upload, Scope::Both),
            Self::Run(Operation::Migrate, Scope::Pipelines),
            Self::Run(Operation::Download, Scope::Dashboards),
            Self::Run(Operation::Download, Scope::Pipelines),
            Self::Run(Operation::Migrate, Scope::Dashboards),
            Self::Run(Operation::Upload, Scope::Dashboards),
            Self::Run(Operation::Upload, Scope::Pipelines),
            Self::ShowLocal,
            Self::Quit,
        ]
    }

    /// Menu text. Actions that write name the target deployment.
    pub fn label(&self, target: &str) -> String {
        match self {
            Self::Run(operation, scope) => {
                let what = match scope {
                    Scope::Both => "Pipelines & Dashboards",
                    Scope::Pipelines => "Pipelines",
                    Scope::Dashboards => "Dashboards",
                };
                match operation {
                    Operation::Download => format!("Download {what}"),
                    Operation::Upload => format!("Upload {what} -> {target}"),
                    Operation::Migrate if *scope == Scope::Both => {
                        format!("Migrate {what} -> {target}")
                    }
                    Operation::Migrate => format!("Migrate Only {what} -> {target}"),
                }
            }
            Self::ShowLocal => "Print Local Pipelines & Dashboards".to_string(),
            Self::Quit => "Quit".to_string(),
        }
    }

    /// Whether the action asks for confirmation first.
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Self::Run(..))
    }
}

/// Interactive menu over a [`Migrator`].
pub struct Wizard {
    ui: WizardUI,
    prompts: WizardPrompts,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    /// Creates a new wizard instance.
    pub fn new() -> Self {
        Self {
            ui: WizardUI::new(),
            prompts: WizardPrompts::new(),
        }
    }

    /// Runs the menu until an operation completes or the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if a prompt is aborted or the operation fails.
    pub async fn run(&self, migrator: &mut Migrator) -> Result<()> {
        self.ui.print_header();

        let actions = MenuAction::all();
        let target = migrator.config().target.es_url.clone();
        let labels: Vec<String> = actions.iter().map(|a| a.label(&target)).collect();

        loop {
            let action = actions[self.prompts.select_action(&labels)?];

            if action.needs_confirmation() && !self.prompts.confirm("Are you sure?")? {
                self.ui.print_cancelled();
                continue;
            }

            match action {
                MenuAction::Quit => {
                    self.ui.print_goodbye();
                    return Ok(());
                }
                MenuAction::ShowLocal => {
                    let local = migrator.local()?;
                    report::print_local(&local);
                }
                MenuAction::Run(operation, scope) => {
                    self.ui.print_running(&action.label(&target));
                    return self.execute(migrator, operation, scope).await;
                }
            }
        }
    }

    async fn execute(
        &self,
        migrator: &mut Migrator,
        operation: Operation,
        scope: Scope,
    ) -> Result<()> {
        match operation {
            Operation::Download => {
                let downloaded = migrator.download(scope).await?;
                report::print_download(&downloaded);
                self.ui.print_downloaded(&downloaded, migrator.layout().root());
            }
            Operation::Upload => {
                let written = migrator.upload(scope).await?;
                report::print_migration(&written);
                self.ui.print_success(&written);
            }
            Operation::Migrate => {
                let written = migrator.migrate(scope).await?;
                report::print_migration(&written);
                self.ui.print_success(&written);
            }
        }
        Ok(())
    }
}
