//! Interactive prompts for the menu.

use dialoguer::{theme::ColorfulTheme, Confirm, Select};

use crate::error::{Error, Result};

/// Interactive prompts handler.
pub struct WizardPrompts {
    theme: ColorfulTheme,
}

impl Default for WizardPrompts {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardPrompts {
    /// Creates a new prompts handler.
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Asks which action to run. Returns the index of the chosen label.
    pub fn select_action(&self, labels: &[String]) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt("What would you like to do?")
            .items(labels)
            .default(0)
            .interact()
            .map_err(|e| Error::Prompt(format!("Selection cancelled: {e}")))
    }

    /// Yes/no question, defaulting to yes.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(|e| Error::Prompt(format!("Confirmation cancelled: {e}")))
    }
}
