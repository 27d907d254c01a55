//! On-disk credential store.
//!
//! The store is the YAML configuration file itself. Minting an API key writes
//! the key back under `<role>.api_key` so later runs reuse it. The rest of
//! the document is left as it was.

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Role;
use crate::error::{Error, Result};

/// Handle on the YAML credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Opens the store at `path`. The file does not have to exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists a freshly minted API key for a role.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or written, or if
    /// its top level is not a mapping.
    pub fn save_api_key(&self, role: Role, api_key: &str) -> Result<()> {
        let mut document = self.read_document()?;

        let root = document.as_mapping_mut().ok_or_else(|| {
            Error::Config(format!(
                "{} does not contain a YAML mapping",
                self.path.display()
            ))
        })?;

        let section_key = Value::String(role.as_str().to_string());
        if root.get(&section_key).map_or(true, Value::is_null) {
            root.insert(section_key.clone(), Value::Mapping(Mapping::new()));
        }
        let section = root
            .get_mut(&section_key)
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| {
                Error::Config(format!("'{}' section is not a mapping", role.as_str()))
            })?;
        section.insert(
            Value::String("api_key".to_string()),
            Value::String(api_key.to_string()),
        );

        std::fs::write(&self.path, serde_yaml::to_string(&document)?)?;
        info!("API key saved to {}", self.path.display());
        Ok(())
    }

    fn read_document(&self) -> Result<Value> {
        if !self.path.exists() {
            debug!("Credential store {} does not exist yet", self.path.display());
            return Ok(Value::Mapping(Mapping::new()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Value::Mapping(Mapping::new()));
        }
        Ok(serde_yaml::from_str(&content)?)
    }
}
