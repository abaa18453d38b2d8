//! Command implementations for the checkwright CLI.
//!
//! Each command returns a serializable result that `main` prints as JSON or
//! human-readable text. Commands are organized by area:
//! - `project` - Project creation, metadata, scope and visibility
//! - `result` - Judgements and evidence
//! - `migrate` - Standard migration, snapshots and merging
//! - `standard` - Standard catalog and configuration display

mod migrate;
mod project;
mod result;
mod standard;

pub use migrate::*;
pub use project::*;
pub use result::*;
pub use standard::*;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::ResolvedConfig;
use crate::models::{InfoValue, StandardDefinition};
use crate::standards::StandardCatalog;
use crate::storage::ProjectStore;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output: Serialize {
    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: ResolvedConfig,
    /// Folder of the project to operate on
    pub project_dir: PathBuf,
}

impl Context {
    pub fn new(config: ResolvedConfig, project_dir: PathBuf) -> Self {
        Self { config, project_dir }
    }

    pub fn catalog(&self) -> StandardCatalog {
        StandardCatalog::new(&self.config.standards_dir.value)
    }

    /// A store configured from the resolved settings, with nothing open.
    pub fn new_store(&self) -> ProjectStore {
        ProjectStore::new(self.config.store_settings())
    }

    /// Open the project in `project_dir` and bind its standard when the
    /// catalog has it.
    pub fn open_project(&self) -> Result<ProjectStore> {
        let mut store = self.new_store();
        store.load(&self.project_dir)?;

        let (name, version) = store
            .project()
            .map(|p| (p.standard_name.clone(), p.standard_version.clone()))
            .unwrap_or_default();
        match self.catalog().find_version(&name, &version) {
            Ok(standard) => store.set_standard(standard),
            Err(e) => {
                tracing::warn!(standard = %name, error = %e, "project standard not available")
            }
        }
        Ok(store)
    }

    /// `name_or_path` from the catalog, or the latest standard when `None`.
    pub fn resolve_standard(&self, name_or_path: Option<&str>) -> Result<StandardDefinition> {
        match name_or_path {
            Some(name) => self.catalog().resolve(name),
            None => self.catalog().latest(),
        }
    }

    /// Parent folder for new projects.
    pub fn save_path(&self, explicit: Option<PathBuf>) -> PathBuf {
        explicit.unwrap_or_else(|| self.config.default_save_path.value.clone())
    }
}

/// The standard bound to `store`, or an error naming the project's standard.
pub(crate) fn require_standard(store: &ProjectStore) -> Result<&StandardDefinition> {
    store.standard().ok_or_else(|| {
        let name = store
            .project()
            .map(|p| p.standard_name.as_str())
            .unwrap_or_default();
        Error::NotFound(format!("standard '{}' is not in the standards directory", name))
    })
}

/// Parse `key=value` pairs into an info patch.
pub(crate) fn parse_info_pairs(pairs: &[String]) -> Result<BTreeMap<String, InfoValue>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = split_pair(pair)?;
            Ok((key.to_string(), InfoValue::from_cli(value)))
        })
        .collect()
}

pub(crate) fn split_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(Error::Validation(format!(
            "expected key=value, got '{}'",
            pair
        ))),
    }
}

pub(crate) fn display(path: &Path) -> String {
    path.display().to_string()
}
