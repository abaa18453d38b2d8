//! Checkwright - inspection project records and checklist-standard migration.
//!
//! This library provides the core functionality for the `cw` CLI tool:
//! the project document store, visibility scoping, migration between
//! standard versions, and merging of ad-hoc projects.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod merge;
pub mod migration;
pub mod models;
pub mod standards;
pub mod storage;
pub mod visibility;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    use crate::models::StandardDefinition;
    use crate::storage::{ProjectForm, ProjectStore, StoreSettings};

    /// Test environment with an isolated directory for project folders.
    pub struct TestEnv {
        pub dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }

        /// A store bound to `standard` with default settings.
        pub fn store(&self, standard: &StandardDefinition) -> ProjectStore {
            let mut store = ProjectStore::new(StoreSettings::default());
            store.set_standard(standard.clone());
            store
        }

        /// Create a full project named `name` and return the store holding it.
        pub fn full_project(
            &self,
            standard: &StandardDefinition,
            name: &str,
            scope: Option<Vec<&str>>,
        ) -> (ProjectStore, PathBuf) {
            let mut store = self.store(standard);
            let mut form = ProjectForm::new(self.path(), name);
            form.test_scope = scope.map(|s| s.into_iter().map(String::from).collect());
            let path = store.create(form).unwrap();
            (store, path)
        }

        /// Write a file below the environment root, creating parents.
        pub fn write_file(&self, rel: &str, contents: &str) -> PathBuf {
            let path = self.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, contents).unwrap();
            path
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Two-section standard used across unit tests.
    pub fn standard(version: &str, items: serde_json::Value) -> StandardDefinition {
        serde_json::from_value(serde_json::json!({
            "standard_name": "Drone Security",
            "standard_version": version,
            "project_meta_schema": [
                {"key": "project_name", "type": "text"},
                {"key": "project_no", "type": "text"},
                {"key": "tester", "type": "text"},
                {"key": "location", "type": "text"},
                {"key": "test_date", "type": "date"},
                {"key": "standards", "type": "checkbox_group"},
                {"key": "photo_dir", "type": "path_selector"}
            ],
            "test_standards": items
        }))
        .unwrap()
    }

    /// The default sample: section 1 holds U1/U2, section 2 holds U3.
    pub fn sample_standard() -> StandardDefinition {
        standard(
            "1.0",
            serde_json::json!([
                {"section_id": "1", "items": [
                    {"id": "1.1", "uid": "U1", "name": "Casing", "criteria_version": "1.0", "targets": ["UAV", "GCS"]},
                    {"id": "1.2", "uid": "U2", "name": "Ports", "criteria_version": "1.0"}
                ]},
                {"section_id": "2", "items": [
                    {"id": "2.1", "uid": "U3", "name": "Firmware", "criteria_version": "1.0"}
                ]}
            ]),
        )
    }
}

/// Library-level error type for checkwright operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing required field, malformed standard, missing UID
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Merge or migration rejected because the inputs do not fit together
    #[error("Incompatible: {0}")]
    Incompatible(String),

    #[error("No project is open")]
    NoProject,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for checkwright operations.
pub type Result<T> = std::result::Result<T, Error>;
