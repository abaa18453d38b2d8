//! Common test utilities for checkwright integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never touch the
//! user's config, standards or Desktop.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Version 1.0 of the sample standard.
pub const STANDARD_V1: &str = r#"{
    "standard_name": "Drone Security",
    "standard_version": "1.0",
    "project_meta_schema": [
        {"key": "project_name", "type": "text"},
        {"key": "tester", "type": "text"},
        {"key": "test_date", "type": "date"}
    ],
    "test_standards": [
        {"section_id": "1", "section_name": "Hardware", "items": [
            {"id": "1.1", "uid": "U1", "name": "Casing", "criteria_version": "1.0", "targets": ["UAV", "GCS"]},
            {"id": "1.2", "uid": "U2", "name": "Ports", "criteria_version": "1.0"}
        ]},
        {"section_id": "2", "section_name": "Software", "items": [
            {"id": "2.1", "uid": "U3", "name": "Firmware", "criteria_version": "1.0"}
        ]}
    ]
}"#;

/// Version 2.0: U1 unchanged, U2 re-versioned, U3 dropped, U4 added.
pub const STANDARD_V2: &str = r#"{
    "standard_name": "Drone Security",
    "standard_version": "2.0",
    "test_standards": [
        {"section_id": "1", "section_name": "Hardware", "items": [
            {"id": "1.1", "uid": "U1", "name": "Casing", "criteria_version": "1.0", "targets": ["UAV", "GCS"]},
            {"id": "1.2", "uid": "U2", "name": "Ports", "criteria_version": "1.1"}
        ]},
        {"section_id": "3", "section_name": "Radio", "items": [
            {"id": "3.1", "uid": "U4", "name": "Link encryption", "criteria_version": "1.0"}
        ]}
    ]
}"#;

/// A test environment with its own standards directory, project parent
/// folder and config file.
///
/// The `cw()` method returns a `Command` wired to those directories through
/// environment variables, making tests parallel-safe.
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    /// Create a new environment holding the two sample standards.
    pub fn new() -> Self {
        let env = Self {
            root: TempDir::new().unwrap(),
        };
        fs::create_dir_all(env.standards_dir()).unwrap();
        fs::create_dir_all(env.projects_dir()).unwrap();
        fs::create_dir_all(env.root.path().join("home")).unwrap();
        env.write_standard("drone_v1.json", STANDARD_V1);
        env.write_standard("drone_v2.json", STANDARD_V2);
        env.write_config("action-log #false\n");
        env
    }

    /// Get a Command for the cw binary inside this environment.
    pub fn cw(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cw"));
        cmd.current_dir(self.root.path());
        cmd.env("CW_CONFIG", self.config_path());
        cmd.env("CW_STANDARDS_DIR", self.standards_dir());
        cmd.env("HOME", self.root.path().join("home"));
        cmd.env_remove("CW_PROJECT");
        cmd.env_remove("CW_LOG");
        cmd
    }

    /// `cw -C <project> ...`
    pub fn cw_in(&self, project: &Path) -> Command {
        let mut cmd = self.cw();
        cmd.arg("-C").arg(project);
        cmd
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn standards_dir(&self) -> PathBuf {
        self.root.path().join("standards")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.path().join("projects")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("config.kdl")
    }

    pub fn standard_path(&self, file: &str) -> PathBuf {
        self.standards_dir().join(file)
    }

    pub fn write_standard(&self, file: &str, contents: &str) -> PathBuf {
        let path = self.standard_path(file);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Replace config.kdl; `default-save-path` always points at the projects folder.
    pub fn write_config(&self, extra: &str) {
        let contents = format!(
            "default-save-path \"{}\"\n{}",
            self.projects_dir().display(),
            extra
        );
        fs::write(self.config_path(), contents).unwrap();
    }

    /// Create a full project from version 1.0 and return its folder.
    pub fn create_project(&self, name: &str) -> PathBuf {
        let v1 = self.standard_path("drone_v1.json");
        let out = self
            .cw()
            .args(["project", "create", name, "-s"])
            .arg(&v1)
            .assert()
            .success();
        path_of(&json(&out.get_output().stdout))
    }

    /// Create an ad-hoc project for `items` from version 1.0 and return its folder.
    pub fn create_quick(&self, items: &[&str]) -> PathBuf {
        let v1 = self.standard_path("drone_v1.json");
        let out = self
            .cw()
            .args(["project", "quick"])
            .args(items)
            .arg("-s")
            .arg(&v1)
            .assert()
            .success();
        path_of(&json(&out.get_output().stdout))
    }

    /// Run `cw -C <project> <args>` expecting success and parse its JSON output.
    pub fn run_json(&self, project: &Path, args: &[&str]) -> Value {
        let out = self.cw_in(project).args(args).assert().success();
        json(&out.get_output().stdout)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse stdout as one JSON value.
pub fn json(stdout: &[u8]) -> Value {
    serde_json::from_slice(stdout).unwrap()
}

pub fn path_of(value: &Value) -> PathBuf {
    PathBuf::from(value["path"].as_str().unwrap())
}

/// The project document of `project`.
pub fn read_project(project: &Path) -> Value {
    let raw = fs::read_to_string(project.join("project_settings.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}
