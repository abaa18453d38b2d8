//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags and their environment variables (passed at runtime)
//! 2. config.kdl (`$CW_CONFIG`, else `~/.config/checkwright/config.kdl`)
//! 3. Built-in defaults

use serde::Serialize;
use std::path::PathBuf;

use super::{CheckwrightConfig, OutputFormat, expand_home};
use crate::models::DEFAULT_TARGETS;
use crate::storage::StoreSettings;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from config.kdl at this path
    ConfigFile(String),
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::ConfigFile(path) => write!(f, "config:{}", path),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub standards_dir: Resolved<PathBuf>,
    pub default_save_path: Resolved<PathBuf>,
    pub tester_name: Resolved<String>,
    pub adhoc_prefix: Resolved<String>,
    pub targets: Resolved<Vec<String>>,
    pub output_format: Resolved<OutputFormat>,
    pub action_log: Resolved<bool>,
    pub action_log_path: Resolved<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let defaults = StoreSettings::default();
        Self {
            standards_dir: Resolved::new(
                expand_home("~/checkwright/configs"),
                ValueSource::Default,
            ),
            default_save_path: Resolved::new(expand_home("~/Desktop"), ValueSource::Default),
            tester_name: Resolved::new(defaults.tester_name, ValueSource::Default),
            adhoc_prefix: Resolved::new(defaults.adhoc_prefix, ValueSource::Default),
            targets: Resolved::new(
                DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
                ValueSource::Default,
            ),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
            action_log_path: Resolved::new(
                expand_home("~/.local/share/checkwright/action.log"),
                ValueSource::Default,
            ),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    /// Settings handed to the project store.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            known_targets: self.targets.value.clone(),
            tester_name: self.tester_name.value.clone(),
            adhoc_prefix: self.adhoc_prefix.value.clone(),
        }
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub standards_dir: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_standards_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.standards_dir = Some(dir.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Resolve configuration with full precedence chain.
///
/// `origin` names the file `file` was read from, for source tracking.
pub fn resolve_config(
    file: &CheckwrightConfig,
    origin: &str,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();
    let from_file = || ValueSource::ConfigFile(origin.to_string());

    if let Some(ref dir) = overrides.standards_dir {
        result.standards_dir = Resolved::new(expand_home(dir), ValueSource::CliFlag);
    } else if let Some(ref dir) = file.standards_dir {
        result.standards_dir = Resolved::new(expand_home(dir), from_file());
    }

    if let Some(ref path) = file.default_save_path {
        result.default_save_path = Resolved::new(expand_home(path), from_file());
    }
    if let Some(ref name) = file.tester_name {
        result.tester_name = Resolved::new(name.clone(), from_file());
    }
    if let Some(ref prefix) = file.adhoc_prefix {
        result.adhoc_prefix = Resolved::new(prefix.clone(), from_file());
    }
    if let Some(ref targets) = file.targets {
        result.targets = Resolved::new(targets.clone(), from_file());
    }

    if let Some(ref format) = overrides.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::CliFlag);
    } else if let Some(ref format) = file.output_format {
        result.output_format = Resolved::new(format.clone(), from_file());
    }

    if let Some(enabled) = file.action_log {
        result.action_log = Resolved::new(enabled, from_file());
    }
    if let Some(ref path) = file.action_log_path {
        result.action_log_path = Resolved::new(expand_home(path), from_file());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_config_defaults() {
        let config = resolve_config(&CheckwrightConfig::default(), "none", &ConfigOverrides::new());

        assert_eq!(*config.output_format(), OutputFormat::Json);
        assert_eq!(config.output_format.source, ValueSource::Default);
        assert_eq!(config.targets.value, vec!["UAV".to_string(), "GCS".to_string()]);
        assert!(config.action_log.value);
        assert_eq!(config.store_settings(), StoreSettings::default());
    }

    #[test]
    fn test_resolve_config_from_file() {
        let file = CheckwrightConfig {
            tester_name: Some("Kim".to_string()),
            targets: Some(vec!["GCS".to_string()]),
            output_format: Some(OutputFormat::Human),
            standards_dir: Some("/etc/cw".to_string()),
            ..Default::default()
        };
        let config = resolve_config(&file, "/home/kim/config.kdl", &ConfigOverrides::new());

        assert_eq!(config.tester_name.value, "Kim");
        assert_eq!(
            config.tester_name.source,
            ValueSource::ConfigFile("/home/kim/config.kdl".to_string())
        );
        assert_eq!(config.standards_dir.value, PathBuf::from("/etc/cw"));
        assert_eq!(config.store_settings().known_targets, vec!["GCS".to_string()]);
        assert_eq!(config.adhoc_prefix.source, ValueSource::Default);
    }

    #[test]
    fn test_resolve_config_cli_overrides_file() {
        let file = CheckwrightConfig {
            output_format: Some(OutputFormat::Json),
            standards_dir: Some("/etc/cw".to_string()),
            ..Default::default()
        };
        let overrides = ConfigOverrides::new()
            .with_output_format(OutputFormat::Human)
            .with_standards_dir("/tmp/standards");

        let config = resolve_config(&file, "config.kdl", &overrides);
        assert_eq!(*config.output_format(), OutputFormat::Human);
        assert_eq!(config.output_format.source, ValueSource::CliFlag);
        assert_eq!(config.standards_dir.value, PathBuf::from("/tmp/standards"));
        assert_eq!(config.standards_dir.source, ValueSource::CliFlag);
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::CliFlag.to_string(), "cli");
        assert_eq!(ValueSource::Default.to_string(), "default");
        assert_eq!(
            ValueSource::ConfigFile("/a/config.kdl".to_string()).to_string(),
            "config:/a/config.kdl"
        );
    }
}
