//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The Rust struct representing the KDL schema
//! - Conversion to and from KDL documents
//! - Validation and merging of partial configs

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// standards-dir "~/checkwright/configs"
/// default-save-path "~/Desktop"
/// tester-name "QuickUser"
/// adhoc-prefix "ADHOC"
/// targets "UAV" "GCS"
/// output-format "human"  // or "json"
/// action-log #true
/// action-log-path "~/.local/share/checkwright/action.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckwrightConfig {
    /// Directory holding standard definition files
    pub standards_dir: Option<String>,

    /// Parent folder for new projects
    pub default_save_path: Option<String>,

    /// Tester name pre-filled into ad-hoc projects
    pub tester_name: Option<String>,

    /// Prefix for generated ad-hoc project numbers
    pub adhoc_prefix: Option<String>,

    /// Physical targets in scan order
    pub targets: Option<Vec<String>>,

    pub output_format: Option<OutputFormat>,

    /// Whether CLI invocations are appended to the action log
    pub action_log: Option<bool>,

    pub action_log_path: Option<String>,

    /// Values present in the file but rejected while parsing
    #[serde(skip)]
    pub invalid: Vec<String>,
}

impl CheckwrightConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(problem) = self.invalid.first() {
            return Err(problem.clone());
        }
        for (key, value) in [
            ("tester-name", &self.tester_name),
            ("adhoc-prefix", &self.adhoc_prefix),
            ("standards-dir", &self.standards_dir),
            ("default-save-path", &self.default_save_path),
        ] {
            if value.as_ref().is_some_and(|v| v.trim().is_empty()) {
                return Err(format!("{} must not be empty", key));
            }
        }
        if let Some(targets) = &self.targets {
            if targets.is_empty() {
                return Err("targets must list at least one target".to_string());
            }
            if targets.iter().any(|t| t.is_empty() || t == crate::models::META_KEY) {
                return Err(format!("targets contains an invalid name: {:?}", targets));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        config.standards_dir = string_value(doc, "standards-dir");
        config.default_save_path = string_value(doc, "default-save-path");
        config.tester_name = string_value(doc, "tester-name");
        config.adhoc_prefix = string_value(doc, "adhoc-prefix");
        config.action_log_path = string_value(doc, "action-log-path");

        if let Some(node) = doc.get("targets") {
            let targets: Vec<String> = node
                .entries()
                .iter()
                .filter_map(|entry| entry.value().as_string().map(String::from))
                .collect();
            config.targets = Some(targets);
        }

        if let Some(s) = string_value(doc, "output-format") {
            match OutputFormat::parse(&s) {
                Some(format) => config.output_format = Some(format),
                None => config
                    .invalid
                    .push(format!("output-format must be json or human, got {}", s)),
            }
        }

        if let Some(node) = doc.get("action-log") {
            if let Some(entry) = node.entries().first() {
                match entry.value().as_bool() {
                    Some(b) => config.action_log = Some(b),
                    None => config
                        .invalid
                        .push("action-log must be #true or #false".to_string()),
                }
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        push_string(&mut doc, "standards-dir", &self.standards_dir);
        push_string(&mut doc, "default-save-path", &self.default_save_path);
        push_string(&mut doc, "tester-name", &self.tester_name);
        push_string(&mut doc, "adhoc-prefix", &self.adhoc_prefix);

        if let Some(ref targets) = self.targets {
            let mut node = KdlNode::new("targets");
            for target in targets {
                node.push(KdlEntry::new(KdlValue::String(target.clone())));
            }
            doc.nodes_mut().push(node);
        }

        if let Some(ref format) = self.output_format {
            let mut node = KdlNode::new("output-format");
            node.push(KdlEntry::new(KdlValue::String(format.as_str().to_string())));
            doc.nodes_mut().push(node);
        }

        if let Some(enabled) = self.action_log {
            let mut node = KdlNode::new("action-log");
            node.push(KdlEntry::new(KdlValue::Bool(enabled)));
            doc.nodes_mut().push(node);
        }

        push_string(&mut doc, "action-log-path", &self.action_log_path);

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &CheckwrightConfig) {
        fn take<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
            if other.is_some() {
                *slot = other.clone();
            }
        }
        take(&mut self.standards_dir, &other.standards_dir);
        take(&mut self.default_save_path, &other.default_save_path);
        take(&mut self.tester_name, &other.tester_name);
        take(&mut self.adhoc_prefix, &other.adhoc_prefix);
        take(&mut self.targets, &other.targets);
        take(&mut self.output_format, &other.output_format);
        take(&mut self.action_log, &other.action_log);
        take(&mut self.action_log_path, &other.action_log_path);
        self.invalid.extend(other.invalid.iter().cloned());
    }
}

fn string_value(doc: &KdlDocument, key: &str) -> Option<String> {
    doc.get(key)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(String::from)
}

fn push_string(doc: &mut KdlDocument, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        let mut node = KdlNode::new(key);
        node.push(KdlEntry::new(KdlValue::String(value.clone())));
        doc.nodes_mut().push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> CheckwrightConfig {
        let doc: KdlDocument = content.parse().unwrap();
        CheckwrightConfig::from_kdl(&doc)
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("xml"), None);
    }

    #[test]
    fn test_config_from_kdl_empty() {
        let config = parse("");
        assert_eq!(config, CheckwrightConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let config = parse(
            r#"
            standards-dir "~/checkwright/configs"
            default-save-path "/srv/projects"
            tester-name "Kim"
            adhoc-prefix "FIELD"
            targets "UAV" "GCS" "RC"
            output-format "human"
            action-log #false
            action-log-path "/tmp/cw.log"
            "#,
        );
        assert_eq!(config.standards_dir.as_deref(), Some("~/checkwright/configs"));
        assert_eq!(config.default_save_path.as_deref(), Some("/srv/projects"));
        assert_eq!(config.tester_name.as_deref(), Some("Kim"));
        assert_eq!(config.adhoc_prefix.as_deref(), Some("FIELD"));
        assert_eq!(
            config.targets,
            Some(vec!["UAV".to_string(), "GCS".to_string(), "RC".to_string()])
        );
        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.action_log, Some(false));
        assert_eq!(config.action_log_path.as_deref(), Some("/tmp/cw.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_rejects_bad_values() {
        assert!(parse(r#"output-format "xml""#).validate().is_err());
        assert!(parse("targets").validate().is_err());
        assert!(parse(r#"targets "__meta__""#).validate().is_err());
        assert!(parse(r#"tester-name " ""#).validate().is_err());
        assert!(parse(r#"action-log "yes""#).validate().is_err());
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = CheckwrightConfig {
            standards_dir: Some("/etc/cw".to_string()),
            targets: Some(vec!["UAV".to_string()]),
            output_format: Some(OutputFormat::Json),
            action_log: Some(true),
            ..Default::default()
        };
        let doc = config.to_kdl();
        let reparsed: KdlDocument = doc.to_string().parse().unwrap();
        assert_eq!(CheckwrightConfig::from_kdl(&reparsed), config);
    }

    #[test]
    fn test_config_merge() {
        let mut base = CheckwrightConfig {
            tester_name: Some("QuickUser".to_string()),
            adhoc_prefix: Some("ADHOC".to_string()),
            ..Default::default()
        };
        let other = CheckwrightConfig {
            tester_name: Some("Kim".to_string()),
            ..Default::default()
        };
        base.merge(&other);
        assert_eq!(base.tester_name.as_deref(), Some("Kim"));
        assert_eq!(base.adhoc_prefix.as_deref(), Some("ADHOC"));
    }
}
