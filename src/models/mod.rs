//! Data models for checkwright project documents.
//!
//! This module defines the structures persisted in `project_settings.json`:
//! - `Project` - Root document bound to one checklist standard
//! - `ProjectInfo` - Schema-driven metadata with typed reserved keys
//! - `TestEntry` - Per-item results keyed by target, plus the `__meta__` record
//! - `TargetResult` - One judgement with its evidence attachments
//! - `MigrationReportRow` - Classification of an item between two standard versions

pub mod standard;

pub use standard::{ChecklistItem, MetaField, Section, StandardDefinition};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Reserved key inside a test entry holding [`EntryMeta`].
pub const META_KEY: &str = "__meta__";

/// Synthetic target used by the UI when one judgement covers every target.
pub const SHARED_TARGET: &str = "Shared";

pub const TARGET_UAV: &str = "UAV";
pub const TARGET_GCS: &str = "GCS";

/// Target scan order used when no configuration overrides it.
pub const DEFAULT_TARGETS: [&str; 2] = [TARGET_UAV, TARGET_GCS];

/// How a project is scoped against its standard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    /// Scoped by checklist sections (`test_scope`)
    #[default]
    Full,
    /// Scoped by an explicit item whitelist (`target_items`)
    AdHoc,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Full => "full",
            ProjectType::AdHoc => "ad_hoc",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(ProjectType::Full),
            "ad_hoc" => Ok(ProjectType::AdHoc),
            _ => Err(Error::Validation(format!("Unknown project type: {}", s))),
        }
    }
}

/// Input widget kinds a standard's metadata schema may declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Date,
    CheckboxGroup,
    PathSelector,
    #[serde(other)]
    Unknown,
}

impl FieldKind {
    /// Initial value for a freshly created project.
    ///
    /// `today` is the formatted current date, used for `Date` fields.
    pub fn default_value(&self, today: &str) -> InfoValue {
        match self {
            FieldKind::Date => InfoValue::Text(today.to_string()),
            FieldKind::CheckboxGroup => InfoValue::Choices(Vec::new()),
            FieldKind::PathSelector => InfoValue::Text(String::new()),
            FieldKind::Text => InfoValue::Text("-".to_string()),
            FieldKind::Unknown => InfoValue::Text(String::new()),
        }
    }
}

/// A value stored under an externally defined `info` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    /// Text, date and path-selector fields
    Text(String),
    /// Checkbox-group selections
    Choices(Vec<String>),
    Flag(bool),
    Number(serde_json::Number),
    /// Anything else the schema produced (objects, mixed arrays, null)
    Raw(Value),
}

impl InfoValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InfoValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            InfoValue::Choices(v) => Some(v),
            _ => None,
        }
    }

    /// Parse a CLI `key=value` right-hand side.
    ///
    /// Comma-separated values become `Choices`, `true`/`false` become
    /// `Flag`, anything else stays `Text`.
    pub fn from_cli(raw: &str) -> Self {
        match raw {
            "true" => InfoValue::Flag(true),
            "false" => InfoValue::Flag(false),
            "[]" => InfoValue::Choices(Vec::new()),
            _ if raw.contains(',') => InfoValue::Choices(
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => InfoValue::Text(raw.to_string()),
        }
    }
}

impl From<&str> for InfoValue {
    fn from(s: &str) -> Self {
        InfoValue::Text(s.to_string())
    }
}

impl From<String> for InfoValue {
    fn from(s: String) -> Self {
        InfoValue::Text(s)
    }
}

impl From<Vec<String>> for InfoValue {
    fn from(v: Vec<String>) -> Self {
        InfoValue::Choices(v)
    }
}

/// Project metadata. Reserved keys are typed; everything else lives in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Absent in legacy documents, which are treated as full projects
    #[serde(default)]
    pub project_type: ProjectType,

    /// Sections in scope for a full project.
    ///
    /// `None` (key absent) means every section; `Some([])` means none.
    #[serde(
        default,
        deserialize_with = "opt_lenient_strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub test_scope: Option<Vec<String>>,

    /// Item UIDs in scope for an ad-hoc project
    #[serde(
        default,
        deserialize_with = "opt_lenient_strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_items: Option<Vec<String>>,

    #[serde(flatten)]
    pub fields: BTreeMap<String, InfoValue>,
}

impl ProjectInfo {
    /// Keys stored in typed slots rather than in `fields`.
    pub const RESERVED_KEYS: [&'static str; 3] = ["project_type", "test_scope", "target_items"];

    pub fn is_reserved(key: &str) -> bool {
        Self::RESERVED_KEYS.contains(&key)
    }

    /// Set one key, routing reserved keys into their typed slots.
    pub fn set(&mut self, key: &str, value: InfoValue) -> Result<()> {
        match key {
            "project_type" => {
                let raw = value.as_text().ok_or_else(|| {
                    Error::Validation("project_type must be a string".to_string())
                })?;
                self.project_type = raw.parse()?;
            }
            "test_scope" => self.test_scope = reserved_list(key, value)?,
            "target_items" => self.target_items = reserved_list(key, value)?,
            _ => {
                self.fields.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Apply every entry of `patch`, stopping at the first invalid one.
    pub fn merge(&mut self, patch: BTreeMap<String, InfoValue>) -> Result<()> {
        for (key, value) in patch {
            self.set(&key, value)?;
        }
        Ok(())
    }

    pub fn field(&self, key: &str) -> Option<&InfoValue> {
        self.fields.get(key)
    }

    pub fn project_name(&self) -> Option<&str> {
        self.field("project_name").and_then(InfoValue::as_text)
    }
}

/// `Choices` sets a reserved list, `null` removes the key entirely.
fn reserved_list(key: &str, value: InfoValue) -> Result<Option<Vec<String>>> {
    match value {
        InfoValue::Choices(v) => Ok(Some(v)),
        InfoValue::Raw(Value::Null) => Ok(None),
        InfoValue::Raw(Value::Array(items)) if items.is_empty() => Ok(Some(Vec::new())),
        _ => Err(Error::Validation(format!("{} must be a list of strings", key))),
    }
}

/// Accept numbers where strings are expected; section IDs are often numeric.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(value).map_err(serde::de::Error::custom)
}

fn opt_lenient_strings<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    raw.map(|items| {
        items
            .into_iter()
            .map(value_to_string)
            .collect::<std::result::Result<Vec<_>, _>>()
    })
    .transpose()
    .map_err(serde::de::Error::custom)
}

fn value_to_string(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected string or number, got {}", other)),
    }
}

/// Stored judgement of a target.
///
/// Serialized as its tag (`UNCHECKED`, `PASS`, `FAIL`, `NA`). Localized
/// labels written by older releases are mapped to the tag on read; any other
/// raw value is preserved as `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    #[default]
    Unchecked,
    Pass,
    Fail,
    Na,
    Other(String),
}

impl ResultStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "UNCHECKED" | "未判定" => ResultStatus::Unchecked,
            "PASS" | "合格 (Pass)" => ResultStatus::Pass,
            "FAIL" | "不合格 (Fail)" => ResultStatus::Fail,
            "NA" | "N/A" | "不適用 (N/A)" => ResultStatus::Na,
            other => ResultStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResultStatus::Unchecked => "UNCHECKED",
            ResultStatus::Pass => "PASS",
            ResultStatus::Fail => "FAIL",
            ResultStatus::Na => "NA",
            ResultStatus::Other(s) => s,
        }
    }

    /// Display-side status for this stored value.
    pub fn item_status(&self) -> ItemStatus {
        match self {
            ResultStatus::Unchecked => ItemStatus::NotTested,
            ResultStatus::Pass => ItemStatus::Pass,
            ResultStatus::Fail => ItemStatus::Fail,
            ResultStatus::Na => ItemStatus::Na,
            ResultStatus::Other(_) => ItemStatus::Unknown,
        }
    }
}

impl From<String> for ResultStatus {
    fn from(s: String) -> Self {
        ResultStatus::parse(&s)
    }
}

impl From<ResultStatus> for String {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ResultStatus {
    type Err = Error;

    /// Strict, case-insensitive parse used for user input.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "unchecked" => Ok(ResultStatus::Unchecked),
            "pass" => Ok(ResultStatus::Pass),
            "fail" => Ok(ResultStatus::Fail),
            "na" | "n/a" => Ok(ResultStatus::Na),
            _ => Err(Error::Validation(format!(
                "Unknown result '{}' (expected pass, fail, na or unchecked)",
                s
            ))),
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-target status shown to the tester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    NotTested,
    Pass,
    Fail,
    Na,
    Unknown,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::NotTested => "Not tested",
            ItemStatus::Pass => "Pass",
            ItemStatus::Fail => "Fail",
            ItemStatus::Na => "N/A",
            ItemStatus::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    #[default]
    Image,
    File,
    Log,
}

impl FromStr for AttachmentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(AttachmentKind::Image),
            "file" => Ok(AttachmentKind::File),
            "log" => Ok(AttachmentKind::Log),
            _ => Err(Error::Validation(format!("Unknown attachment type: {}", s))),
        }
    }
}

/// Evidence file referenced by a result. Paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", default)]
    pub kind: AttachmentKind,

    pub path: String,

    #[serde(default)]
    pub title: String,

    /// Producer-specific fields, e.g. the command that generated a log
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Attachment {
    pub fn new(kind: AttachmentKind, path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            title: title.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// One recorded judgement for a single target of an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    /// Tick state of each sub-criterion
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub criteria: BTreeMap<String, bool>,

    /// Judgement rationale
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default)]
    pub result: ResultStatus,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Criteria version of the item when this result was judged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_version_snapshot: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Tool-specific output (scan text, auto-suggestions, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    #[serde(default)]
    pub is_shared: bool,
}

/// All results recorded for one checklist item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    #[serde(rename = "__meta__", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EntryMeta>,

    #[serde(flatten)]
    pub targets: BTreeMap<String, TargetResult>,
}

impl TestEntry {
    pub fn is_shared(&self) -> bool {
        self.meta.map(|m| m.is_shared).unwrap_or(false)
    }
}

/// Root document of a project folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub standard_name: String,

    #[serde(default)]
    pub standard_version: String,

    #[serde(default)]
    pub info: ProjectInfo,

    #[serde(default)]
    pub tests: BTreeMap<String, TestEntry>,
}

impl Project {
    pub fn new(
        standard_name: impl Into<String>,
        standard_version: impl Into<String>,
        info: ProjectInfo,
    ) -> Self {
        Self {
            standard_name: standard_name.into(),
            standard_version: standard_version.into(),
            info,
            tests: BTreeMap::new(),
        }
    }

    pub fn project_type(&self) -> ProjectType {
        self.info.project_type
    }

    pub fn result(&self, uid: &str, target: &str) -> Option<&TargetResult> {
        self.tests.get(uid).and_then(|entry| entry.targets.get(target))
    }
}

/// Outcome of comparing one item across two standard versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationStatus {
    /// Item only exists in the new standard
    New,
    /// Criteria version unchanged; results carry over
    Match,
    /// Criteria version changed; results must be re-judged
    Reset,
    /// Item no longer exists in the new standard
    Remove,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationStatus::New => "NEW",
            MigrationStatus::Match => "MATCH",
            MigrationStatus::Reset => "RESET",
            MigrationStatus::Remove => "REMOVE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReportRow {
    pub uid: String,
    pub name: String,
    pub status: MigrationStatus,
    pub message: String,
}
