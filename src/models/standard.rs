//! Checklist standard definitions.
//!
//! A standard is an externally maintained JSON document listing sections and
//! their items. Only the fields the project store reasons about are typed;
//! rendering hints (handlers, criteria text, logic) are kept in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::{FieldKind, TARGET_GCS, lenient_string};

/// One entry of the standard's project metadata schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaField {
    pub key: String,

    #[serde(rename = "type", default)]
    pub kind: FieldKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A checklist item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Human-readable identifier; may change between versions
    #[serde(default)]
    pub id: String,

    /// Stable cross-version identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_version: Option<String>,

    /// Physical targets judged separately for this item
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_targets() -> Vec<String> {
    vec![TARGET_GCS.to_string()]
}

impl ChecklistItem {
    /// Key under which results for this item are stored (UID, else ID).
    pub fn key(&self) -> &str {
        self.uid.as_deref().unwrap_or(&self.id)
    }

    pub fn matches(&self, identifier: &str) -> bool {
        self.id == identifier || self.uid.as_deref() == Some(identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(deserialize_with = "lenient_string")]
    pub section_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,

    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

/// A complete checklist standard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardDefinition {
    #[serde(default)]
    pub standard_name: String,

    #[serde(default)]
    pub standard_version: String,

    #[serde(default)]
    pub project_meta_schema: Vec<MetaField>,

    #[serde(default)]
    pub test_standards: Vec<Section>,
}

impl StandardDefinition {
    /// Every item in section order, then item order.
    pub fn items(&self) -> impl Iterator<Item = (&Section, &ChecklistItem)> {
        self.test_standards
            .iter()
            .flat_map(|section| section.items.iter().map(move |item| (section, item)))
    }

    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.test_standards
            .iter()
            .find(|section| section.section_id == section_id)
    }

    pub fn item_by_uid(&self, uid: &str) -> Option<&ChecklistItem> {
        self.items()
            .map(|(_, item)| item)
            .find(|item| item.uid.as_deref() == Some(uid))
    }

    /// First item whose `id` or `uid` equals `identifier`.
    pub fn find_item(&self, identifier: &str) -> Option<(&Section, &ChecklistItem)> {
        self.items().find(|(_, item)| item.matches(identifier))
    }
}
