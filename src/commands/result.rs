//! Judgement and evidence commands.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{Context, Output, display, require_standard, split_pair};
use crate::models::{Attachment, AttachmentKind, ItemStatus, ResultStatus, TargetResult};
use crate::storage::{DIR_REPORTS, EvidenceDir, ProjectStore};
use crate::{Error, Result};

/// Options for `result set`.
#[derive(Debug, Default)]
pub struct ResultOptions {
    pub uid: String,
    pub target: Option<String>,
    pub shared: bool,
    pub status: String,
    pub description: Option<String>,
    pub criteria: Vec<String>,
    pub attachments: Vec<String>,
}

#[derive(Serialize)]
pub struct ResultRecorded {
    pub uid: String,
    pub targets: Vec<String>,
    pub result: ResultStatus,
    pub shared: bool,
}

impl Output for ResultRecorded {
    fn to_human(&self) -> String {
        format!(
            "{} -> {} for {}{}",
            self.uid,
            self.result,
            self.targets.join(", "),
            if self.shared { " (shared)" } else { "" }
        )
    }
}

/// Record a judgement. `--shared` writes the same judgement to every target
/// of the item, one persisted update per target.
pub fn result_set(ctx: &Context, opts: ResultOptions) -> Result<ResultRecorded> {
    let status: ResultStatus = opts.status.parse()?;
    let criteria = parse_criteria(&opts.criteria)?;
    let mut store = ctx.open_project()?;

    let item = store
        .standard()
        .and_then(|std| std.item_by_uid(&opts.uid))
        .cloned();
    let targets = match (&opts.target, opts.shared) {
        (_, true) => {
            let item = item.as_ref().ok_or_else(|| match require_standard(&store) {
                Ok(_) => Error::NotFound(format!("item {}", opts.uid)),
                Err(e) => e,
            })?;
            item.targets.clone()
        }
        (Some(target), false) => vec![target.clone()],
        (None, false) => {
            return Err(Error::Validation(
                "a target or --shared is required".to_string(),
            ));
        }
    };
    let version = item.as_ref().and_then(|i| i.criteria_version.clone());

    for target in &targets {
        let mut result = store.result(&opts.uid, target).cloned().unwrap_or_default();
        result.result = status.clone();
        if let Some(ref description) = opts.description {
            result.description = description.clone();
        }
        result.criteria.extend(criteria.clone());
        for path in &opts.attachments {
            result.attachments.push(attachment_for(path, ""));
        }
        if version.is_some() {
            result.criteria_version_snapshot = version.clone();
        }
        store.update_result(&opts.uid, target, result, opts.shared)?;
    }

    Ok(ResultRecorded {
        uid: opts.uid,
        targets,
        result: status,
        shared: opts.shared,
    })
}

fn parse_criteria(raw: &[String]) -> Result<BTreeMap<String, bool>> {
    raw.iter()
        .map(|pair| {
            let (name, value) = split_pair(pair)?;
            let checked = value.parse::<bool>().map_err(|_| {
                Error::Validation(format!("criterion {} must be true or false", name))
            })?;
            Ok((name.to_string(), checked))
        })
        .collect()
}

/// Attachment for a project-relative path; the folder decides the kind.
fn attachment_for(path: &str, title: &str) -> Attachment {
    let kind = if path.starts_with(&format!("{}/", DIR_REPORTS)) {
        if path.ends_with(".log") || path.ends_with(".txt") {
            AttachmentKind::Log
        } else {
            AttachmentKind::File
        }
    } else {
        AttachmentKind::Image
    };
    Attachment::new(kind, path, title)
}

#[derive(Serialize)]
pub struct ResultShown {
    pub uid: String,
    pub is_shared: bool,
    pub targets: BTreeMap<String, TargetResult>,
}

impl Output for ResultShown {
    fn to_human(&self) -> String {
        if self.targets.is_empty() {
            return format!("{}: no results recorded", self.uid);
        }
        let mut lines = vec![format!(
            "{}{}",
            self.uid,
            if self.is_shared { " (shared)" } else { "" }
        )];
        for (target, result) in &self.targets {
            lines.push(format!("  {}: {}", target, result.result));
            if !result.description.is_empty() {
                lines.push(format!("    {}", result.description.replace('\n', "\n    ")));
            }
            for att in &result.attachments {
                lines.push(format!("    [{:?}] {}", att.kind, att.path));
            }
            if let Some(ref version) = result.criteria_version_snapshot {
                lines.push(format!("    criteria version {}", version));
            }
        }
        lines.join("\n")
    }
}

pub fn result_show(ctx: &Context, uid: &str) -> Result<ResultShown> {
    let store = ctx.open_project()?;
    let (_, project) = store.require()?;
    let entry = project.tests.get(uid);
    Ok(ResultShown {
        uid: uid.to_string(),
        is_shared: entry.is_some_and(|e| e.is_shared()),
        targets: entry.map(|e| e.targets.clone()).unwrap_or_default(),
    })
}

#[derive(Serialize)]
pub struct ItemStatusReport {
    pub uid: String,
    pub name: String,
    pub visible: bool,
    pub status: BTreeMap<String, ItemStatus>,
    pub completed: bool,
}

impl Output for ItemStatusReport {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{} {}{}",
            self.uid,
            self.name,
            if self.visible { "" } else { " (out of scope)" }
        )];
        for (target, status) in &self.status {
            lines.push(format!("  {}: {}", target, status));
        }
        lines.push(format!(
            "  {}",
            if self.completed { "Complete" } else { "Incomplete" }
        ));
        lines.join("\n")
    }
}

pub fn result_status(ctx: &Context, uid: &str) -> Result<ItemStatusReport> {
    let store = ctx.open_project()?;
    let standard = require_standard(&store)?;
    let item = standard
        .find_item(uid)
        .map(|(_, item)| item)
        .ok_or_else(|| Error::NotFound(format!("item {}", uid)))?;
    let visible = store
        .visibility()
        .is_some_and(|vis| vis.is_item_visible(item.key()));

    Ok(ItemStatusReport {
        uid: item.key().to_string(),
        name: item.name.clone(),
        visible,
        status: store.status_of(item),
        completed: store.is_fully_completed(item),
    })
}

/// Options for `evidence import`.
#[derive(Debug, Default)]
pub struct ImportOptions {
    pub file: PathBuf,
    pub report: bool,
    pub uid: Option<String>,
    pub target: Option<String>,
    pub title: String,
}

#[derive(Serialize)]
pub struct EvidenceImported {
    /// Path relative to the project
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,
}

impl Output for EvidenceImported {
    fn to_human(&self) -> String {
        match &self.attached_to {
            Some(owner) => format!("Imported {} and attached to {}", self.path, owner),
            None => format!("Imported {}", self.path),
        }
    }
}

pub fn evidence_import(ctx: &Context, opts: ImportOptions) -> Result<EvidenceImported> {
    if !opts.file.is_file() {
        return Err(Error::NotFound(format!("file {}", display(&opts.file))));
    }
    let mut store = ctx.open_project()?;
    let dir = if opts.report {
        EvidenceDir::Reports
    } else {
        EvidenceDir::Images
    };
    let path = store.import_file(&opts.file, dir)?;

    let attached_to = match (opts.uid, opts.target) {
        (Some(uid), Some(target)) => {
            attach(&mut store, &uid, &target, attachment_for(&path, &opts.title))?;
            Some(format!("{}/{}", uid, target))
        }
        _ => None,
    };
    Ok(EvidenceImported { path, attached_to })
}

fn attach(store: &mut ProjectStore, uid: &str, target: &str, attachment: Attachment) -> Result<()> {
    let mut result = store.result(uid, target).cloned().unwrap_or_default();
    result.attachments.push(attachment);
    let shared = store.meta(uid).is_shared;
    store.update_result(uid, target, result, shared)
}
