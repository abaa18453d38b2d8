//! Project folder, metadata, scope and visibility commands.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::{Context, Output, display, parse_info_pairs, require_standard};
use crate::models::{ItemStatus, Project, ProjectType};
use crate::storage::{ProjectForm, ProjectStore};
use crate::{Error, Result};

#[derive(Serialize)]
pub struct ProjectCreated {
    pub path: PathBuf,
    pub project_type: ProjectType,
    pub standard_name: String,
    pub standard_version: String,
}

impl Output for ProjectCreated {
    fn to_human(&self) -> String {
        format!(
            "Created {} project at {}\nStandard: {} {}",
            self.project_type,
            display(&self.path),
            self.standard_name,
            self.standard_version
        )
    }
}

impl ProjectCreated {
    fn from_store(store: &ProjectStore, path: PathBuf) -> Self {
        let project = store.project();
        Self {
            path,
            project_type: project.map(Project::project_type).unwrap_or_default(),
            standard_name: project.map(|p| p.standard_name.clone()).unwrap_or_default(),
            standard_version: project
                .map(|p| p.standard_version.clone())
                .unwrap_or_default(),
        }
    }
}

/// Options for `project create`.
#[derive(Debug, Default)]
pub struct CreateOptions {
    pub name: String,
    pub path: Option<PathBuf>,
    pub standard: Option<String>,
    pub scope: Option<Vec<String>>,
    pub empty_scope: bool,
    pub fields: Vec<String>,
}

/// Create a full project folder.
pub fn project_create(ctx: &Context, opts: CreateOptions) -> Result<ProjectCreated> {
    let standard = ctx.resolve_standard(opts.standard.as_deref())?;
    let mut store = ctx.new_store();
    store.set_standard(standard);

    let mut form = ProjectForm::new(ctx.save_path(opts.path), opts.name);
    form.test_scope = if opts.empty_scope {
        Some(Vec::new())
    } else {
        opts.scope
    };
    form.fields = parse_info_pairs(&opts.fields)?;

    let path = store.create(form)?;
    Ok(ProjectCreated::from_store(&store, path))
}

/// Create an ad-hoc project scoped to `items`.
pub fn project_quick(
    ctx: &Context,
    items: Vec<String>,
    path: Option<PathBuf>,
    standard: Option<&str>,
) -> Result<ProjectCreated> {
    let standard = ctx.resolve_standard(standard)?;
    if let Some(unknown) = items.iter().find(|uid| standard.item_by_uid(uid).is_none()) {
        return Err(Error::Validation(format!(
            "item {} is not in {} {}",
            unknown, standard.standard_name, standard.standard_version
        )));
    }

    let mut store = ctx.new_store();
    store.set_standard(standard);
    let path = store.create_ad_hoc(items, &ctx.save_path(path))?;
    Ok(ProjectCreated::from_store(&store, path))
}

#[derive(Serialize)]
pub struct ProjectShown {
    pub path: PathBuf,
    #[serde(flatten)]
    pub project: Project,
}

impl Output for ProjectShown {
    fn to_human(&self) -> String {
        let p = &self.project;
        let mut lines = vec![
            format!(
                "{} ({})",
                p.info.project_name().unwrap_or("(unnamed)"),
                p.project_type()
            ),
            format!("  Path: {}", display(&self.path)),
            format!("  Standard: {} {}", p.standard_name, p.standard_version),
        ];
        match (p.project_type(), &p.info.test_scope, &p.info.target_items) {
            (ProjectType::Full, None, _) => lines.push("  Scope: all sections".to_string()),
            (ProjectType::Full, Some(scope), _) => {
                lines.push(format!("  Scope: sections [{}]", scope.join(", ")))
            }
            (ProjectType::AdHoc, _, items) => lines.push(format!(
                "  Scope: items [{}]",
                items.as_deref().unwrap_or(&[]).join(", ")
            )),
        }
        let results: usize = p.tests.values().map(|e| e.targets.len()).sum();
        lines.push(format!(
            "  Results: {} across {} items",
            results,
            p.tests.len()
        ));
        lines.join("\n")
    }
}

pub fn project_show(ctx: &Context) -> Result<ProjectShown> {
    let store = ctx.open_project()?;
    let (path, project) = store.require()?;
    Ok(ProjectShown {
        path: path.to_path_buf(),
        project: project.clone(),
    })
}

#[derive(Serialize)]
pub struct ProjectPeek {
    pub folder: PathBuf,
    pub standard_name: Option<String>,
}

impl Output for ProjectPeek {
    fn to_human(&self) -> String {
        match &self.standard_name {
            Some(name) => format!("{}: {}", display(&self.folder), name),
            None => format!("{}: no readable project document", display(&self.folder)),
        }
    }
}

pub fn project_peek(folder: PathBuf) -> ProjectPeek {
    let standard_name = ProjectStore::peek_standard(&folder);
    ProjectPeek {
        folder,
        standard_name,
    }
}

#[derive(Serialize)]
pub struct InfoUpdated {
    pub keys: Vec<String>,
}

impl Output for InfoUpdated {
    fn to_human(&self) -> String {
        format!("Updated {}", self.keys.join(", "))
    }
}

pub fn info_set(ctx: &Context, pairs: &[String]) -> Result<InfoUpdated> {
    let patch = parse_info_pairs(pairs)?;
    let keys = patch.keys().cloned().collect();
    let mut store = ctx.open_project()?;
    store.update_info(patch)?;
    Ok(InfoUpdated { keys })
}

#[derive(Serialize)]
pub struct ScopeUpdated {
    pub items: Vec<String>,
    /// Items whose results were deleted
    pub removed: Vec<String>,
}

impl Output for ScopeUpdated {
    fn to_human(&self) -> String {
        let mut out = format!("Scope: {}", self.items.join(", "));
        if !self.removed.is_empty() {
            out.push_str(&format!("\nDeleted results of: {}", self.removed.join(", ")));
        }
        out
    }
}

/// Replace the ad-hoc whitelist, deleting results of dropped items.
pub fn scope_set_items(ctx: &Context, items: Vec<String>) -> Result<ScopeUpdated> {
    let mut store = ctx.open_project()?;
    let (_, project) = store.require()?;
    if project.project_type() != ProjectType::AdHoc {
        return Err(Error::Incompatible(
            "item scope only applies to ad-hoc projects".to_string(),
        ));
    }

    let keep: BTreeSet<&str> = items.iter().map(String::as_str).collect();
    let removed: Vec<String> = project
        .info
        .target_items
        .iter()
        .flatten()
        .filter(|uid| !keep.contains(uid.as_str()))
        .cloned()
        .collect();

    store.update_ad_hoc_whitelist(items.clone(), &removed)?;
    Ok(ScopeUpdated { items, removed })
}

#[derive(Serialize)]
pub struct VisibleItem {
    pub uid: String,
    pub id: String,
    pub name: String,
    pub status: BTreeMap<String, ItemStatus>,
    pub completed: bool,
}

#[derive(Serialize)]
pub struct VisibleSection {
    pub section_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
    pub items: Vec<VisibleItem>,
}

#[derive(Serialize)]
pub struct VisibleReport {
    pub sections: Vec<VisibleSection>,
}

impl Output for VisibleReport {
    fn to_human(&self) -> String {
        if self.sections.is_empty() {
            return "Nothing in scope".to_string();
        }
        let mut lines = Vec::new();
        for section in &self.sections {
            match &section.section_name {
                Some(name) => lines.push(format!("[{}] {}", section.section_id, name)),
                None => lines.push(format!("[{}]", section.section_id)),
            }
            for item in &section.items {
                let status: Vec<String> = item
                    .status
                    .iter()
                    .map(|(target, s)| format!("{}: {}", target, s))
                    .collect();
                let mark = if item.completed { "x" } else { " " };
                lines.push(format!(
                    "  [{}] {} {} ({})",
                    mark,
                    item.id,
                    item.name,
                    status.join(", ")
                ));
            }
        }
        lines.join("\n")
    }
}

/// Sections and items in scope, with per-target status.
pub fn visible(ctx: &Context) -> Result<VisibleReport> {
    let store = ctx.open_project()?;
    let standard = require_standard(&store)?;
    let Some(vis) = store.visibility() else {
        return Ok(VisibleReport { sections: Vec::new() });
    };

    let sections = vis
        .visible_sections()
        .into_iter()
        .map(|section| VisibleSection {
            section_id: section.section_id.clone(),
            section_name: section.section_name.clone(),
            items: section
                .items
                .iter()
                .filter(|item| vis.is_item_visible(item.key()))
                .map(|item| VisibleItem {
                    uid: item.key().to_string(),
                    id: item.id.clone(),
                    name: item.name.clone(),
                    status: store.status_of(item),
                    completed: store.is_fully_completed(item),
                })
                .collect(),
        })
        .collect();
    tracing::debug!(standard = %standard.standard_name, "listed visible items");

    Ok(VisibleReport { sections })
}
