//! Migration, snapshot and merge commands.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{Context, Output, display};
use crate::merge::{self, MergeOutcome};
use crate::migration::{self, ApplyMode};
use crate::models::{MigrationReportRow, MigrationStatus};
use crate::{Error, Result};

#[derive(Serialize)]
pub struct MigrationPlan {
    pub from_version: String,
    pub to_version: String,
    pub rows: Vec<MigrationReportRow>,
    pub counts: BTreeMap<MigrationStatus, usize>,
}

impl MigrationPlan {
    fn new(from_version: String, to_version: String, rows: Vec<MigrationReportRow>) -> Self {
        let mut counts = BTreeMap::new();
        for row in &rows {
            *counts.entry(row.status).or_insert(0) += 1;
        }
        Self {
            from_version,
            to_version,
            rows,
            counts,
        }
    }
}

impl Output for MigrationPlan {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("{} -> {}", self.from_version, self.to_version)];
        for row in &self.rows {
            lines.push(format!(
                "  {:<6} {} {}: {}",
                row.status, row.uid, row.name, row.message
            ));
        }
        let summary: Vec<String> = self
            .counts
            .iter()
            .map(|(status, n)| format!("{} {}", n, status))
            .collect();
        lines.push(summary.join(", "));
        lines.join("\n")
    }
}

/// Classify every item for a move to `standard`.
pub fn migrate_plan(ctx: &Context, standard: &str) -> Result<MigrationPlan> {
    let store = ctx.open_project()?;
    let new_standard = ctx.resolve_standard(Some(standard))?;
    let (_, project) = store.require()?;

    let rows = migration::compute_impact(
        project,
        &new_standard,
        &store.settings().known_targets,
    )?;
    Ok(MigrationPlan::new(
        project.standard_version.clone(),
        new_standard.standard_version.clone(),
        rows,
    ))
}

#[derive(Serialize)]
pub struct MigrationApplied {
    pub path: PathBuf,
    pub forked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(flatten)]
    pub plan: MigrationPlan,
}

impl Output for MigrationApplied {
    fn to_human(&self) -> String {
        let mut lines = vec![self.plan.to_human()];
        if self.forked {
            lines.push(format!("Forked into {}", display(&self.path)));
        } else {
            lines.push(format!("Migrated {} in place", display(&self.path)));
        }
        if let Some(ref snapshot) = self.snapshot {
            lines.push(format!("Snapshot: {}", snapshot));
        }
        lines.join("\n")
    }
}

/// Compute the plan and apply it in place, or into a sibling folder named `fork`.
pub fn migrate_apply(
    ctx: &Context,
    standard: &str,
    fork: Option<&str>,
) -> Result<MigrationApplied> {
    let mut store = ctx.open_project()?;
    let new_standard = ctx.resolve_standard(Some(standard))?;
    let (root, project) = store.require()?;

    let rows = migration::compute_impact(
        project,
        &new_standard,
        &store.settings().known_targets,
    )?;
    let from_version = project.standard_version.clone();

    let mode = match fork {
        Some(name) => {
            if name.trim().is_empty() || name.contains(['/', '\\']) {
                return Err(Error::Validation(format!("invalid fork name '{}'", name)));
            }
            let parent = root.parent().ok_or_else(|| {
                Error::Validation(format!("{} has no parent folder", display(root)))
            })?;
            ApplyMode::Fork(parent.join(name))
        }
        None => ApplyMode::InPlace,
    };
    let forked = matches!(mode, ApplyMode::Fork(_));

    let path = migration::apply(&mut store, &rows, &new_standard, mode)?;
    let snapshot = if forked {
        None
    } else {
        migration::list_snapshots(&store)?.into_iter().next()
    };

    Ok(MigrationApplied {
        path,
        forked,
        snapshot,
        plan: MigrationPlan::new(from_version, new_standard.standard_version.clone(), rows),
    })
}

impl Output for MergeOutcome {
    fn to_human(&self) -> String {
        format!(
            "Merged {} results and {} files",
            self.merged_count,
            self.copied_files.len()
        )
    }
}

pub fn merge_project(ctx: &Context, source: &std::path::Path) -> Result<MergeOutcome> {
    let mut store = ctx.open_project()?;
    merge::merge(&mut store, source)
}

#[derive(Serialize)]
pub struct SnapshotList {
    pub snapshots: Vec<String>,
}

impl Output for SnapshotList {
    fn to_human(&self) -> String {
        if self.snapshots.is_empty() {
            "No snapshots".to_string()
        } else {
            self.snapshots.join("\n")
        }
    }
}

pub fn snapshot_list(ctx: &Context) -> Result<SnapshotList> {
    let store = ctx.open_project()?;
    Ok(SnapshotList {
        snapshots: migration::list_snapshots(&store)?,
    })
}

#[derive(Serialize)]
pub struct SnapshotRestored {
    pub restored: String,
    pub standard_version: String,
}

impl Output for SnapshotRestored {
    fn to_human(&self) -> String {
        format!(
            "Restored {} (standard version {})",
            self.restored, self.standard_version
        )
    }
}

pub fn snapshot_restore(ctx: &Context, name: &str) -> Result<SnapshotRestored> {
    let mut store = ctx.open_project()?;
    migration::restore_snapshot(&mut store, name)?;
    let (_, project) = store.require()?;
    Ok(SnapshotRestored {
        restored: name.to_string(),
        standard_version: project.standard_version.clone(),
    })
}
