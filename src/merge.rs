//! Folding an ad-hoc project's results back into a full project.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{Project, ProjectType};
use crate::storage::{EVIDENCE_DIRS, ProjectStore, SETTINGS_FILENAME, atomic};
use crate::{Error, Result};

/// Prefix given to copied evidence files whose name is already taken.
pub const MERGED_PREFIX: &str = "merged_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Number of `(uid, target)` results written
    pub merged_count: usize,
    /// Evidence files copied, relative to the destination project
    pub copied_files: Vec<String>,
}

/// Merge the ad-hoc project in `source` into the open full project.
///
/// Every precondition is checked before any file or result is written.
/// Results overwrite existing ones per `(uid, target)`.
pub fn merge(store: &mut ProjectStore, source: &Path) -> Result<MergeOutcome> {
    let (dest_root, current) = store.require()?;
    if current.project_type() != ProjectType::Full {
        return Err(Error::Incompatible(
            "only full projects can receive a merge".to_string(),
        ));
    }

    let source_doc = source.join(SETTINGS_FILENAME);
    if !source_doc.is_file() {
        return Err(Error::NotFound(format!(
            "no project document in {}",
            source.display()
        )));
    }
    let incoming: Project = atomic::load(&source_doc)?;

    if incoming.project_type() != ProjectType::AdHoc {
        return Err(Error::Incompatible(
            "only ad-hoc projects can be merged".to_string(),
        ));
    }
    if incoming.standard_name != current.standard_name {
        return Err(Error::Incompatible(format!(
            "standard mismatch: project uses '{}', source uses '{}'",
            current.standard_name, incoming.standard_name
        )));
    }

    let dest_root = dest_root.to_path_buf();
    let copied_files = copy_evidence(source, &dest_root)?;

    let mut merged_count = 0;
    store.commit(|project| {
        for (uid, entry) in incoming.tests {
            let dest = project.tests.entry(uid).or_default();
            if entry.meta.is_some() {
                dest.meta = entry.meta;
            }
            for (target, result) in entry.targets {
                dest.targets.insert(target, result);
                merged_count += 1;
            }
        }
        Ok(())
    })?;

    tracing::info!(
        source = %source.display(),
        merged_count,
        files = copied_files.len(),
        "merged ad-hoc project"
    );
    Ok(MergeOutcome {
        merged_count,
        copied_files,
    })
}

/// Copy the top-level files of each evidence folder, renaming collisions.
fn copy_evidence(source: &Path, dest_root: &Path) -> Result<Vec<String>> {
    let mut copied = Vec::new();

    for dir in EVIDENCE_DIRS {
        let src_dir = source.join(dir);
        if !src_dir.is_dir() {
            continue;
        }
        let dest_dir = dest_root.join(dir);
        fs::create_dir_all(&dest_dir)?;

        for entry in fs::read_dir(&src_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let target = free_name(&dest_dir, &name);
            fs::copy(entry.path(), &target)?;

            let file = target
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or(name);
            copied.push(format!("{}/{}", dir, file));
        }
    }

    Ok(copied)
}

/// `dir/name`, or `dir/merged_name` when the former exists.
fn free_name(dir: &Path, name: &str) -> PathBuf {
    let direct = dir.join(name);
    if direct.exists() {
        dir.join(format!("{}{}", MERGED_PREFIX, name))
    } else {
        direct
    }
}
