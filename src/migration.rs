//! Moving a project from one standard version to another.
//!
//! Items are matched across versions by UID. [`compute_impact`] classifies
//! every item as NEW, MATCH, RESET or REMOVE; [`apply`] rewrites the results
//! accordingly, either in place (after a mandatory snapshot of the live
//! document) or into a forked copy of the project folder.

use chrono::Local;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{
    ChecklistItem, META_KEY, MigrationReportRow, MigrationStatus, Project, ResultStatus,
    StandardDefinition, TargetResult, TestEntry,
};
use crate::storage::{EVIDENCE_DIRS, ProjectStore, SETTINGS_FILENAME, atomic, folder_name};
use crate::{Error, Result};

/// Version reported when no recorded target carries a snapshot.
pub const UNKNOWN_VERSION: &str = "unknown";

const SNAPSHOT_PREFIX: &str = "snapshot_";
const SNAPSHOT_NOTE: &str = "before_switch";
/// Millisecond stamp so back-to-back switches keep separate snapshots.
const SNAPSHOT_TS_FMT: &str = "%Y%m%d_%H%M%S_%3f";

/// Where the migrated document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMode {
    /// Rewrite the open project after snapshotting it
    InPlace,
    /// Write a new project folder at this path; the source is left untouched
    Fork(PathBuf),
}

/// Classify every item of `new_standard` and every recorded item of `project`.
///
/// Rows for the new standard come first in definition order, followed by one
/// REMOVE row per recorded UID the new standard no longer has.
pub fn compute_impact(
    project: &Project,
    new_standard: &StandardDefinition,
    known_targets: &[String],
) -> Result<Vec<MigrationReportRow>> {
    let mut report = Vec::new();
    let mut new_uids = BTreeSet::new();

    for (section, item) in new_standard.items() {
        let uid = required_uid(item).ok_or_else(|| {
            Error::Validation(format!(
                "item '{}' in section {} of the new standard has no uid",
                item_label(item),
                section.section_id
            ))
        })?;
        new_uids.insert(uid);

        let new_version = item.criteria_version.as_deref();
        let (status, message) = match project.tests.get(uid) {
            None => (MigrationStatus::New, "Added in the new standard".to_string()),
            Some(entry) => {
                let old_version = recorded_version(entry, known_targets);
                if Some(old_version) == new_version {
                    (
                        MigrationStatus::Match,
                        "Criteria unchanged; results carried over".to_string(),
                    )
                } else {
                    (
                        MigrationStatus::Reset,
                        format!(
                            "Criteria changed ({} -> {}); re-judge required",
                            old_version,
                            new_version.unwrap_or(UNKNOWN_VERSION)
                        ),
                    )
                }
            }
        };
        tracing::debug!(uid, %status, "classified item");
        report.push(MigrationReportRow {
            uid: uid.to_string(),
            name: item.name.clone(),
            status,
            message,
        });
    }

    for uid in project.tests.keys() {
        if uid == META_KEY || new_uids.contains(uid.as_str()) {
            continue;
        }
        tracing::debug!(uid = %uid, status = %MigrationStatus::Remove, "classified item");
        report.push(MigrationReportRow {
            uid: uid.clone(),
            name: format!("Unknown ({})", uid),
            status: MigrationStatus::Remove,
            message: "Removed from the new standard".to_string(),
        });
    }

    Ok(report)
}

/// Apply a migration report to the open project.
///
/// Returns the folder holding the migrated document: the open project for
/// [`ApplyMode::InPlace`], the new folder for [`ApplyMode::Fork`].
pub fn apply(
    store: &mut ProjectStore,
    report: &[MigrationReportRow],
    new_standard: &StandardDefinition,
    mode: ApplyMode,
) -> Result<PathBuf> {
    let (source_path, project) = store.require()?;
    validate_report(project, report, new_standard)?;

    let annotate = matches!(mode, ApplyMode::Fork(_));
    let tests = migrate_tests(&project.tests, report, new_standard, annotate);

    match mode {
        ApplyMode::InPlace => {
            let source_path = source_path.to_path_buf();
            let snapshot = save_snapshot(store)?;
            tracing::info!(snapshot = %snapshot, "saved pre-migration snapshot");

            store.commit(|project| {
                project.standard_name = new_standard.standard_name.clone();
                project.standard_version = new_standard.standard_version.clone();
                project.tests = tests;
                Ok(())
            })?;
            store.set_standard(new_standard.clone());
            tracing::info!(
                standard = %new_standard.standard_name,
                version = %new_standard.standard_version,
                rows = report.len(),
                "migrated project in place"
            );
            Ok(source_path)
        }
        ApplyMode::Fork(dest) => {
            let mut forked = Project::new(
                new_standard.standard_name.clone(),
                new_standard.standard_version.clone(),
                project.info.clone(),
            );
            forked.info.fields.insert(
                "project_name".to_string(),
                folder_name(&dest).into(),
            );
            forked.tests = tests;

            fork_folder(source_path, &dest, &forked)?;
            tracing::info!(
                source = %source_path.display(),
                dest = %dest.display(),
                version = %new_standard.standard_version,
                "forked project to new standard"
            );
            Ok(dest)
        }
    }
}

/// Reject reports that do not fit the project and standard before anything is written.
fn validate_report(
    project: &Project,
    report: &[MigrationReportRow],
    new_standard: &StandardDefinition,
) -> Result<()> {
    for row in report {
        if row.status == MigrationStatus::Remove {
            continue;
        }
        if new_standard.item_by_uid(&row.uid).is_none() {
            return Err(Error::Validation(format!(
                "report row {} ({}) names an item missing from {} {}",
                row.uid, row.status, new_standard.standard_name, new_standard.standard_version
            )));
        }
        let needs_entry = matches!(row.status, MigrationStatus::Match | MigrationStatus::Reset);
        if needs_entry && !project.tests.contains_key(&row.uid) {
            return Err(Error::Validation(format!(
                "report row {} ({}) has no recorded results to migrate",
                row.uid, row.status
            )));
        }
    }
    Ok(())
}

fn migrate_tests(
    old: &BTreeMap<String, TestEntry>,
    report: &[MigrationReportRow],
    new_standard: &StandardDefinition,
    annotate: bool,
) -> BTreeMap<String, TestEntry> {
    let mut tests = BTreeMap::new();

    for row in report {
        let old_entry = old.get(&row.uid);
        let entry = match (row.status, old_entry) {
            (MigrationStatus::Remove, _) => continue,
            (MigrationStatus::New, _) => TestEntry::default(),
            (MigrationStatus::Match, Some(entry)) => entry.clone(),
            (MigrationStatus::Reset, Some(entry)) => {
                let new_version = new_standard
                    .item_by_uid(&row.uid)
                    .and_then(|item| item.criteria_version.as_deref())
                    .unwrap_or(UNKNOWN_VERSION);
                reset_entry(entry, new_version, annotate)
            }
            // Ruled out by validate_report
            (MigrationStatus::Match | MigrationStatus::Reset, None) => continue,
        };
        tests.insert(row.uid.clone(), entry);
    }

    tests
}

/// Keep only the attachments of each target and mark it for re-judging.
pub fn reset_entry(old: &TestEntry, new_version: &str, annotate: bool) -> TestEntry {
    let targets = old
        .targets
        .iter()
        .map(|(target, result)| {
            let description = if annotate {
                let old_version = result
                    .criteria_version_snapshot
                    .as_deref()
                    .unwrap_or(UNKNOWN_VERSION);
                format!(
                    "[System] Criteria version changed ({} -> {}); re-judge required.\n{}",
                    old_version, new_version, result.description
                )
            } else {
                String::new()
            };
            let reset = TargetResult {
                attachments: result.attachments.clone(),
                result: ResultStatus::Unchecked,
                criteria_version_snapshot: Some(new_version.to_string()),
                description,
                ..Default::default()
            };
            (target.clone(), reset)
        })
        .collect();

    TestEntry {
        meta: old.meta,
        targets,
    }
}

/// First snapshot version found in the known target order, then any other target.
fn recorded_version<'a>(entry: &'a TestEntry, known_targets: &[String]) -> &'a str {
    let known = known_targets
        .iter()
        .filter_map(|target| entry.targets.get(target));
    let others = entry
        .targets
        .iter()
        .filter(|(target, _)| !known_targets.contains(target))
        .map(|(_, result)| result);

    known
        .chain(others)
        .find_map(|result| result.criteria_version_snapshot.as_deref())
        .unwrap_or(UNKNOWN_VERSION)
}

fn required_uid(item: &ChecklistItem) -> Option<&str> {
    item.uid.as_deref().filter(|uid| !uid.is_empty())
}

fn item_label(item: &ChecklistItem) -> &str {
    if item.name.is_empty() { &item.id } else { &item.name }
}

fn fork_folder(source: &Path, dest: &Path, project: &Project) -> Result<()> {
    if dest.exists() {
        return Err(Error::Validation(format!(
            "destination already exists: {}",
            dest.display()
        )));
    }
    fs::create_dir_all(dest)?;

    let outcome = populate_fork(source, dest, project);
    if outcome.is_err() {
        if let Err(e) = fs::remove_dir_all(dest) {
            tracing::warn!(dest = %dest.display(), error = %e, "failed to clean up partial fork");
        }
    }
    outcome
}

fn populate_fork(source: &Path, dest: &Path, project: &Project) -> Result<()> {
    for dir in EVIDENCE_DIRS {
        let src = source.join(dir);
        let dst = dest.join(dir);
        if src.is_dir() {
            copy_dir_all(&src, &dst)?;
        } else {
            fs::create_dir_all(&dst)?;
        }
    }
    atomic::save(&dest.join(SETTINGS_FILENAME), project)
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let to = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), to)?;
        }
    }
    Ok(())
}

// === Snapshots ===

/// Durably copy the live document next to itself before a standard switch.
///
/// Returns the snapshot file name.
pub fn save_snapshot(store: &ProjectStore) -> Result<String> {
    let (root, project) = store.require()?;
    let stem = format!(
        "{}{}_{}_{}",
        SNAPSHOT_PREFIX,
        project.standard_name.replace(' ', "_"),
        Local::now().format(SNAPSHOT_TS_FMT),
        SNAPSHOT_NOTE
    );
    // An existing snapshot is never replaced
    let name = std::iter::once(format!("{}.json", stem))
        .chain((1..).map(|i| format!("{}_{}.json", stem, i)))
        .find(|candidate| !root.join(candidate).exists())
        .ok_or_else(|| Error::Validation("no free snapshot name".to_string()))?;
    atomic::copy(&root.join(SETTINGS_FILENAME), &root.join(&name))?;
    Ok(name)
}

/// Snapshot file names in the open project, newest first.
pub fn list_snapshots(store: &ProjectStore) -> Result<Vec<String>> {
    let (root, _) = store.require()?;
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        if is_snapshot_name(&name) {
            names.push(name);
        }
    }
    names.sort_by(|a, b| b.cmp(a));
    Ok(names)
}

/// Replace the live document with a snapshot and reload it.
pub fn restore_snapshot(store: &mut ProjectStore, file_name: &str) -> Result<()> {
    let (root, _) = store.require()?;
    if !is_snapshot_name(file_name) || file_name.contains(['/', '\\']) {
        return Err(Error::Validation(format!("not a snapshot file: {}", file_name)));
    }
    let src = root.join(file_name);
    if !src.is_file() {
        return Err(Error::NotFound(format!("snapshot {}", file_name)));
    }
    // Refuse to restore something that is not a project document
    atomic::load::<Project>(&src)?;

    atomic::copy(&src, &root.join(SETTINGS_FILENAME))?;
    tracing::info!(snapshot = %file_name, "restored snapshot");
    store.reload()
}

fn is_snapshot_name(name: &str) -> bool {
    name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(".json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, AttachmentKind, EntryMeta};
    use crate::storage::{DIR_IMAGES, DIR_REPORTS, StoreEvent};
    use crate::test_utils::{TestEnv, sample_standard, standard};
    use serde_json::json;

    fn targets() -> Vec<String> {
        vec!["UAV".to_string(), "GCS".to_string()]
    }

    fn judged(version: Option<&str>, description: &str) -> TargetResult {
        let mut criteria = BTreeMap::new();
        criteria.insert("c1".to_string(), true);
        TargetResult {
            criteria,
            description: description.to_string(),
            result: ResultStatus::Pass,
            attachments: vec![Attachment::new(AttachmentKind::Image, "images/a.jpg", "")],
            criteria_version_snapshot: version.map(String::from),
            ..Default::default()
        }
    }

    /// Version 2.0: U1 changes criteria, U2 unchanged, U3 dropped, U4 added.
    fn next_standard() -> StandardDefinition {
        standard(
            "2.0",
            json!([
                {"section_id": "1", "items": [
                    {"id": "1.1", "uid": "U1", "name": "Casing", "criteria_version": "2.0", "targets": ["UAV", "GCS"]},
                    {"id": "1.2", "uid": "U2", "name": "Ports", "criteria_version": "1.0"}
                ]},
                {"section_id": "3", "items": [
                    {"id": "3.1", "uid": "U4", "name": "Radio", "criteria_version": "1.0"}
                ]}
            ]),
        )
    }

    fn project_with_results(env: &TestEnv) -> (ProjectStore, PathBuf) {
        let (mut store, path) = env.full_project(&sample_standard(), "Alpha", None);
        store.update_result("U1", "UAV", judged(Some("1.0"), "solid"), true).unwrap();
        store.update_result("U1", "GCS", judged(Some("1.0"), "solid"), true).unwrap();
        store.update_result("U2", "GCS", judged(Some("1.0"), "closed"), false).unwrap();
        store.update_result("U3", "GCS", judged(Some("1.0"), "signed"), false).unwrap();
        fs::write(path.join(DIR_IMAGES).join("a.jpg"), b"jpg").unwrap();
        (store, path)
    }

    fn statuses(report: &[MigrationReportRow]) -> Vec<(&str, MigrationStatus)> {
        report.iter().map(|r| (r.uid.as_str(), r.status)).collect()
    }

    #[test]
    fn test_example_scenario() {
        let mut project = Project::default();
        let mut entry = TestEntry::default();
        entry.targets.insert(
            "A".to_string(),
            TargetResult {
                result: ResultStatus::Pass,
                criteria_version_snapshot: Some("1.0".to_string()),
                attachments: vec![Attachment::new(AttachmentKind::Image, "images/a.jpg", "")],
                ..Default::default()
            },
        );
        project.tests.insert("U1".to_string(), entry);
        let new_std = standard(
            "2.0",
            json!([{"section_id": "1", "items": [{"id": "1", "uid": "U1", "criteria_version": "2.0"}]}]),
        );

        let report = compute_impact(&project, &new_std, &targets()).unwrap();
        assert_eq!(statuses(&report), vec![("U1", MigrationStatus::Reset)]);

        let tests = migrate_tests(&project.tests, &report, &new_std, false);
        let out = serde_json::to_value(&tests["U1"]).unwrap();
        assert_eq!(
            out,
            json!({"A": {
                "result": "UNCHECKED",
                "criteria_version_snapshot": "2.0",
                "attachments": [{"type": "image", "path": "images/a.jpg", "title": ""}]
            }})
        );
    }

    #[test]
    fn test_classification_covers_every_uid_once() {
        let env = TestEnv::new();
        let (store, _) = project_with_results(&env);
        let report =
            compute_impact(store.project().unwrap(), &next_standard(), &targets()).unwrap();

        assert_eq!(
            statuses(&report),
            vec![
                ("U1", MigrationStatus::Reset),
                ("U2", MigrationStatus::Match),
                ("U4", MigrationStatus::New),
                ("U3", MigrationStatus::Remove),
            ]
        );
        assert_eq!(report[0].message, "Criteria changed (1.0 -> 2.0); re-judge required");
        assert_eq!(report[3].name, "Unknown (U3)");
    }

    #[test]
    fn test_missing_uid_fails_fast() {
        let project = Project::default();
        let bad = standard(
            "2.0",
            json!([{"section_id": "1", "items": [{"id": "1.1", "name": "Casing"}]}]),
        );
        let err = compute_impact(&project, &bad, &targets()).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("Casing")));
    }

    #[test]
    fn test_version_scan_order() {
        let mut entry = TestEntry::default();
        entry.targets.insert("Aux".to_string(), judged(Some("0.9"), ""));
        entry.targets.insert("GCS".to_string(), judged(Some("1.1"), ""));
        entry.targets.insert("UAV".to_string(), judged(None, ""));
        assert_eq!(recorded_version(&entry, &targets()), "1.1");

        entry.targets.remove("GCS");
        assert_eq!(recorded_version(&entry, &targets()), "0.9");

        entry.targets.remove("Aux");
        assert_eq!(recorded_version(&entry, &targets()), UNKNOWN_VERSION);
    }

    #[test]
    fn test_missing_snapshot_version_is_reset() {
        let mut project = Project::default();
        let mut entry = TestEntry::default();
        entry.targets.insert("GCS".to_string(), judged(None, ""));
        project.tests.insert("U2".to_string(), entry);

        let report = compute_impact(&project, &sample_standard(), &targets()).unwrap();
        let u2 = report.iter().find(|r| r.uid == "U2").unwrap();
        assert_eq!(u2.status, MigrationStatus::Reset);
        assert!(u2.message.contains("unknown -> 1.0"));
    }

    #[test]
    fn test_reset_keeps_only_attachments_and_meta() {
        let mut old = TestEntry {
            meta: Some(EntryMeta { is_shared: true }),
            ..Default::default()
        };
        old.targets.insert("UAV".to_string(), judged(Some("1.0"), "solid"));
        old.targets.insert("Bench".to_string(), judged(Some("1.0"), "bench"));

        let reset = reset_entry(&old, "2.0", false);
        assert_eq!(reset.meta, Some(EntryMeta { is_shared: true }));
        assert_eq!(reset.targets.len(), 2);
        for (target, result) in &reset.targets {
            assert_eq!(result.attachments, old.targets[target].attachments);
            assert_eq!(result.result, ResultStatus::Unchecked);
            assert_eq!(result.criteria_version_snapshot.as_deref(), Some("2.0"));
            assert!(result.criteria.is_empty());
            assert!(result.description.is_empty());
            assert!(result.last_updated.is_none());
        }

        let annotated = reset_entry(&old, "2.0", true);
        assert_eq!(
            annotated.targets["UAV"].description,
            "[System] Criteria version changed (1.0 -> 2.0); re-judge required.\nsolid"
        );
    }

    #[test]
    fn test_apply_in_place_snapshots_then_rebinds() {
        let env = TestEnv::new();
        let (mut store, path) = project_with_results(&env);
        let before = fs::read(path.join(SETTINGS_FILENAME)).unwrap();
        let rx = store.subscribe();
        let new_std = next_standard();
        let report = compute_impact(store.project().unwrap(), &new_std, &targets()).unwrap();

        let out = apply(&mut store, &report, &new_std, ApplyMode::InPlace).unwrap();
        assert_eq!(out, path);

        let snapshots = list_snapshots(&store).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].starts_with("snapshot_Drone_Security_"));
        assert!(snapshots[0].ends_with("_before_switch.json"));
        assert_eq!(fs::read(path.join(&snapshots[0])).unwrap(), before);

        let project = store.project().unwrap();
        assert_eq!(project.standard_version, "2.0");
        assert!(!project.tests.contains_key("U3"));
        assert!(project.tests["U4"].targets.is_empty());
        assert_eq!(project.tests["U2"].targets["GCS"].description, "closed");
        assert_eq!(project.tests["U1"].targets["UAV"].result, ResultStatus::Unchecked);
        assert!(project.tests["U1"].is_shared());
        assert_eq!(store.standard().unwrap().standard_version, "2.0");
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::DataChanged);
    }

    #[test]
    fn test_apply_rejects_inconsistent_report_without_writing() {
        let env = TestEnv::new();
        let (mut store, path) = project_with_results(&env);
        let before = fs::read(path.join(SETTINGS_FILENAME)).unwrap();
        let new_std = next_standard();

        let bogus = vec![MigrationReportRow {
            uid: "U9".to_string(),
            name: "Ghost".to_string(),
            status: MigrationStatus::Match,
            message: String::new(),
        }];
        let err = apply(&mut store, &bogus, &new_std, ApplyMode::InPlace).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let no_entry = vec![MigrationReportRow {
            uid: "U4".to_string(),
            name: "Radio".to_string(),
            status: MigrationStatus::Reset,
            message: String::new(),
        }];
        assert!(apply(&mut store, &no_entry, &new_std, ApplyMode::InPlace).is_err());

        assert!(list_snapshots(&store).unwrap().is_empty());
        assert_eq!(fs::read(path.join(SETTINGS_FILENAME)).unwrap(), before);
    }

    #[test]
    fn test_apply_without_project() {
        let mut store = ProjectStore::new(Default::default());
        let err = apply(&mut store, &[], &next_standard(), ApplyMode::InPlace).unwrap_err();
        assert!(matches!(err, Error::NoProject));
    }

    #[test]
    fn test_fork_leaves_source_untouched() {
        let env = TestEnv::new();
        let (mut store, path) = project_with_results(&env);
        fs::create_dir_all(path.join(DIR_IMAGES).join("nested")).unwrap();
        fs::write(path.join(DIR_IMAGES).join("nested").join("b.jpg"), b"b").unwrap();
        fs::remove_dir(path.join(DIR_REPORTS)).unwrap();
        let before = fs::read(path.join(SETTINGS_FILENAME)).unwrap();
        let new_std = next_standard();
        let report = compute_impact(store.project().unwrap(), &new_std, &targets()).unwrap();

        let dest = env.path().join("Alpha_v2");
        let out = apply(&mut store, &report, &new_std, ApplyMode::Fork(dest.clone())).unwrap();
        assert_eq!(out, dest);

        assert_eq!(fs::read(path.join(SETTINGS_FILENAME)).unwrap(), before);
        assert_eq!(store.project().unwrap().standard_version, "1.0");
        assert!(list_snapshots(&store).unwrap().is_empty());

        assert!(dest.join(DIR_IMAGES).join("a.jpg").is_file());
        assert!(dest.join(DIR_IMAGES).join("nested").join("b.jpg").is_file());
        assert!(dest.join(DIR_REPORTS).is_dir());

        let forked: Project = atomic::load(&dest.join(SETTINGS_FILENAME)).unwrap();
        assert_eq!(forked.standard_version, "2.0");
        assert_eq!(forked.info.project_name(), Some("Alpha_v2"));
        let note = &forked.tests["U1"].targets["GCS"].description;
        assert!(note.starts_with("[System] Criteria version changed (1.0 -> 2.0)"));
        assert!(note.ends_with("\nsolid"));
    }

    #[test]
    fn test_fork_into_existing_folder_fails() {
        let env = TestEnv::new();
        let (mut store, _) = project_with_results(&env);
        let dest = env.path().join("taken");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep.txt"), "x").unwrap();

        let err =
            apply(&mut store, &[], &next_standard(), ApplyMode::Fork(dest.clone())).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(dest.join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_fork_failure_removes_partial_destination() {
        let env = TestEnv::new();
        let (mut store, path) = project_with_results(&env);
        // A dangling link fails the evidence copy regardless of privileges
        std::os::unix::fs::symlink(
            path.join("gone.log"),
            path.join(DIR_REPORTS).join("flight.log"),
        )
        .unwrap();
        let before = fs::read(path.join(SETTINGS_FILENAME)).unwrap();
        let new_std = next_standard();
        let report = compute_impact(store.project().unwrap(), &new_std, &targets()).unwrap();

        let dest = env.path().join("Alpha_v2");
        let err = apply(&mut store, &report, &new_std, ApplyMode::Fork(dest.clone())).unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        assert!(!dest.exists());
        assert_eq!(fs::read(path.join(SETTINGS_FILENAME)).unwrap(), before);
        assert!(path.join(DIR_IMAGES).join("a.jpg").is_file());
        assert_eq!(store.project().unwrap().standard_version, "1.0");
    }

    #[test]
    fn test_back_to_back_switches_keep_every_snapshot() {
        let env = TestEnv::new();
        let (mut store, path) = project_with_results(&env);
        let original = fs::read(path.join(SETTINGS_FILENAME)).unwrap();

        let mut third = next_standard();
        third.standard_version = "3.0".to_string();
        for new_std in [next_standard(), third] {
            let report = compute_impact(store.project().unwrap(), &new_std, &targets()).unwrap();
            apply(&mut store, &report, &new_std, ApplyMode::InPlace).unwrap();
        }
        assert_eq!(store.project().unwrap().standard_version, "3.0");

        let snapshots = list_snapshots(&store).unwrap();
        assert_eq!(snapshots.len(), 2);
        let oldest = &snapshots[1];
        assert_eq!(fs::read(path.join(oldest)).unwrap(), original);

        restore_snapshot(&mut store, oldest).unwrap();
        assert_eq!(store.project().unwrap().standard_version, "1.0");
    }

    #[test]
    fn test_snapshot_name_never_overwrites() {
        let env = TestEnv::new();
        let (store, path) = project_with_results(&env);
        let names: Vec<String> = (0..3).map(|_| save_snapshot(&store).unwrap()).collect();

        let unique: BTreeSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), 3);
        for name in &names {
            assert!(path.join(name).is_file());
        }
    }

    #[test]
    fn test_restore_snapshot_reloads_document() {
        let env = TestEnv::new();
        let (mut store, _) = project_with_results(&env);
        let name = save_snapshot(&store).unwrap();
        store.update_result("U2", "GCS", TargetResult::default(), false).unwrap();
        assert_eq!(store.result("U2", "GCS").unwrap().result, ResultStatus::Unchecked);

        restore_snapshot(&mut store, &name).unwrap();
        assert_eq!(store.result("U2", "GCS").unwrap().result, ResultStatus::Pass);

        assert!(matches!(
            restore_snapshot(&mut store, "../project_settings.json"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            restore_snapshot(&mut store, "snapshot_missing.json"),
            Err(Error::NotFound(_))
        ));
    }
}
