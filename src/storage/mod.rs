//! Storage layer for checkwright project folders.
//!
//! A project lives in its own folder:
//!
//! ```text
//! <project>/project_settings.json   # the Project document
//! <project>/images/                 # evidence images
//! <project>/reports/                # evidence files and logs
//! ```
//!
//! [`ProjectStore`] owns the loaded document. Every mutation is applied to a
//! copy, persisted through [`atomic`], and only then committed in memory, so a
//! failed write leaves both the disk and the in-memory state unchanged and
//! raises no notification.

pub mod atomic;
pub mod events;

pub use events::{EvidenceListener, StoreEvent, UploadEvent};

use chrono::Local;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::config::expand_home;
use crate::models::{
    Attachment, AttachmentKind, ChecklistItem, DEFAULT_TARGETS, EntryMeta, FieldKind, InfoValue,
    ItemStatus, META_KEY, Project, ProjectInfo, ProjectType, ResultStatus, StandardDefinition,
    TargetResult,
};
use crate::visibility::VisibilityResolver;
use crate::{Error, Result};
use events::Subscribers;

pub const SETTINGS_FILENAME: &str = "project_settings.json";
pub const DIR_IMAGES: &str = "images";
pub const DIR_REPORTS: &str = "reports";

/// Evidence subfolders, in copy order.
pub const EVIDENCE_DIRS: [&str; 2] = [DIR_IMAGES, DIR_REPORTS];

pub(crate) const DATE_FMT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const FILENAME_TS_FMT: &str = "%Y%m%d_%H%M%S";
const FILENAME_TS_SHORT_FMT: &str = "%Y%m%d_%H%M";

const UNKNOWN_STANDARD: &str = "Unknown";
const AD_HOC_FOLDER_PREFIX: &str = "QuickTest";

/// Evidence subfolder selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceDir {
    Images,
    Reports,
}

impl EvidenceDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceDir::Images => DIR_IMAGES,
            EvidenceDir::Reports => DIR_REPORTS,
        }
    }
}

/// Behavior knobs resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Physical targets in scan order
    pub known_targets: Vec<String>,
    /// Tester name pre-filled into ad-hoc projects
    pub tester_name: String,
    /// Prefix of generated ad-hoc project numbers
    pub adhoc_prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            known_targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
            tester_name: "QuickUser".to_string(),
            adhoc_prefix: "ADHOC".to_string(),
        }
    }
}

/// Form data for a new full project.
#[derive(Debug, Clone, Default)]
pub struct ProjectForm {
    /// Parent directory of the project folder; `~` is expanded
    pub save_path: PathBuf,
    /// Desired folder name; a `_N` suffix is added on collision
    pub project_name: String,
    pub test_scope: Option<Vec<String>>,
    /// Additional schema-driven metadata
    pub fields: BTreeMap<String, InfoValue>,
}

impl ProjectForm {
    pub fn new(save_path: impl Into<PathBuf>, project_name: impl Into<String>) -> Self {
        Self {
            save_path: save_path.into(),
            project_name: project_name.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.save_path.as_os_str().is_empty() || self.project_name.trim().is_empty() {
            return Err(Error::Validation(
                "missing save path or project name".to_string(),
            ));
        }
        // Reserved keys in `fields` would serialize twice next to the typed slots
        if let Some(key) = self.fields.keys().find(|k| ProjectInfo::is_reserved(k)) {
            return Err(Error::Validation(format!(
                "{} is reserved and cannot be set as a project field",
                key
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Loaded {
    path: PathBuf,
    project: Project,
}

/// Owner of one open project folder.
pub struct ProjectStore {
    settings: StoreSettings,
    loaded: Option<Loaded>,
    standard: Option<StandardDefinition>,
    subscribers: Subscribers,
    uploads_tx: Sender<UploadEvent>,
    uploads_rx: Receiver<UploadEvent>,
}

impl ProjectStore {
    pub fn new(settings: StoreSettings) -> Self {
        let (uploads_tx, uploads_rx) = mpsc::channel();
        Self {
            settings,
            loaded: None,
            standard: None,
            subscribers: Subscribers::default(),
            uploads_tx,
            uploads_rx,
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Bind the standard used for new projects and visibility checks.
    pub fn set_standard(&mut self, standard: StandardDefinition) {
        self.standard = Some(standard);
    }

    pub fn standard(&self) -> Option<&StandardDefinition> {
        self.standard.as_ref()
    }

    pub fn project(&self) -> Option<&Project> {
        self.loaded.as_ref().map(|l| &l.project)
    }

    /// Folder of the open project.
    pub fn path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|l| l.path.as_path())
    }

    /// The open project and its folder, or `Error::NoProject`.
    pub fn require(&self) -> Result<(&Path, &Project)> {
        self.loaded
            .as_ref()
            .map(|l| (l.path.as_path(), &l.project))
            .ok_or(Error::NoProject)
    }

    pub fn settings_path(&self) -> Option<PathBuf> {
        self.path().map(|p| p.join(SETTINGS_FILENAME))
    }

    /// Register an observer. Events are delivered after each successful persist.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.add(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: StoreEvent) {
        self.subscribers.emit(event);
    }

    /// Visibility rules for the open project against the bound standard.
    pub fn visibility(&self) -> Option<VisibilityResolver<'_>> {
        self.standard
            .as_ref()
            .map(|std| VisibilityResolver::new(self.project().map(|p| &p.info), std))
    }

    // === Creation and loading ===

    /// Create a full project folder and open it.
    pub fn create(&mut self, form: ProjectForm) -> Result<PathBuf> {
        form.validate()?;
        let base = std::path::absolute(expand_home(&form.save_path))?;
        let final_path = unique_path(&base.join(form.project_name.trim()));

        let mut info = ProjectInfo {
            project_type: ProjectType::Full,
            test_scope: form.test_scope,
            target_items: None,
            fields: form.fields,
        };
        info.fields
            .insert("project_name".to_string(), folder_name(&final_path).into());

        let (name, version) = self.standard_identity();
        self.init_folder_and_save(final_path, Project::new(name, version, info))
    }

    /// Create an ad-hoc project scoped to `selected_uids` under `base_path`.
    ///
    /// Metadata is pre-filled from the bound standard's metadata schema.
    pub fn create_ad_hoc(
        &mut self,
        selected_uids: Vec<String>,
        base_path: &Path,
    ) -> Result<PathBuf> {
        if base_path.as_os_str().is_empty() {
            return Err(Error::Validation("missing save path".to_string()));
        }
        let now = Local::now();
        let ts = now.format(FILENAME_TS_SHORT_FMT).to_string();
        let today = now.format(DATE_FMT).to_string();

        let base = std::path::absolute(expand_home(base_path))?;
        let final_path = unique_path(&base.join(format!("{}_{}", AD_HOC_FOLDER_PREFIX, ts)));
        let folder = folder_name(&final_path);

        let mut info = ProjectInfo {
            project_type: ProjectType::AdHoc,
            test_scope: None,
            target_items: Some(selected_uids),
            fields: BTreeMap::new(),
        };
        let schema = self
            .standard
            .as_ref()
            .map(|s| s.project_meta_schema.as_slice())
            .unwrap_or(&[]);
        for field in schema {
            let value = if field.key == "project_name" {
                InfoValue::Text(folder.clone())
            } else if field.kind == FieldKind::Text {
                self.ad_hoc_text_default(&field.key, &ts)
            } else {
                field.kind.default_value(&today)
            };
            info.set(&field.key, value)?;
        }
        // The schema must not override the scoping keys
        info.project_type = ProjectType::AdHoc;

        let (name, version) = self.standard_identity();
        self.init_folder_and_save(final_path, Project::new(name, version, info))
    }

    fn ad_hoc_text_default(&self, key: &str, ts: &str) -> InfoValue {
        let key = key.to_lowercase();
        if key.contains("id") || key.contains("no") {
            InfoValue::Text(format!("{}-{}", self.settings.adhoc_prefix, ts))
        } else if key.contains("tester") || key.contains("user") {
            InfoValue::Text(self.settings.tester_name.clone())
        } else {
            InfoValue::Text("-".to_string())
        }
    }

    fn standard_identity(&self) -> (String, String) {
        match &self.standard {
            Some(std) => (std.standard_name.clone(), std.standard_version.clone()),
            None => (UNKNOWN_STANDARD.to_string(), UNKNOWN_STANDARD.to_string()),
        }
    }

    fn init_folder_and_save(&mut self, path: PathBuf, project: Project) -> Result<PathBuf> {
        create_evidence_dirs(&path)?;
        atomic::save(&path.join(SETTINGS_FILENAME), &project)?;
        tracing::info!(path = %path.display(), kind = %project.project_type(), "created project");

        self.loaded = Some(Loaded {
            path: path.clone(),
            project,
        });
        self.emit(StoreEvent::DataChanged);
        Ok(path)
    }

    /// Open the project stored in `folder`.
    pub fn load(&mut self, folder: &Path) -> Result<()> {
        let settings = folder.join(SETTINGS_FILENAME);
        if !settings.is_file() {
            return Err(Error::NotFound(format!(
                "missing settings file: {}",
                settings.display()
            )));
        }
        let project: Project = atomic::load(&settings)?;
        tracing::debug!(
            path = %folder.display(),
            standard = %project.standard_name,
            "loaded project"
        );

        self.loaded = Some(Loaded {
            path: folder.to_path_buf(),
            project,
        });
        self.emit(StoreEvent::DataChanged);
        Ok(())
    }

    /// Re-read the open project from disk.
    pub fn reload(&mut self) -> Result<()> {
        let path = self.path().ok_or(Error::NoProject)?.to_path_buf();
        self.load(&path)
    }

    /// Standard name recorded in another project folder, if readable.
    pub fn peek_standard(folder: &Path) -> Option<String> {
        let doc: serde_json::Value = atomic::load(&folder.join(SETTINGS_FILENAME)).ok()?;
        doc.get("standard_name")?.as_str().map(String::from)
    }

    // === Mutations ===

    /// Apply `mutate` to a copy of the project, persist it, then commit.
    pub(crate) fn commit<F>(&mut self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Project) -> Result<()>,
    {
        let loaded = self.loaded.as_mut().ok_or(Error::NoProject)?;
        let mut next = loaded.project.clone();
        mutate(&mut next)?;
        atomic::save(&loaded.path.join(SETTINGS_FILENAME), &next)?;
        loaded.project = next;

        self.emit(StoreEvent::DataChanged);
        Ok(())
    }

    /// Merge `patch` into `info`.
    pub fn update_info(&mut self, patch: BTreeMap<String, InfoValue>) -> Result<()> {
        let keys: Vec<String> = patch.keys().cloned().collect();
        self.commit(|project| project.info.merge(patch))?;
        tracing::info!(?keys, "updated project info");
        Ok(())
    }

    /// Write the result for `(uid, target)` and record whether it is shared.
    ///
    /// Shared results are not fanned out here; callers write each real target.
    pub fn update_result(
        &mut self,
        uid: &str,
        target: &str,
        mut result: TargetResult,
        is_shared: bool,
    ) -> Result<()> {
        if uid.is_empty() || target.is_empty() {
            return Err(Error::Validation("uid and target are required".to_string()));
        }
        if target == META_KEY {
            return Err(Error::Validation(format!("'{}' is a reserved key", META_KEY)));
        }

        result.last_updated = Some(Local::now().format(DATETIME_FMT).to_string());
        self.commit(|project| {
            let entry = project.tests.entry(uid.to_string()).or_default();
            entry.targets.insert(target.to_string(), result);
            entry.meta.get_or_insert_with(EntryMeta::default).is_shared = is_shared;
            Ok(())
        })?;
        tracing::info!(uid, target, is_shared, "updated result");
        Ok(())
    }

    /// Replace the ad-hoc whitelist and drop records of removed items.
    ///
    /// Evidence files of removed items stay on disk.
    pub fn update_ad_hoc_whitelist(
        &mut self,
        new_whitelist: Vec<String>,
        removed_uids: &[String],
    ) -> Result<()> {
        self.commit(|project| {
            project.info.target_items = Some(new_whitelist);
            for uid in removed_uids {
                if project.tests.remove(uid).is_some() {
                    tracing::info!(uid = %uid, "deleted results of removed item");
                }
            }
            Ok(())
        })
    }

    // === Queries ===

    pub fn result(&self, uid: &str, target: &str) -> Option<&TargetResult> {
        self.project().and_then(|p| p.result(uid, target))
    }

    pub fn meta(&self, uid: &str) -> EntryMeta {
        self.project()
            .and_then(|p| p.tests.get(uid))
            .and_then(|entry| entry.meta)
            .unwrap_or_default()
    }

    /// Status of each configured target of `item`.
    pub fn status_of(&self, item: &ChecklistItem) -> BTreeMap<String, ItemStatus> {
        item.targets
            .iter()
            .map(|target| {
                let status = self
                    .result(item.key(), target)
                    .map(|r| r.result.item_status())
                    .unwrap_or(ItemStatus::NotTested);
                (target.clone(), status)
            })
            .collect()
    }

    /// True when every configured target has a judged result.
    pub fn is_fully_completed(&self, item: &ChecklistItem) -> bool {
        item.targets.iter().all(|target| {
            self.result(item.key(), target)
                .is_some_and(|r| r.result != ResultStatus::Unchecked)
        })
    }

    // === Evidence ===

    /// Copy `src` into an evidence folder under a timestamped name.
    ///
    /// Returns the project-relative path to store in an attachment.
    pub fn import_file(&self, src: &Path, dir: EvidenceDir) -> Result<String> {
        let (root, _) = self.require()?;
        let file_name = src
            .file_name()
            .ok_or_else(|| Error::Validation(format!("not a file: {}", src.display())))?
            .to_string_lossy();

        let new_name = format!("{}_{}", Local::now().format(FILENAME_TS_FMT), file_name);
        let target_dir = root.join(dir.as_str());
        fs::create_dir_all(&target_dir)?;
        fs::copy(src, target_dir.join(&new_name))?;

        Ok(format!("{}/{}", dir.as_str(), new_name))
    }

    /// Path of `full` relative to the project root, with forward slashes.
    pub fn relative_path(&self, full: &Path) -> String {
        let rel = match self.path() {
            Some(root) => full.strip_prefix(root).unwrap_or(full),
            None => full,
        };
        rel.to_string_lossy().replace('\\', "/")
    }

    /// Sender handed to the upload listener thread.
    pub fn upload_sender(&self) -> Sender<UploadEvent> {
        self.uploads_tx.clone()
    }

    /// Apply every queued upload on the calling thread.
    ///
    /// Stops at the first failing event and returns its error; later events
    /// stay queued for the next call.
    pub fn pump_uploads(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Ok(event) = self.uploads_rx.try_recv() {
            self.handle_upload(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Record one uploaded photo.
    ///
    /// Photos of a physical target update `info["<target>_<category>_path"]`;
    /// photos of an item with a `result_target` are appended to that result.
    pub fn handle_upload(&mut self, event: UploadEvent) -> Result<()> {
        self.require()?;
        let rel = self.relative_path(&event.file_path);

        if self.settings.known_targets.contains(&event.target_id) {
            let key = format!("{}_{}_path", event.target_id, event.category);
            self.update_info(BTreeMap::from([(key, InfoValue::Text(rel.clone()))]))?;
        } else if let Some(target) = &event.result_target {
            let mut result = self
                .result(&event.target_id, target)
                .cloned()
                .unwrap_or_default();
            result
                .attachments
                .push(Attachment::new(AttachmentKind::Image, rel.clone(), event.category.clone()));
            let shared = self.meta(&event.target_id).is_shared;
            self.update_result(&event.target_id, target, result, shared)?;
        }

        tracing::debug!(
            target = %event.target_id,
            category = %event.category,
            path = %rel,
            "photo received"
        );
        self.emit(StoreEvent::PhotoReceived {
            target: event.target_id,
            category: event.category,
            path: rel,
        });
        Ok(())
    }

    /// Upload URL for the phone, starting the listener if needed.
    pub fn mobile_link(
        &self,
        listener: &mut dyn EvidenceListener,
        target_id: &str,
        target_name: &str,
        is_report: bool,
    ) -> Result<String> {
        let (root, _) = self.require()?;
        if !listener.is_running() {
            listener.start()?;
        }
        let token =
            listener.issue_token(target_id, target_name, is_report, &root.join(DIR_IMAGES))?;
        Ok(format!(
            "{}/upload?token={}",
            listener.base_url().trim_end_matches('/'),
            token
        ))
    }
}

/// `target`, or the first of `target_1`, `target_2`, ... that does not exist.
pub fn unique_path(target: &Path) -> PathBuf {
    if !target.exists() {
        return target.to_path_buf();
    }
    let base = target.as_os_str().to_string_lossy().to_string();
    (1..)
        .map(|i| PathBuf::from(format!("{}_{}", base, i)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| target.to_path_buf())
}

pub(crate) fn create_evidence_dirs(root: &Path) -> Result<()> {
    fs::create_dir_all(root)?;
    for dir in EVIDENCE_DIRS {
        fs::create_dir_all(root.join(dir))?;
    }
    Ok(())
}

pub(crate) fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
