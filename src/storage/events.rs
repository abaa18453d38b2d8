//! Change notifications and inbound evidence-upload events.
//!
//! Observers receive [`StoreEvent`]s over `std::sync::mpsc` channels. The
//! upload listener runs on its own thread and only ever holds an
//! `mpsc::Sender<UploadEvent>`; the store applies queued uploads on its own
//! thread via `ProjectStore::pump_uploads`.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::Result;

/// Notification raised by the store after a successful persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The project document changed; views should refresh everything
    DataChanged,
    /// An uploaded photo was recorded
    PhotoReceived {
        /// Physical target or item UID the photo was taken for
        target: String,
        category: String,
        /// Path relative to the project root
        path: String,
    },
}

/// A file saved by the evidence-upload listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    /// Physical target (e.g. "UAV") or item UID
    pub target_id: String,
    /// Photo angle or report category chosen on the device
    pub category: String,
    /// Absolute path of the saved file
    pub file_path: PathBuf,
    /// When `target_id` is an item UID, the result target to attach to
    pub result_target: Option<String>,
}

/// Fan-out of store events to every live subscriber.
#[derive(Debug, Default)]
pub(crate) struct Subscribers {
    senders: Vec<Sender<StoreEvent>>,
}

impl Subscribers {
    pub(crate) fn add(&mut self, sender: Sender<StoreEvent>) {
        self.senders.push(sender);
    }

    /// Deliver `event`, dropping subscribers whose receiver is gone.
    pub(crate) fn emit(&mut self, event: StoreEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// The mobile evidence-upload listener, owned and injected by the caller.
///
/// Implementations serve an upload page guarded by short-lived tokens and
/// forward each saved file as an [`UploadEvent`] through the sender obtained
/// from `ProjectStore::upload_sender`.
pub trait EvidenceListener {
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Register a one-off upload token for `target_id`, saving into `save_dir`.
    fn issue_token(
        &mut self,
        target_id: &str,
        target_name: &str,
        is_report: bool,
        save_dir: &Path,
    ) -> Result<String>;

    /// Base URL reachable from the phone, e.g. `http://192.168.1.5:8000`.
    fn base_url(&self) -> String;
}
