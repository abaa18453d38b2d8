//! Crash-consistent persistence of a single JSON document.
//!
//! Every write goes to `<path>.tmp`, is flushed and fsynced, and is then
//! renamed over `<path>`. A crash at any point leaves either the previous
//! document or the complete new one on disk.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Suffix appended to the document path for the in-flight copy.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Path of the temporary file used while saving `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(TEMP_SUFFIX);
    PathBuf::from(raw)
}

/// Serialize `document` as 4-space indented JSON and save it atomically.
pub fn save<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let bytes = to_pretty_json(document)?;
    write_bytes(path, &bytes)
}

/// Atomically replace `path` with `bytes`.
///
/// On failure the temp file is removed and the previous content of `path`
/// is left untouched.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path(path);

    let outcome = write_synced(&temp, bytes).and_then(|()| fs::rename(&temp, path));
    if let Err(e) = outcome {
        // Best effort; the temp path may not exist or may not be a file
        let _ = fs::remove_file(&temp);
        return Err(Error::Io(e));
    }

    sync_parent_dir(path);
    Ok(())
}

/// Load a whole document.
///
/// Returns `Error::NotFound` when `path` is absent and `Error::Json` when it
/// cannot be parsed.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(Error::Io(e)),
    };
    Ok(serde_json::from_str(&contents)?)
}

/// Durably copy `src` to `dst` using the same temp/fsync/rename protocol.
pub fn copy(src: &Path, dst: &Path) -> Result<()> {
    let bytes = fs::read(src)?;
    write_bytes(dst, &bytes)
}

fn to_pretty_json<T: Serialize>(document: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}

/// Persist the rename itself. Directory fsync is unavailable on some
/// platforms, so failures here are ignored.
fn sync_parent_dir(path: &Path) {
    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
