//! Discovery and loading of checklist standard files.
//!
//! Standards are JSON files kept in one directory (configured as
//! `standards-dir`). Files may carry a UTF-8 byte order mark.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::StandardDefinition;
use crate::{Error, Result};

const BOM: char = '\u{feff}';

/// A standard file found in the catalog directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardEntry {
    /// `standard_name`, or a fallback derived from the file
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StandardCatalog {
    dir: PathBuf,
}

impl StandardCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every `*.json` file, sorted by display name descending.
    ///
    /// Unreadable files are listed with a marker instead of failing the listing.
    pub fn list_available(&self) -> Result<Vec<StandardEntry>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let name = match read_json(&path) {
                Ok(doc) => display_name(&doc, &file),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable standard file");
                    format!("{} (unreadable)", file)
                }
            };
            entries.push(StandardEntry { name, path });
        }

        entries.sort_by(|a, b| b.name.cmp(&a.name).then_with(|| b.path.cmp(&a.path)));
        Ok(entries)
    }

    /// Load and validate one standard file.
    pub fn load(&self, path: &Path) -> Result<StandardDefinition> {
        load_standard(path)
    }

    /// The first listed standard whose display name equals `name`.
    pub fn find_by_name(&self, name: &str) -> Result<StandardDefinition> {
        let entry = self
            .list_available()?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| Error::NotFound(format!("standard '{}'", name)))?;
        load_standard(&entry.path)
    }

    /// The standard named `name` at `version`, falling back to the first one
    /// named `name` when no file carries that version.
    pub fn find_version(&self, name: &str, version: &str) -> Result<StandardDefinition> {
        let mut first = None;
        for entry in self.list_available()?.into_iter().filter(|e| e.name == name) {
            match load_standard(&entry.path) {
                Ok(std) if std.standard_version == version => return Ok(std),
                Ok(std) => {
                    first.get_or_insert(std);
                }
                Err(e) => {
                    tracing::debug!(path = %entry.path.display(), error = %e, "skipping standard")
                }
            }
        }
        first.ok_or_else(|| Error::NotFound(format!("standard '{}'", name)))
    }

    /// The first standard in listing order.
    pub fn latest(&self) -> Result<StandardDefinition> {
        let entry = self
            .list_available()?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::NotFound(format!("no standards in {}", self.dir.display()))
            })?;
        load_standard(&entry.path)
    }

    /// Load `name_or_path` as a file when it exists, else look it up by name.
    pub fn resolve(&self, name_or_path: &str) -> Result<StandardDefinition> {
        let path = Path::new(name_or_path);
        if path.is_file() {
            load_standard(path)
        } else {
            self.find_by_name(name_or_path)
        }
    }
}

/// Load a standard, requiring `test_standards` and a non-empty `uid` on every item.
pub fn load_standard(path: &Path) -> Result<StandardDefinition> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let doc = read_json(path).map_err(|e| match e {
        Error::Json(_) => Error::Validation(format!("{} is not valid JSON", file)),
        other => other,
    })?;
    validate_integrity(&doc, &file)?;

    let standard: StandardDefinition = serde_json::from_value(doc)
        .map_err(|e| Error::Validation(format!("{}: {}", file, e)))?;
    tracing::debug!(
        name = %standard.standard_name,
        version = %standard.standard_version,
        "loaded standard"
    );
    Ok(standard)
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(raw.trim_start_matches(BOM))?)
}

fn display_name(doc: &Value, file: &str) -> String {
    if let Some(name) = doc.get("standard_name").and_then(Value::as_str) {
        name.to_string()
    } else if let Some(version) = doc.get("standard_version") {
        let version = version
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| version.to_string());
        format!("Standard version {} ({})", version, file)
    } else {
        file.to_string()
    }
}

fn validate_integrity(doc: &Value, file: &str) -> Result<()> {
    let Some(sections) = doc.get("test_standards") else {
        return Err(Error::Validation(format!(
            "{}: missing 'test_standards'",
            file
        )));
    };

    for section in sections.as_array().into_iter().flatten() {
        let section_id = section
            .get("section_id")
            .map(label)
            .unwrap_or_else(|| "Unknown".to_string());
        let items = section.get("items").and_then(Value::as_array);
        for item in items.into_iter().flatten() {
            let has_uid = item
                .get("uid")
                .is_some_and(|uid| !uid.is_null() && uid.as_str() != Some(""));
            if !has_uid {
                let item_id = item
                    .get("id")
                    .map(label)
                    .unwrap_or_else(|| "Unknown ID".to_string());
                return Err(Error::Validation(format!(
                    "{}: section {} item {} has no 'uid'; standards without UIDs cannot be loaded",
                    file, section_id, item_id
                )));
            }
        }
    }
    Ok(())
}

fn label(value: &Value) -> String {
    value
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    const V1: &str = r#"{"standard_name": "Drone A", "standard_version": "1.0",
        "test_standards": [{"section_id": 1, "items": [{"id": "1.1", "uid": "U1"}]}]}"#;
    const V2: &str = r#"{"standard_name": "Drone B", "standard_version": "2.0",
        "test_standards": [{"section_id": 1, "items": [{"id": "1.1", "uid": "U1"}]}]}"#;

    #[test]
    fn test_list_sorted_descending_with_fallbacks() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", V1);
        write(&dir, "b.json", V2);
        write(&dir, "c.json", r#"{"standard_version": "0.1", "test_standards": []}"#);
        write(&dir, "d.json", "not json");
        write(&dir, "notes.txt", "ignored");

        let names: Vec<String> = StandardCatalog::new(dir.path())
            .list_available()
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "d.json (unreadable)",
                "Standard version 0.1 (c.json)",
                "Drone B",
                "Drone A"
            ]
        );
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let catalog = StandardCatalog::new(dir.path().join("absent"));
        assert!(catalog.list_available().unwrap().is_empty());
        assert!(matches!(catalog.latest(), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_load_tolerates_bom() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bom.json", &format!("\u{feff}{}", V1));
        let std = load_standard(&path).unwrap();
        assert_eq!(std.standard_name, "Drone A");
        assert_eq!(std.test_standards[0].section_id, "1");
    }

    #[test]
    fn test_load_rejects_missing_uid() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bad.json",
            r#"{"test_standards": [{"section_id": "3", "items": [{"id": "3.2", "uid": ""}]}]}"#,
        );
        let err = load_standard(&path).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(msg) if msg.contains("bad.json") && msg.contains("section 3 item 3.2")
        ));
    }

    #[test]
    fn test_load_rejects_missing_sections_and_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.json", r#"{"standard_name": "X"}"#);
        assert!(matches!(load_standard(&path), Err(Error::Validation(_))));
        let path = write(&dir, "broken.json", "{");
        assert!(matches!(
            load_standard(&path),
            Err(Error::Validation(msg)) if msg.contains("not valid JSON")
        ));
    }

    #[test]
    fn test_find_latest_and_resolve() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", V1);
        let v2 = write(&dir, "b.json", V2);
        let catalog = StandardCatalog::new(dir.path());

        assert_eq!(catalog.find_by_name("Drone A").unwrap().standard_version, "1.0");
        assert!(matches!(catalog.find_by_name("Nope"), Err(Error::NotFound(_))));
        assert_eq!(catalog.latest().unwrap().standard_name, "Drone B");
        assert_eq!(
            catalog.resolve(v2.to_str().unwrap()).unwrap().standard_name,
            "Drone B"
        );
        assert_eq!(catalog.resolve("Drone A").unwrap().standard_name, "Drone A");
    }

    #[test]
    fn test_find_version_prefers_exact_version() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", V1);
        write(&dir, "a2.json", &V1.replace("1.0", "1.1"));
        let catalog = StandardCatalog::new(dir.path());

        assert_eq!(catalog.find_version("Drone A", "1.0").unwrap().standard_version, "1.0");
        assert_eq!(catalog.find_version("Drone A", "1.1").unwrap().standard_version, "1.1");
        // Unknown version falls back to the first listed file of that name
        assert_eq!(catalog.find_version("Drone A", "9.9").unwrap().standard_version, "1.1");
        assert!(matches!(
            catalog.find_version("Drone B", "1.0"),
            Err(Error::NotFound(_))
        ));
    }
}
