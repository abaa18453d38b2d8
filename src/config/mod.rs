//! Configuration for checkwright.
//!
//! ## config.kdl - User preferences
//!
//! Located at `$CW_CONFIG` when set, otherwise
//! `~/.config/checkwright/config.kdl` (platform config dir).
//!
//! Contains:
//! - `standards-dir` - Directory of standard definition files
//! - `default-save-path` - Parent folder for new projects
//! - `tester-name`, `adhoc-prefix` - Ad-hoc project defaults
//! - `targets` - Physical targets in scan order
//! - `output-format` - "json" or "human"
//! - `action-log`, `action-log-path` - Command audit log
//!
//! ## Precedence
//!
//! CLI flag > config.kdl > defaults. Use the [`resolver`] module for
//! precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{ConfigOverrides, Resolved, ResolvedConfig, ValueSource, resolve_config};
pub use schema::{CheckwrightConfig, OutputFormat};

use kdl::KdlDocument;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "CW_CONFIG";

/// Path of config.kdl, or `None` when no config directory is known.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Some(expand_home(path));
        }
    }
    dirs::config_dir().map(|dir| dir.join("checkwright").join("config.kdl"))
}

/// Read and validate a config file. A missing file is an empty config.
pub fn load_config_file(path: &Path) -> Result<CheckwrightConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CheckwrightConfig::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    let config = CheckwrightConfig::from_kdl(&doc);
    config
        .validate()
        .map_err(|msg| Error::Config(format!("{}: {}", path.display(), msg)))?;
    Ok(config)
}

/// Load config.kdl from its default location and resolve it against `overrides`.
pub fn load(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    match config_path() {
        Some(path) => {
            let file = load_config_file(&path)?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(resolve_config(&file, &path.display().to_string(), overrides))
        }
        None => Ok(resolve_config(&CheckwrightConfig::new(), "", overrides)),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/Desktop"), home.join("Desktop"));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel~/x"), PathBuf::from("rel~/x"));
    }

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        let config = load_config_file(&dir.path().join("config.kdl")).unwrap();
        assert_eq!(config, CheckwrightConfig::new());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.kdl");
        fs::write(&path, "targets {").unwrap();
        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));

        fs::write(&path, r#"output-format "yaml""#).unwrap();
        assert!(matches!(
            load_config_file(&path),
            Err(Error::Config(msg)) if msg.contains("output-format")
        ));
    }

    #[test]
    #[serial]
    fn test_load_honors_config_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.kdl");
        fs::write(&path, "tester-name \"Kim\"\ntargets \"GCS\"").unwrap();

        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var(CONFIG_PATH_ENV, &path) };
        let config = load(&ConfigOverrides::new());
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };

        let config = config.unwrap();
        assert_eq!(config.tester_name.value, "Kim");
        assert_eq!(config.targets.value, vec!["GCS".to_string()]);
        assert_eq!(
            config.tester_name.source,
            ValueSource::ConfigFile(path.display().to_string())
        );
    }
}
