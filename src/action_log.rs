//! Action logging for checkwright commands.
//!
//! Every CLI invocation is appended to a structured log file in JSONL format
//! unless disabled with `action-log #false` in config.kdl.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::config::ResolvedConfig;

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Project folder the command targeted, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,

    /// Command name (e.g., "result set", "migrate apply")
    pub command: String,

    /// Command arguments as JSON
    pub args: Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to the configured log file.
///
/// Never fails; problems writing the log are reported as warnings so that
/// logging cannot break a command.
pub fn log_action(
    config: &ResolvedConfig,
    project_path: Option<&Path>,
    command: &str,
    args: Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if !config.action_log.value {
        return;
    }

    let entry = ActionLog {
        timestamp: Utc::now(),
        project_path: project_path.map(|p| p.to_string_lossy().to_string()),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    let log_path = &config.action_log_path.value;
    if let Err(e) = write_log_entry(log_path, &entry) {
        tracing::warn!(path = %log_path.display(), error = %e, "failed to write action log");
    }
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)
}

/// Argument keys that hold paths outside the project; only the file name is logged.
const PATH_KEYS: [&str; 5] = ["file", "folder", "path", "source", "standard"];

/// Longest string logged verbatim, in characters.
const MAX_TEXT_CHARS: usize = 100;

/// Longer lists (item whitelists, criteria, attachments) are logged as a count.
const MAX_LIST_ITEMS: usize = 10;

/// Reduce command arguments to what is worth keeping in the log.
fn sanitize_args(args: &Value) -> Value {
    sanitize_value(None, args)
}

fn sanitize_value(key: Option<&str>, value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let sanitized = if is_sensitive(k) {
                        Value::String("[REDACTED]".to_string())
                    } else {
                        sanitize_value(Some(k.as_str()), v)
                    };
                    (k.clone(), sanitized)
                })
                .collect(),
        ),
        Value::Array(items) if items.len() > MAX_LIST_ITEMS => {
            Value::String(format!("[{} items]", items.len()))
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| sanitize_value(key, v)).collect())
        }
        Value::String(s) => {
            let s = match key {
                Some(k) if PATH_KEYS.contains(&k) => file_name_of(s),
                _ => s.as_str(),
            };
            Value::String(truncate_chars(s))
        }
        _ => value.clone(),
    }
}

/// Upload tokens grant write access to a project folder.
fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("token") || key.contains("secret")
}

fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Truncate on a character boundary; descriptions are often not ASCII.
fn truncate_chars(s: &str) -> String {
    let count = s.chars().count();
    if count > MAX_TEXT_CHARS {
        let head: String = s.chars().take(MAX_TEXT_CHARS - 3).collect();
        format!("{}... ({} chars)", head, count)
    } else {
        s.to_string()
    }
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
