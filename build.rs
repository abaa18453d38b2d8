//! Stamps the `cw` binary with the build details that `cw config show` reports.
//!
//! - `CW_BUILD_TIMESTAMP`: UTC build time, taken from `SOURCE_DATE_EPOCH` when
//!   set so packaged builds are reproducible
//! - `CW_GIT_COMMIT`: short commit hash with a `-dirty` suffix for uncommitted
//!   changes, or "unknown" outside a git checkout

use chrono::{DateTime, Utc};
use std::process::Command;

const TIMESTAMP_FMT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    println!("cargo:rustc-env=CW_BUILD_TIMESTAMP={}", build_time().format(TIMESTAMP_FMT));

    let commit = git(&["rev-parse", "--short", "HEAD"]).map(|hash| {
        match git(&["status", "--porcelain", "--untracked-files=no"]) {
            Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
            _ => hash,
        }
    });
    println!(
        "cargo:rustc-env=CW_GIT_COMMIT={}",
        commit.unwrap_or_else(|| "unknown".to_string())
    );
}

fn build_time() -> DateTime<Utc> {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

/// Trimmed stdout of a successful git command.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|out| out.trim().to_string())
}
