//! Standard catalog and configuration commands.

use serde::Serialize;
use std::path::PathBuf;

use super::{Context, Output, display};
use crate::Result;
use crate::config::ResolvedConfig;
use crate::models::StandardDefinition;
use crate::standards::StandardEntry;

#[derive(Serialize)]
pub struct StandardList {
    pub dir: PathBuf,
    pub standards: Vec<StandardEntry>,
}

impl Output for StandardList {
    fn to_human(&self) -> String {
        if self.standards.is_empty() {
            return format!("No standards in {}", display(&self.dir));
        }
        self.standards
            .iter()
            .map(|entry| format!("{}  ({})", entry.name, display(&entry.path)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn standard_list(ctx: &Context) -> Result<StandardList> {
    let catalog = ctx.catalog();
    Ok(StandardList {
        dir: catalog.dir().to_path_buf(),
        standards: catalog.list_available()?,
    })
}

#[derive(Serialize)]
pub struct StandardShown {
    #[serde(flatten)]
    pub standard: StandardDefinition,
}

impl Output for StandardShown {
    fn to_human(&self) -> String {
        let s = &self.standard;
        let mut lines = vec![format!("{} {}", s.standard_name, s.standard_version)];
        if !s.project_meta_schema.is_empty() {
            let keys: Vec<&str> = s.project_meta_schema.iter().map(|f| f.key.as_str()).collect();
            lines.push(format!("  Fields: {}", keys.join(", ")));
        }
        for section in &s.test_standards {
            lines.push(format!(
                "  [{}] {}",
                section.section_id,
                section.section_name.as_deref().unwrap_or("")
            ));
            for item in &section.items {
                lines.push(format!(
                    "    {} {} ({}) criteria {}",
                    item.key(),
                    item.name,
                    item.targets.join("/"),
                    item.criteria_version.as_deref().unwrap_or("-")
                ));
            }
        }
        lines.join("\n")
    }
}

/// Show the named standard, or the latest one.
pub fn standard_show(ctx: &Context, name: Option<&str>) -> Result<StandardShown> {
    Ok(StandardShown {
        standard: ctx.resolve_standard(name)?,
    })
}

#[derive(Serialize)]
pub struct ConfigShown {
    #[serde(flatten)]
    pub config: ResolvedConfig,
    pub build: BuildInfo,
}

#[derive(Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub built: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: env!("CW_GIT_COMMIT"),
            built: env!("CW_BUILD_TIMESTAMP"),
        }
    }
}

impl Output for ConfigShown {
    fn to_human(&self) -> String {
        let c = &self.config;
        let line = |key: &str, value: String, source: &dyn std::fmt::Display| {
            format!("{} = {} ({})", key, value, source)
        };
        [
            line(
                "standards-dir",
                display(&c.standards_dir.value),
                &c.standards_dir.source,
            ),
            line(
                "default-save-path",
                display(&c.default_save_path.value),
                &c.default_save_path.source,
            ),
            line("tester-name", c.tester_name.value.clone(), &c.tester_name.source),
            line("adhoc-prefix", c.adhoc_prefix.value.clone(), &c.adhoc_prefix.source),
            line("targets", c.targets.value.join(", "), &c.targets.source),
            line(
                "output-format",
                c.output_format.value.as_str().to_string(),
                &c.output_format.source,
            ),
            line("action-log", c.action_log.value.to_string(), &c.action_log.source),
            line(
                "action-log-path",
                display(&c.action_log_path.value),
                &c.action_log_path.source,
            ),
            format!(
                "cw {} ({}, built {})",
                self.build.version, self.build.commit, self.build.built
            ),
        ]
        .join("\n")
    }
}

pub fn config_show(ctx: &Context) -> ConfigShown {
    ConfigShown {
        config: ctx.config.clone(),
        build: BuildInfo::current(),
    }
}
