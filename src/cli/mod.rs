//! CLI argument definitions for checkwright.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Checkwright - inspection project records and checklist-standard migration.
///
/// Open a project folder with `-C <dir>` (or `CW_PROJECT`), or run inside it.
#[derive(Parser, Debug)]
#[command(name = "cw")]
#[command(
    author,
    version,
    about = "Inspection project records and checklist-standard migration",
    long_about = None
)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Project folder to operate on (defaults to the current directory).
    /// Can also be set via CW_PROJECT environment variable.
    #[arg(short = 'C', long = "project", global = true, env = "CW_PROJECT")]
    pub project_path: Option<PathBuf>,

    /// Directory of standard definition files (overrides config.kdl)
    #[arg(long, global = true, env = "CW_STANDARDS_DIR")]
    pub standards_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum Commands {
    /// Project folder commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Project metadata commands
    Info {
        #[command(subcommand)]
        command: InfoCommands,
    },

    /// Record and inspect judgements
    Result {
        #[command(subcommand)]
        command: ResultCommands,
    },

    /// Ad-hoc scope commands
    Scope {
        #[command(subcommand)]
        command: ScopeCommands,
    },

    /// List the sections and items in scope for the open project
    Visible,

    /// Move the open project to another standard version
    Migrate {
        #[command(subcommand)]
        command: MigrateCommands,
    },

    /// Merge an ad-hoc project's results into the open full project
    Merge {
        /// Folder of the ad-hoc project to merge
        source: PathBuf,
    },

    /// Pre-migration snapshot commands
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Standard definition commands
    Standard {
        #[command(subcommand)]
        command: StandardCommands,
    },

    /// Evidence file commands
    Evidence {
        #[command(subcommand)]
        command: EvidenceCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum ProjectCommands {
    /// Create a full project folder
    Create {
        /// Folder name; `_1`, `_2`, ... is appended when taken
        name: String,

        /// Parent folder (defaults to `default-save-path`)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Standard name or file (defaults to the latest standard)
        #[arg(short, long)]
        standard: Option<String>,

        /// Section in scope; repeat for several. Omit for every section
        #[arg(long, value_delimiter = ',')]
        scope: Option<Vec<String>>,

        /// Start with no section in scope
        #[arg(long, conflicts_with = "scope")]
        empty_scope: bool,

        /// Additional metadata as key=value
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },

    /// Create an ad-hoc project for a handful of items
    Quick {
        /// Item UIDs in scope
        #[arg(required = true)]
        items: Vec<String>,

        /// Parent folder (defaults to `default-save-path`)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Standard name or file (defaults to the latest standard)
        #[arg(short, long)]
        standard: Option<String>,
    },

    /// Show the open project document
    Show,

    /// Print the standard name recorded in a project folder
    Peek {
        folder: PathBuf,
    },
}

/// Info subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum InfoCommands {
    /// Set metadata values (key=value; comma-separated values become lists)
    Set {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

/// Result subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum ResultCommands {
    /// Record a judgement for one target, or for every target with --shared
    Set {
        /// Item UID
        uid: String,

        /// Target name (e.g. UAV, GCS); omit with --shared
        #[arg(required_unless_present = "shared")]
        target: Option<String>,

        /// Apply one judgement to every target of the item
        #[arg(long, conflicts_with = "target")]
        shared: bool,

        /// pass, fail, na or unchecked
        #[arg(short, long)]
        status: String,

        /// Judgement rationale
        #[arg(short, long)]
        description: Option<String>,

        /// Sub-criterion state as name=true|false
        #[arg(long = "criterion")]
        criteria: Vec<String>,

        /// Attachment path relative to the project (type inferred from folder)
        #[arg(short, long = "attach")]
        attachments: Vec<String>,
    },

    /// Show the recorded results of an item
    Show {
        uid: String,
    },

    /// Show per-target status and completion of an item
    Status {
        uid: String,
    },
}

/// Scope subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum ScopeCommands {
    /// Replace the ad-hoc item whitelist; results of dropped items are deleted
    SetItems {
        #[arg(required = true)]
        items: Vec<String>,
    },
}

/// Migrate subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum MigrateCommands {
    /// Show how each item would be classified
    Plan {
        /// Standard name or file to migrate to
        standard: String,
    },

    /// Apply the migration in place, or into a new folder with --fork
    Apply {
        /// Standard name or file to migrate to
        standard: String,

        /// Name of a new sibling folder to write instead of migrating in place
        #[arg(long)]
        fork: Option<String>,
    },
}

/// Snapshot subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum SnapshotCommands {
    /// List snapshots of the open project, newest first
    List,

    /// Restore a snapshot over the live document
    Restore {
        /// Snapshot file name
        name: String,
    },
}

/// Standard subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum StandardCommands {
    /// List available standards
    List,

    /// Show one standard (defaults to the latest)
    Show {
        name: Option<String>,
    },
}

/// Evidence subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum EvidenceCommands {
    /// Copy a file into the project and optionally attach it to a result
    Import {
        file: PathBuf,

        /// Store under reports/ instead of images/
        #[arg(long)]
        report: bool,

        /// Item UID to attach the file to
        #[arg(long, requires = "target")]
        uid: Option<String>,

        /// Target of the result to attach to
        #[arg(long, requires = "uid")]
        target: Option<String>,

        /// Attachment title
        #[arg(long, default_value = "")]
        title: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Serialize)]
#[serde(untagged)]
pub enum ConfigCommands {
    /// Show resolved configuration values and their sources
    Show,
}

impl Commands {
    /// Command name as written on the command line, e.g. "result set".
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Project { command } => match command {
                ProjectCommands::Create { .. } => "project create",
                ProjectCommands::Quick { .. } => "project quick",
                ProjectCommands::Show => "project show",
                ProjectCommands::Peek { .. } => "project peek",
            },
            Commands::Info { .. } => "info set",
            Commands::Result { command } => match command {
                ResultCommands::Set { .. } => "result set",
                ResultCommands::Show { .. } => "result show",
                ResultCommands::Status { .. } => "result status",
            },
            Commands::Scope { .. } => "scope set-items",
            Commands::Visible => "visible",
            Commands::Migrate { command } => match command {
                MigrateCommands::Plan { .. } => "migrate plan",
                MigrateCommands::Apply { .. } => "migrate apply",
            },
            Commands::Merge { .. } => "merge",
            Commands::Snapshot { command } => match command {
                SnapshotCommands::List => "snapshot list",
                SnapshotCommands::Restore { .. } => "snapshot restore",
            },
            Commands::Standard { command } => match command {
                StandardCommands::List => "standard list",
                StandardCommands::Show { .. } => "standard show",
            },
            Commands::Evidence { .. } => "evidence import",
            Commands::Config { .. } => "config show",
        }
    }
}
