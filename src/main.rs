//! Checkwright CLI - inspection project records and checklist-standard migration.

use checkwright::action_log;
use checkwright::cli::{
    Cli, Commands, ConfigCommands, EvidenceCommands, InfoCommands, MigrateCommands,
    ProjectCommands, ResultCommands, ScopeCommands, SnapshotCommands, StandardCommands,
};
use checkwright::commands::{self, Context, CreateOptions, ImportOptions, Output, ResultOptions};
use checkwright::config::{self, ConfigOverrides, OutputFormat};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `debug`, `checkwright=trace`).
const LOG_ENV: &str = "CW_LOG";

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let mut overrides = ConfigOverrides::new();
    if let Some(ref dir) = cli.standards_dir {
        overrides = overrides.with_standards_dir(dir);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }

    let config = match config::load(&overrides) {
        Ok(config) => config,
        Err(e) => exit_with(&e, cli.human_readable),
    };
    let human = *config.output_format() == OutputFormat::Human;

    // Project folder: -C flag > CW_PROJECT env (both via clap) > cwd
    let project_dir = cli
        .project_path
        .clone()
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let cmd_name = cli.command.name();
    let args_json = serde_json::to_value(&cli.command).unwrap_or(serde_json::Value::Null);
    let logged_project = touches_project(&cli.command).then(|| project_dir.clone());

    let start = Instant::now();
    let ctx = Context::new(config.clone(), project_dir);
    let result = run_command(cli.command, &ctx, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    action_log::log_action(
        &config,
        logged_project.as_deref(),
        cmd_name,
        args_json,
        success,
        error,
        duration,
    );

    if let Err(e) = result {
        exit_with(&e, human);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Whether the command operates on an existing project folder.
fn touches_project(command: &Commands) -> bool {
    !matches!(
        command,
        Commands::Standard { .. }
            | Commands::Config { .. }
            | Commands::Project {
                command: ProjectCommands::Create { .. }
                    | ProjectCommands::Quick { .. }
                    | ProjectCommands::Peek { .. }
            }
    )
}

fn exit_with(e: &checkwright::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

fn run_command(command: Commands, ctx: &Context, human: bool) -> Result<(), checkwright::Error> {
    match command {
        Commands::Project { command } => match command {
            ProjectCommands::Create {
                name,
                path,
                standard,
                scope,
                empty_scope,
                fields,
            } => {
                let opts = CreateOptions {
                    name,
                    path,
                    standard,
                    scope,
                    empty_scope,
                    fields,
                };
                output(&commands::project_create(ctx, opts)?, human);
            }
            ProjectCommands::Quick {
                items,
                path,
                standard,
            } => {
                let result = commands::project_quick(ctx, items, path, standard.as_deref())?;
                output(&result, human);
            }
            ProjectCommands::Show => output(&commands::project_show(ctx)?, human),
            ProjectCommands::Peek { folder } => output(&commands::project_peek(folder), human),
        },

        Commands::Info { command } => match command {
            InfoCommands::Set { pairs } => output(&commands::info_set(ctx, &pairs)?, human),
        },

        Commands::Result { command } => match command {
            ResultCommands::Set {
                uid,
                target,
                shared,
                status,
                description,
                criteria,
                attachments,
            } => {
                let opts = ResultOptions {
                    uid,
                    target,
                    shared,
                    status,
                    description,
                    criteria,
                    attachments,
                };
                output(&commands::result_set(ctx, opts)?, human);
            }
            ResultCommands::Show { uid } => output(&commands::result_show(ctx, &uid)?, human),
            ResultCommands::Status { uid } => output(&commands::result_status(ctx, &uid)?, human),
        },

        Commands::Scope { command } => match command {
            ScopeCommands::SetItems { items } => {
                output(&commands::scope_set_items(ctx, items)?, human)
            }
        },

        Commands::Visible => output(&commands::visible(ctx)?, human),

        Commands::Migrate { command } => match command {
            MigrateCommands::Plan { standard } => {
                output(&commands::migrate_plan(ctx, &standard)?, human)
            }
            MigrateCommands::Apply { standard, fork } => {
                let result = commands::migrate_apply(ctx, &standard, fork.as_deref())?;
                output(&result, human);
            }
        },

        Commands::Merge { source } => output(&commands::merge_project(ctx, &source)?, human),

        Commands::Snapshot { command } => match command {
            SnapshotCommands::List => output(&commands::snapshot_list(ctx)?, human),
            SnapshotCommands::Restore { name } => {
                output(&commands::snapshot_restore(ctx, &name)?, human)
            }
        },

        Commands::Standard { command } => match command {
            StandardCommands::List => output(&commands::standard_list(ctx)?, human),
            StandardCommands::Show { name } => {
                output(&commands::standard_show(ctx, name.as_deref())?, human)
            }
        },

        Commands::Evidence { command } => match command {
            EvidenceCommands::Import {
                file,
                report,
                uid,
                target,
                title,
            } => {
                let opts = ImportOptions {
                    file,
                    report,
                    uid,
                    target,
                    title,
                };
                output(&commands::evidence_import(ctx, opts)?, human);
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(ctx), human),
        },
    }
    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
