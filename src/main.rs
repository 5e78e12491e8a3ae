use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use planner_backup::cli::{handle_backup_command, BackupCommands};
use planner_backup::config::{PlannerPaths, Settings};
use planner_backup::error::{BackupError, PlannerError, RestoreError};
use planner_backup::models::EntityKind;
use planner_backup::storage::PlannerStore;

/// Environment variable holding the log filter
const LOG_ENV: &str = "PLANNER_LOG";

#[derive(Parser)]
#[command(
    name = "planner",
    version,
    about = "Local backup and restore for the offline planner",
    long_about = "Creates, lists, inspects and restores backups of your planner \
                  data (events, meals, tasks and notifications). Backups can be \
                  protected with a password and never leave this machine."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Show paths, settings and stored item counts
    Status,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// 1 for mistakes the user can fix, 2 for everything else
fn exit_code(err: &anyhow::Error) -> u8 {
    let user_error = if let Some(e) = err.downcast_ref::<RestoreError>() {
        e.is_user_error()
    } else if let Some(e) = err.downcast_ref::<BackupError>() {
        e.is_user_error()
    } else if let Some(e) = err.downcast_ref::<PlannerError>() {
        e.is_user_error()
    } else {
        false
    };

    if user_error {
        1
    } else {
        2
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = PlannerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    if !paths.settings_file().exists() {
        settings.save(&paths)?;
    }

    match cli.command {
        Some(Commands::Backup(cmd)) => handle_backup_command(&paths, &settings, cmd)?,
        Some(Commands::Status) => show_status(&paths, &settings)?,
        None => {
            println!("planner - local backup and restore for your planner data");
            println!();
            println!("Run 'planner --help' for usage information.");
            println!("Run 'planner backup create' to take your first backup.");
        }
    }

    Ok(())
}

fn show_status(paths: &PlannerPaths, settings: &Settings) -> Result<()> {
    let store = PlannerStore::open(paths.store_file())?;

    println!("Planner Status");
    println!("==============");
    println!("Base directory:   {}", paths.base_dir().display());
    println!("Store file:       {}", paths.store_file().display());
    println!("Backup directory: {}", paths.backup_dir().display());
    println!();
    println!("Settings:");
    println!(
        "  Include notifications:   {}",
        settings.backup.include_notifications
    );
    println!(
        "  Encrypt with device key: {}",
        settings.backup.encrypt_with_device_key
    );
    println!(
        "  Compression level:       {}",
        settings.backup.compression_level
    );
    println!();
    println!("Stored items:");
    for kind in EntityKind::ALL {
        println!("  {:<15}{}", format!("{}:", kind.plural()), store.count(kind)?);
    }

    Ok(())
}
