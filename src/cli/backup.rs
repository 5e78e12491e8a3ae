//! Backup CLI commands
//!
//! Implements `planner backup create|list|restore|delete|inspect`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::backup::{BackupConfig, BackupManager, FileStore};
use crate::config::{PlannerPaths, Settings};
use crate::crypto::{CipherProvider, FileKeyStore, SecureString};
use crate::display;
use crate::error::{PlannerError, PlannerResult, RestoreError};
use crate::storage::PlannerStore;

/// Minimum length of a password typed at the prompt
const MIN_PROMPTED_PASSWORD_LEN: usize = 8;

/// Password options shared by `create` and `restore`
#[derive(Args, Debug, Default)]
pub struct PasswordArgs {
    /// Password protecting the backup
    #[arg(short, long, env = "PLANNER_BACKUP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Prompt for the password with hidden input
    #[arg(long)]
    pub ask_password: bool,
}

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        #[command(flatten)]
        password: PasswordArgs,

        /// Also back up events, meals and tasks already marked complete
        #[arg(long)]
        include_completed: bool,
    },

    /// List all available backups
    List,

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        #[command(flatten)]
        password: PasswordArgs,

        /// Remove all current data before restoring
        #[arg(long)]
        replace: bool,
    },

    /// Delete a backup
    Delete {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },

    /// Show information about a backup without restoring it
    Inspect {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },
}

/// Build a backup manager over the on-disk planner store
pub fn open_manager(paths: &PlannerPaths, settings: &Settings) -> PlannerResult<BackupManager> {
    paths.ensure_directories()?;
    let store = PlannerStore::open(paths.store_file())?;
    let cipher = CipherProvider::new(
        Arc::new(FileKeyStore::new(paths.device_key_file())),
        settings.backup.key_derivation,
    );
    Ok(BackupManager::new(
        Arc::new(store),
        cipher,
        FileStore::new(paths.backup_dir()),
        BackupConfig::from_settings(settings),
    ))
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &PlannerPaths,
    settings: &Settings,
    cmd: BackupCommands,
) -> Result<()> {
    let manager = open_manager(paths, settings)?;

    match cmd {
        BackupCommands::Create {
            password,
            include_completed,
        } => {
            let password = read_password(password, true)?;
            println!("Creating backup...");
            let job = manager.spawn_create(password, include_completed)?;
            let created = job.wait()?;
            println!("{}", display::format_created_backup(&created));
        }

        BackupCommands::List => {
            let backups = manager.list_backups()?;
            println!("{}", display::format_backup_list(&backups));
        }

        BackupCommands::Restore {
            backup,
            password,
            replace,
        } => {
            let backup_path = resolve_backup_path(&manager, paths, &backup)?;
            let password = read_password(password, false)?;

            println!("Restoring from {}...", backup_path.display());
            let job = manager.spawn_restore(backup_path, password, replace)?;
            match job.wait() {
                Ok(summary) => print!("{}", display::format_restore_summary(&summary)),
                Err(RestoreError::PasswordRequired) => {
                    eprintln!("This backup is password protected.");
                    eprintln!("Run again with --password or --ask-password.");
                    return Err(RestoreError::PasswordRequired.into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        BackupCommands::Delete { backup } => {
            let backup_path = resolve_backup_path(&manager, paths, &backup)?;
            manager.delete_backup(&backup_path).map_err(|e| match e.kind() {
                io::ErrorKind::InvalidInput => PlannerError::Validation(e.to_string()),
                io::ErrorKind::NotFound => PlannerError::backup_not_found(&backup),
                _ => PlannerError::Io(format!("Failed to delete backup: {}", e)),
            })?;
            println!("Deleted backup: {}", backup_path.display());
        }

        BackupCommands::Inspect { backup } => {
            let backup_path = resolve_backup_path(&manager, paths, &backup)?;
            let info = manager.inspect_backup(&backup_path)?;
            print!("{}", display::format_backup_info(&info));
        }
    }

    Ok(())
}

/// Resolve a backup identifier to a full path
///
/// Accepts `latest`, an existing path, or a file name in the backup
/// directory (with or without the extension).
pub fn resolve_backup_path(
    manager: &BackupManager,
    paths: &PlannerPaths,
    backup: &str,
) -> PlannerResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| PlannerError::backup_not_found("latest"));
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    let backup_path = paths.backup_dir().join(backup);
    if backup_path.exists() {
        return Ok(backup_path);
    }

    let with_ext = paths
        .backup_dir()
        .join(format!("{}.{}", backup, crate::backup::file_store::BACKUP_EXTENSION));
    if with_ext.exists() {
        return Ok(with_ext);
    }

    Err(PlannerError::backup_not_found(backup))
}

/// Turn the password flags into the password to use, prompting if asked
fn read_password(args: PasswordArgs, confirm: bool) -> PlannerResult<Option<SecureString>> {
    let password = if args.ask_password {
        Some(if confirm {
            prompt_new_password()?
        } else {
            prompt_password("Backup password: ")?
        })
    } else {
        args.password.map(SecureString::from)
    };

    match password {
        Some(password) if password.is_empty() => Err(PlannerError::Validation(
            "password must not be empty".into(),
        )),
        other => Ok(other),
    }
}

fn prompt_new_password() -> PlannerResult<SecureString> {
    loop {
        let first = prompt_password("New backup password: ")?;

        if first.len() < MIN_PROMPTED_PASSWORD_LEN {
            println!(
                "Password must be at least {} characters. Please try again.",
                MIN_PROMPTED_PASSWORD_LEN
            );
            continue;
        }

        let second = prompt_password("Confirm password: ")?;

        if first.as_str() != second.as_str() {
            println!("Passwords do not match. Please try again.");
            continue;
        }

        return Ok(first);
    }
}

/// Prompt for a password (hidden input)
fn prompt_password(prompt: &str) -> PlannerResult<SecureString> {
    rpassword::prompt_password(prompt)
        .map(SecureString::from)
        .map_err(|e| PlannerError::Encryption(format!("Failed to read password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PlannerPaths, BackupManager) {
        let temp_dir = TempDir::new().unwrap();
        let paths = PlannerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let mut settings = Settings::default();
        settings.backup.key_derivation = crate::crypto::KeyDerivationParams::light();
        let manager = open_manager(&paths, &settings).unwrap();
        (temp_dir, paths, manager)
    }

    #[test]
    fn test_resolve_latest_without_backups() {
        let (_temp_dir, paths, manager) = setup();
        let err = resolve_backup_path(&manager, &paths, "latest").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_resolve_by_name_path_and_latest() {
        let (_temp_dir, paths, manager) = setup();
        let created = manager.create_backup(None, false).unwrap();
        let expected = created.artifact.path.clone();

        assert_eq!(resolve_backup_path(&manager, &paths, "latest").unwrap(), expected);
        assert_eq!(
            resolve_backup_path(&manager, &paths, &created.artifact.file_name).unwrap(),
            expected
        );
        let stem = created.artifact.file_name.trim_end_matches(".drb");
        assert_eq!(resolve_backup_path(&manager, &paths, stem).unwrap(), expected);
        assert_eq!(
            resolve_backup_path(&manager, &paths, expected.to_str().unwrap()).unwrap(),
            expected
        );
        assert!(resolve_backup_path(&manager, &paths, "backup-19990101-000000").is_err());
    }

    #[test]
    fn test_empty_password_rejected() {
        let args = PasswordArgs {
            password: Some(String::new()),
            ask_password: false,
        };
        assert!(matches!(
            read_password(args, true),
            Err(PlannerError::Validation(_))
        ));
        assert!(read_password(PasswordArgs::default(), true).unwrap().is_none());
    }
}
