//! Path management for the planner
//!
//! Provides XDG-compliant path resolution for settings, data, keys and backups.
//!
//! ## Path Resolution Order
//!
//! 1. `PLANNER_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/planner-backup` or `~/.config/planner-backup`
//! 3. Windows: `%APPDATA%\planner-backup`

use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::PlannerError;

/// Environment variable overriding the base directory
pub const DATA_DIR_ENV: &str = "PLANNER_DATA_DIR";

const APP_DIR_NAME: &str = "planner-backup";

/// Manages all paths used by the planner
#[derive(Debug, Clone)]
pub struct PlannerPaths {
    base_dir: PathBuf,
}

impl PlannerPaths {
    /// Resolve the base directory from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, PlannerError> {
        let base_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create PlannerPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (~/.config/planner-backup/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup directory (~/.config/planner-backup/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the directory holding the device key
    pub fn key_dir(&self) -> PathBuf {
        self.base_dir.join("keys")
    }

    pub fn device_key_file(&self) -> PathBuf {
        self.key_dir().join("device.key")
    }

    /// Get the path to the planner store
    pub fn store_file(&self) -> PathBuf {
        self.data_dir().join("planner.json")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), PlannerError> {
        for (label, dir) in [
            ("base", self.base_dir.clone()),
            ("data", self.data_dir()),
            ("backup", self.backup_dir()),
            ("key", self.key_dir()),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                PlannerError::Io(format!("Failed to create {} directory: {}", label, e))
            })?;
        }
        Ok(())
    }
}

/// Resolve the default base directory for the current platform
fn resolve_default_path() -> Result<PathBuf, PlannerError> {
    let dirs = BaseDirs::new()
        .ok_or_else(|| PlannerError::Config("Could not determine home directory".into()))?;
    Ok(dirs.config_dir().join(APP_DIR_NAME))
}
