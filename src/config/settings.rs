//! User settings for the planner
//!
//! Manages backup preferences: what a backup includes, how it is sealed,
//! and how much a restore may decompress.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::paths::PlannerPaths;
use crate::crypto::KeyDerivationParams;
use crate::error::PlannerError;
use crate::storage::file_io::{read_json, write_json_atomic};

/// Backup behaviour settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Include notifications in new backups
    #[serde(default)]
    pub include_notifications: bool,

    /// Seal password-less backups with the device key
    #[serde(default)]
    pub encrypt_with_device_key: bool,

    /// Argon2id cost for new password-protected backups
    #[serde(default)]
    pub key_derivation: KeyDerivationParams,

    /// Gzip level, 0-9
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Largest decompressed snapshot a restore will accept
    #[serde(default = "default_max_restore_bytes")]
    pub max_restore_bytes: u64,
}

fn default_compression_level() -> u32 {
    6
}

fn default_max_restore_bytes() -> u64 {
    256 * 1024 * 1024
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            include_notifications: false,
            encrypt_with_device_key: false,
            key_derivation: KeyDerivationParams::default(),
            compression_level: default_compression_level(),
            max_restore_bytes: default_max_restore_bytes(),
        }
    }
}

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Random identity of this installation, assigned on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<Uuid>,

    #[serde(default)]
    pub backup: BackupSettings,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            device_id: None,
            backup: BackupSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &PlannerPaths) -> Result<Self, PlannerError> {
        let mut settings: Settings = read_json(paths.settings_file())
            .map_err(|e| PlannerError::Config(format!("Failed to load settings: {}", e)))?;

        if settings.backup.compression_level > 9 {
            return Err(PlannerError::Config(format!(
                "compression_level must be 0-9 (got {})",
                settings.backup.compression_level
            )));
        }

        if settings.device_id.is_none() {
            settings.device_id = Some(Uuid::new_v4());
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &PlannerPaths) -> Result<(), PlannerError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Free-text producer identification written into snapshots
    pub fn device_info(&self) -> String {
        let mut info = format!(
            "{} {} ({} {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        if let Some(id) = self.device_id {
            info.push_str(&format!(" device {}", id));
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.backup.include_notifications);
        assert!(!settings.backup.encrypt_with_device_key);
        assert_eq!(settings.backup.compression_level, 6);
        assert_eq!(settings.backup.key_derivation.memory_cost, 65536);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = PlannerPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::load_or_create(&paths).unwrap();
        settings.backup.include_notifications = true;
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert!(loaded.backup.include_notifications);
        assert_eq!(loaded.device_id, settings.device_id);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let paths = PlannerPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(
            paths.settings_file(),
            r#"{"backup": {"encrypt_with_device_key": true}}"#,
        )
        .unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert!(loaded.backup.encrypt_with_device_key);
        assert_eq!(loaded.backup.max_restore_bytes, 256 * 1024 * 1024);
        assert!(loaded.device_id.is_some());
    }

    #[test]
    fn test_bad_compression_level_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = PlannerPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"backup": {"compression_level": 12}}"#).unwrap();

        assert!(matches!(
            Settings::load_or_create(&paths),
            Err(PlannerError::Config(_))
        ));
    }

    #[test]
    fn test_device_info_names_device() {
        let mut settings = Settings::default();
        assert!(settings.device_info().starts_with("planner-backup "));

        let id = Uuid::new_v4();
        settings.device_id = Some(id);
        assert!(settings.device_info().ends_with(&id.to_string()));
    }
}
