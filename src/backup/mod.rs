//! Backup system for the planner
//!
//! Turns the contents of an entity store into a single self-contained file
//! and back again.
//!
//! # Architecture
//!
//! - `compression`: gzip for encoded snapshots
//! - `file_store`: naming, atomic writes, listing and deletion of artifacts
//! - `manager`: `BackupManager`, which runs the create and restore pipelines
//! - `restore`: `RestoreImporter`, which validates and inserts snapshot records
//! - `flight`: single-flight slot and cancellation token
//!
//! # Artifact Format
//!
//! An artifact is either a plain gzip stream of the JSON snapshot, or an
//! encrypted container (see [`crate::crypto::encryption`]) wrapping that
//! stream. Both use the `.drb` extension; the first bytes tell them apart.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use planner_backup::backup::{BackupConfig, BackupManager, FileStore};
//! use planner_backup::crypto::{CipherProvider, FileKeyStore};
//! use planner_backup::storage::PlannerStore;
//!
//! let store = Arc::new(PlannerStore::open(paths.store_file())?);
//! let cipher = CipherProvider::new(
//!     Arc::new(FileKeyStore::new(paths.device_key_file())),
//!     settings.backup.key_derivation,
//! );
//! let manager = BackupManager::new(
//!     store,
//!     cipher,
//!     FileStore::new(paths.backup_dir()),
//!     BackupConfig::from_settings(&settings),
//! );
//!
//! let created = manager.create_backup(Some("secret"), false)?;
//! let summary = manager.restore_backup(&created.artifact.path, Some("secret"), true)?;
//! println!("{}", summary.summary());
//! ```

pub mod compression;
pub mod file_store;
mod flight;
mod manager;
mod restore;

pub use file_store::{BackupArtifact, FileStore, PendingArtifact};
pub use flight::{CancellationToken, FlightGuard, FlightSlot};
pub use manager::{BackgroundJob, BackupConfig, BackupInfo, BackupManager, CreatedBackup};
pub use restore::{RestoreImporter, RestoreSummary};
