//! Backup manager for the planner
//!
//! Orchestrates the create and restore pipelines:
//!
//! ```text
//! create:  collect -> encode -> compress -> [encrypt] -> stage -> commit
//! restore: read -> [decrypt] -> decompress -> decode -> import
//! ```
//!
//! Only one create or restore runs at a time per manager (and its clones).
//! Both pipelines check a [`CancellationToken`] between stages.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::compression;
use super::file_store::{BackupArtifact, FileStore};
use super::flight::{CancellationToken, FlightGuard, FlightSlot};
use super::restore::{RestoreImporter, RestoreSummary};
use crate::config::Settings;
use crate::crypto::{CipherProvider, EncryptedContainer, KeySource, KeySourceKind, SecureString};
use crate::error::{BackupError, BackupStage, RestoreError, RestoreStage, StoreError};
use crate::models::{now, EntityKind};
use crate::snapshot::{self, RecordCounts, Snapshot, SnapshotSummary};
use crate::storage::EntityStore;

/// Pipeline options, usually taken from [`Settings`]
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub include_notifications: bool,
    /// Seal password-less backups with the device key
    pub encrypt_with_device_key: bool,
    pub compression_level: u32,
    pub max_restore_bytes: u64,
    /// Producer identification written into every snapshot
    pub device_info: String,
}

impl BackupConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            include_notifications: settings.backup.include_notifications,
            encrypt_with_device_key: settings.backup.encrypt_with_device_key,
            compression_level: settings.backup.compression_level,
            max_restore_bytes: settings.backup.max_restore_bytes,
            device_info: settings.device_info(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// A committed artifact and what went into it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedBackup {
    pub artifact: BackupArtifact,
    pub counts: RecordCounts,
}

impl CreatedBackup {
    pub fn total(&self) -> usize {
        self.counts.total()
    }
}

/// Best-effort description of an artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub is_encrypted: bool,
    /// Key source from the container header, when it could be parsed
    pub key_source: Option<KeySourceKind>,
    /// Whether the snapshot itself could be read
    pub contents_readable: bool,
    pub format_version: Option<u64>,
    /// When the snapshot was taken
    pub created_at: Option<NaiveDateTime>,
    pub device_info: Option<String>,
    /// Zero for every kind when the contents were not readable
    pub counts: RecordCounts,
}

impl BackupInfo {
    fn unreadable(path: &Path, size_bytes: u64, key_source: Option<KeySourceKind>) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            size_bytes,
            is_encrypted: true,
            key_source,
            contents_readable: false,
            format_version: None,
            created_at: None,
            device_info: None,
            counts: RecordCounts::default(),
        }
    }

    fn readable(
        path: &Path,
        size_bytes: u64,
        key_source: Option<KeySourceKind>,
        summary: SnapshotSummary,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            size_bytes,
            is_encrypted: key_source.is_some(),
            key_source,
            contents_readable: true,
            format_version: Some(summary.format_version),
            created_at: summary.created_at,
            device_info: summary.device_info,
            counts: summary.counts,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A create or restore running on a worker thread
pub struct BackgroundJob<T> {
    handle: JoinHandle<T>,
    cancel: CancellationToken,
}

impl<T> BackgroundJob<T> {
    /// Ask the job to stop at its next stage boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job finishes and return its result
    ///
    /// A panic on the worker is resumed on the calling thread.
    pub fn wait(self) -> T {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

/// Creates, restores and manages backups of one entity store
#[derive(Clone)]
pub struct BackupManager {
    store: Arc<dyn EntityStore>,
    cipher: CipherProvider,
    files: FileStore,
    config: BackupConfig,
    flight: FlightSlot,
}

impl BackupManager {
    pub fn new(
        store: Arc<dyn EntityStore>,
        cipher: CipherProvider,
        files: FileStore,
        config: BackupConfig,
    ) -> Self {
        Self {
            store,
            cipher,
            files,
            config,
            flight: FlightSlot::new(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        self.files.dir()
    }

    /// Whether a create or restore currently holds this manager
    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    /// Create a backup of the store
    ///
    /// With a password the artifact is sealed with a key derived from it.
    /// Without one it is sealed with the device key if so configured, and
    /// written as plain compressed data otherwise.
    pub fn create_backup(
        &self,
        password: Option<&str>,
        include_completed: bool,
    ) -> Result<CreatedBackup, BackupError> {
        self.create_backup_with_cancel(password, include_completed, &CancellationToken::new())
    }

    pub fn create_backup_with_cancel(
        &self,
        password: Option<&str>,
        include_completed: bool,
        cancel: &CancellationToken,
    ) -> Result<CreatedBackup, BackupError> {
        let guard = self
            .flight
            .try_acquire()
            .ok_or(BackupError::AlreadyInProgress)?;
        self.run_create(guard, password.map(SecureString::from), include_completed, cancel)
    }

    /// Start a backup on a worker thread
    ///
    /// Fails immediately with `AlreadyInProgress` if another operation is
    /// running.
    pub fn spawn_create(
        &self,
        password: Option<SecureString>,
        include_completed: bool,
    ) -> Result<BackgroundJob<Result<CreatedBackup, BackupError>>, BackupError> {
        let guard = self
            .flight
            .try_acquire()
            .ok_or(BackupError::AlreadyInProgress)?;
        let manager = self.clone();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("planner-backup".into())
            .spawn(move || manager.run_create(guard, password, include_completed, &worker_cancel))
            .map_err(BackupError::Io)?;

        Ok(BackgroundJob { handle, cancel })
    }

    fn run_create(
        &self,
        _guard: FlightGuard,
        password: Option<SecureString>,
        include_completed: bool,
        cancel: &CancellationToken,
    ) -> Result<CreatedBackup, BackupError> {
        checkpoint(cancel, BackupStage::Collect)?;
        let snapshot = self.collect(include_completed)?;
        let counts = snapshot.counts();
        debug!(%counts, "collected entities");

        checkpoint(cancel, BackupStage::Encode)?;
        let encoded = snapshot::encode(&snapshot).map_err(BackupError::Encode)?;
        debug!(bytes = encoded.len(), "encoded snapshot");

        checkpoint(cancel, BackupStage::Compress)?;
        let compressed = compression::compress(&encoded, self.config.compression_level)
            .map_err(BackupError::Compression)?;
        debug!(bytes = compressed.len(), "compressed snapshot");

        let key_source = match password {
            Some(password) => Some(KeySource::PasswordDerived(password)),
            None if self.config.encrypt_with_device_key => Some(KeySource::DeviceKey),
            None => None,
        };

        let payload = match key_source {
            Some(key_source) => {
                checkpoint(cancel, BackupStage::Encrypt)?;
                let container = self
                    .cipher
                    .encrypt(&compressed, &key_source)
                    .map_err(BackupError::Crypto)?;
                debug!(key_source = %key_source.kind(), "encrypted snapshot");
                container.to_bytes()
            }
            None => compressed,
        };

        checkpoint(cancel, BackupStage::Write)?;
        let pending = self.files.stage(&payload).map_err(BackupError::Io)?;

        // Last chance to cancel; dropping `pending` removes the temporary file
        checkpoint(cancel, BackupStage::Write)?;
        let artifact = pending
            .commit(snapshot.created_at)
            .map_err(BackupError::Io)?;

        info!(
            file = %artifact.file_name,
            size_bytes = artifact.size_bytes,
            encrypted = artifact.is_encrypted,
            %counts,
            "backup created"
        );

        Ok(CreatedBackup { artifact, counts })
    }

    fn collect(&self, include_completed: bool) -> Result<Snapshot, BackupError> {
        let mut snapshot = Snapshot::new(now(), self.config.device_info.clone());

        for kind in EntityKind::ALL {
            if kind == EntityKind::Notification && !self.config.include_notifications {
                continue;
            }

            let entities = self.store.list_all(kind).map_err(BackupError::Collection)?;
            for (index, entity) in entities.into_iter().enumerate() {
                if entity.kind() != kind {
                    return Err(BackupError::Collection(StoreError::UnexpectedKind {
                        expected: kind,
                        found: entity.kind(),
                    }));
                }
                if !include_completed && entity.is_completed() {
                    continue;
                }
                // The importer rejects invalid records, so they must not be written
                entity.validate().map_err(|reason| {
                    BackupError::Collection(StoreError::InvalidEntity {
                        kind,
                        index,
                        reason,
                    })
                })?;
                snapshot.push(&entity);
            }
        }

        Ok(snapshot)
    }

    /// Restore a backup into the store
    ///
    /// With `replace_existing` every entity currently in the store is
    /// removed first; otherwise the backup's records are added alongside.
    pub fn restore_backup(
        &self,
        path: &Path,
        password: Option<&str>,
        replace_existing: bool,
    ) -> Result<RestoreSummary, RestoreError> {
        self.restore_backup_with_cancel(path, password, replace_existing, &CancellationToken::new())
    }

    pub fn restore_backup_with_cancel(
        &self,
        path: &Path,
        password: Option<&str>,
        replace_existing: bool,
        cancel: &CancellationToken,
    ) -> Result<RestoreSummary, RestoreError> {
        let guard = self
            .flight
            .try_acquire()
            .ok_or(RestoreError::AlreadyInProgress)?;
        self.run_restore(
            guard,
            path,
            password.map(SecureString::from),
            replace_existing,
            cancel,
        )
    }

    /// Start a restore on a worker thread
    pub fn spawn_restore(
        &self,
        path: PathBuf,
        password: Option<SecureString>,
        replace_existing: bool,
    ) -> Result<BackgroundJob<Result<RestoreSummary, RestoreError>>, RestoreError> {
        let guard = self
            .flight
            .try_acquire()
            .ok_or(RestoreError::AlreadyInProgress)?;
        let manager = self.clone();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("planner-restore".into())
            .spawn(move || {
                manager.run_restore(guard, &path, password, replace_existing, &worker_cancel)
            })
            .map_err(RestoreError::Io)?;

        Ok(BackgroundJob { handle, cancel })
    }

    fn run_restore(
        &self,
        _guard: FlightGuard,
        path: &Path,
        password: Option<SecureString>,
        replace_existing: bool,
        cancel: &CancellationToken,
    ) -> Result<RestoreSummary, RestoreError> {
        checkpoint_restore(cancel, RestoreStage::Read)?;
        let bytes = self.read_artifact(path)?;
        debug!(path = %path.display(), bytes = bytes.len(), "read backup");

        checkpoint_restore(cancel, RestoreStage::Decrypt)?;
        let compressed = self.unseal(bytes, password)?;

        checkpoint_restore(cancel, RestoreStage::Decompress)?;
        let encoded = compression::decompress(&compressed, self.config.max_restore_bytes)
            .map_err(RestoreError::Corrupt)?;
        debug!(bytes = encoded.len(), "decompressed snapshot");

        checkpoint_restore(cancel, RestoreStage::Decode)?;
        let snapshot = snapshot::decode(&encoded)?;
        debug!(counts = %snapshot.counts(), "decoded snapshot");

        checkpoint_restore(cancel, RestoreStage::Import)?;
        let summary = RestoreImporter::new(self.store.as_ref()).import(snapshot, replace_existing)?;

        info!(
            path = %path.display(),
            counts = %summary.counts,
            replaced = replace_existing,
            "backup restored"
        );

        Ok(summary)
    }

    fn read_artifact(&self, path: &Path) -> Result<Vec<u8>, RestoreError> {
        self.files.read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RestoreError::FileNotFound(path.to_path_buf()),
            _ => RestoreError::Io(e),
        })
    }

    /// Turn artifact bytes into the compressed snapshot
    ///
    /// A supplied password is always used for decryption, so a plain
    /// artifact with a password is an error rather than a silent success.
    fn unseal(
        &self,
        bytes: Vec<u8>,
        password: Option<SecureString>,
    ) -> Result<Vec<u8>, RestoreError> {
        if let Some(password) = password {
            let container =
                EncryptedContainer::from_bytes(&bytes).map_err(RestoreError::DecryptionFailed)?;
            let compressed = self
                .cipher
                .decrypt(&container, &KeySource::PasswordDerived(password))
                .map_err(RestoreError::DecryptionFailed)?;
            debug!("decrypted with password");
            return Ok(compressed);
        }

        if compression::is_compressed(&bytes) {
            return Ok(bytes);
        }

        if !EncryptedContainer::is_container(&bytes) {
            return Err(RestoreError::Malformed(
                "not a backup file: unrecognized header".into(),
            ));
        }

        let container =
            EncryptedContainer::from_bytes(&bytes).map_err(RestoreError::DecryptionFailed)?;
        match container.key_source() {
            KeySourceKind::Password => Err(RestoreError::PasswordRequired),
            KeySourceKind::Device => {
                let compressed = self
                    .cipher
                    .decrypt(&container, &KeySource::DeviceKey)
                    .map_err(RestoreError::DecryptionFailed)?;
                debug!("decrypted with device key");
                Ok(compressed)
            }
        }
    }

    /// Every artifact in the backup directory, most recent first
    pub fn list_backups(&self) -> io::Result<Vec<BackupArtifact>> {
        self.files.list()
    }

    /// The most recent artifact, if any
    pub fn latest_backup(&self) -> io::Result<Option<BackupArtifact>> {
        Ok(self.files.list()?.into_iter().next())
    }

    pub fn delete_backup(&self, path: &Path) -> io::Result<()> {
        self.files.delete(path)?;
        info!(path = %path.display(), "backup deleted");
        Ok(())
    }

    /// Read an artifact's metadata without a password
    ///
    /// Device-sealed artifacts are opened with the device key. Artifacts
    /// that cannot be decrypted are reported as encrypted with zero counts
    /// instead of failing.
    pub fn inspect_backup(&self, path: &Path) -> Result<BackupInfo, RestoreError> {
        let bytes = self.read_artifact(path)?;
        let size_bytes = bytes.len() as u64;

        if compression::is_compressed(&bytes) {
            let summary = self.summarize_compressed(&bytes)?;
            return Ok(BackupInfo::readable(path, size_bytes, None, summary));
        }

        if !EncryptedContainer::is_container(&bytes) {
            return Err(RestoreError::Malformed(
                "not a backup file: unrecognized header".into(),
            ));
        }

        let container = match EncryptedContainer::from_bytes(&bytes) {
            Ok(container) => container,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable encrypted header");
                return Ok(BackupInfo::unreadable(path, size_bytes, None));
            }
        };

        let key_source = container.key_source();
        if key_source == KeySourceKind::Password {
            return Ok(BackupInfo::unreadable(path, size_bytes, Some(key_source)));
        }

        match self.cipher.decrypt(&container, &KeySource::DeviceKey) {
            Ok(compressed) => {
                let summary = self.summarize_compressed(&compressed)?;
                Ok(BackupInfo::readable(path, size_bytes, Some(key_source), summary))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot decrypt with the device key");
                Ok(BackupInfo::unreadable(path, size_bytes, Some(key_source)))
            }
        }
    }

    fn summarize_compressed(&self, compressed: &[u8]) -> Result<SnapshotSummary, RestoreError> {
        let encoded = compression::decompress(compressed, self.config.max_restore_bytes)
            .map_err(RestoreError::Corrupt)?;
        Ok(snapshot::summarize(&encoded)?)
    }
}

fn checkpoint(cancel: &CancellationToken, next: BackupStage) -> Result<(), BackupError> {
    if cancel.is_cancelled() {
        debug!(stage = %next, "backup cancelled");
        return Err(BackupError::Cancelled(next));
    }
    Ok(())
}

fn checkpoint_restore(cancel: &CancellationToken, next: RestoreStage) -> Result<(), RestoreError> {
    if cancel.is_cancelled() {
        debug!(stage = %next, "restore cancelled");
        return Err(RestoreError::Cancelled(next));
    }
    Ok(())
}
