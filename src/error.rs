//! Error types for the planner backup engine
//!
//! `PlannerError` covers the application shell (configuration, paths,
//! settings). Each stage of the backup pipeline has its own error enum so
//! that failures keep their meaning all the way up to the Backup Manager,
//! where they are wrapped with the stage that produced them.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::EntityKind;

/// The main error type for application-level operations
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Encryption setup errors (prompting, key files)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PlannerError {
    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure was caused by user input rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Validation(_))
    }
}

impl From<std::io::Error> for PlannerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for application-level operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Failures reported by the entity store collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store returned a {found} while listing {expected} records")]
    UnexpectedKind {
        expected: EntityKind,
        found: EntityKind,
    },

    /// A stored entity fails validation and could not be restored from a backup
    #[error("stored {kind} at index {index} is invalid: {reason}")]
    InvalidEntity {
        kind: EntityKind,
        index: usize,
        reason: String,
    },

    #[error("store does not support transactions")]
    TransactionsUnsupported,

    #[error("store does not support batched writes")]
    BatchUnsupported,

    #[error("a transaction is already open")]
    TransactionAlreadyOpen,

    #[error("no transaction is open")]
    NoTransaction,

    #[error("store write failed: {0}")]
    Write(String),
}

impl From<PlannerError> for StoreError {
    fn from(err: PlannerError) -> Self {
        Self::Write(err.to_string())
    }
}

/// Snapshot serialization failure
#[derive(Error, Debug)]
#[error("failed to encode snapshot: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Snapshot deserialization failure
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("snapshot format version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("malformed snapshot: {0}")]
    Malformed(String),
}

/// Compressed stream failure
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("corrupt compressed stream: {0}")]
    Corrupt(String),

    #[error("decompressed data exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("compression failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Cipher provider failures
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Wrong key, tampered or truncated ciphertext
    #[error("authentication failed: wrong password or corrupted data")]
    AuthenticationFailed,

    #[error("data is not an encrypted container")]
    NotEncrypted,

    #[error("unsupported encrypted container version {0}")]
    UnsupportedContainer(u8),

    #[error("artifact was sealed with a {sealed} key, not a {supplied} key")]
    KeySourceMismatch {
        sealed: &'static str,
        supplied: &'static str,
    },

    #[error("device key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("cipher failure: {0}")]
    Cipher(String),
}

/// Restore importer failures
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("invalid {kind} record at index {index}: {reason}")]
    InvalidRecord {
        kind: EntityKind,
        index: usize,
        reason: String,
    },

    /// The store rejected a write; every change was rolled back
    #[error("store rejected the import: {0}")]
    Store(#[source] StoreError),

    /// The store had no transaction support and failed mid-import
    #[error("import stopped at {kind} record {index}; the store may hold a partial restore: {source}")]
    PartialFailure {
        kind: EntityKind,
        index: usize,
        #[source]
        source: StoreError,
    },
}

/// Discrete stages of `create_backup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStage {
    Collect,
    Encode,
    Compress,
    Encrypt,
    Write,
}

impl fmt::Display for BackupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collect => "collect",
            Self::Encode => "encode",
            Self::Compress => "compress",
            Self::Encrypt => "encrypt",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// Discrete stages of `restore_backup`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Read,
    Decrypt,
    Decompress,
    Decode,
    Import,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Decrypt => "decrypt",
            Self::Decompress => "decompress",
            Self::Decode => "decode",
            Self::Import => "import",
        };
        f.write_str(name)
    }
}

/// Failure of `create_backup`; the variant names the failing stage
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("another backup or restore is already in progress")]
    AlreadyInProgress,

    #[error("backup cancelled before the {0} stage")]
    Cancelled(BackupStage),

    #[error("collecting entities failed: {0}")]
    Collection(#[source] StoreError),

    #[error("encoding snapshot failed: {0}")]
    Encode(#[source] EncodeError),

    #[error("compressing snapshot failed: {0}")]
    Compression(#[source] CompressionError),

    #[error("encrypting snapshot failed: {0}")]
    Crypto(#[source] CryptoError),

    #[error("writing backup file failed: {0}")]
    Io(#[source] std::io::Error),
}

impl BackupError {
    /// The pipeline stage that produced this error, if any
    pub fn stage(&self) -> Option<BackupStage> {
        match self {
            Self::AlreadyInProgress => None,
            Self::Cancelled(stage) => Some(*stage),
            Self::Collection(_) => Some(BackupStage::Collect),
            Self::Encode(_) => Some(BackupStage::Encode),
            Self::Compression(_) => Some(BackupStage::Compress),
            Self::Crypto(_) => Some(BackupStage::Encrypt),
            Self::Io(_) => Some(BackupStage::Write),
        }
    }

    pub fn is_user_error(&self) -> bool {
        false
    }
}

/// Failure of `restore_backup` and `inspect_backup`
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("another backup or restore is already in progress")]
    AlreadyInProgress,

    #[error("restore cancelled before the {0} stage")]
    Cancelled(RestoreStage),

    #[error("backup file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("backup is password protected; a password is required")]
    PasswordRequired,

    #[error("decryption failed: {0}")]
    DecryptionFailed(#[source] CryptoError),

    #[error("backup format version {found} is not supported (maximum {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("backup is malformed: {0}")]
    Malformed(String),

    #[error("backup data is corrupt: {0}")]
    Corrupt(#[source] CompressionError),

    #[error("invalid {kind} record at index {index}: {reason}")]
    InvalidRecord {
        kind: EntityKind,
        index: usize,
        reason: String,
    },

    #[error("restore stopped at {kind} record {index}; the store may hold a partial restore: {source}")]
    PartialFailure {
        kind: EntityKind,
        index: usize,
        #[source]
        source: StoreError,
    },

    #[error("store rejected the restore: {0}")]
    Store(#[source] StoreError),

    #[error("reading backup file failed: {0}")]
    Io(#[source] std::io::Error),
}

impl RestoreError {
    /// Whether the failure was caused by user input (bad path, wrong or missing password)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::PasswordRequired
                | Self::DecryptionFailed(
                    CryptoError::AuthenticationFailed
                        | CryptoError::NotEncrypted
                        | CryptoError::KeySourceMismatch { .. }
                )
        )
    }
}

impl From<DecodeError> for RestoreError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnsupportedVersion { found, supported } => {
                Self::UnsupportedVersion { found, supported }
            }
            DecodeError::Malformed(reason) => Self::Malformed(reason),
        }
    }
}

impl From<ImportError> for RestoreError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::InvalidRecord {
                kind,
                index,
                reason,
            } => Self::InvalidRecord {
                kind,
                index,
                reason,
            },
            ImportError::Store(source) => Self::Store(source),
            ImportError::PartialFailure {
                kind,
                index,
                source,
            } => Self::PartialFailure {
                kind,
                index,
                source,
            },
        }
    }
}
