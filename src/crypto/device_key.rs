//! Device-bound keys
//!
//! A device key is a random 256-bit key generated on first use and kept in
//! a store private to this device. The engine only ever reads it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use base64::{engine::general_purpose::STANDARD, Engine};
use tempfile::Builder;
use zeroize::Zeroizing;

use super::key_derivation::{DerivedKey, KEY_SIZE};
use crate::error::CryptoError;

/// Source of the device-scoped key
pub trait DeviceKeyStore: Send + Sync {
    /// Return the device key, generating it if the store holds none yet
    fn device_key(&self) -> Result<DerivedKey, CryptoError>;
}

fn random_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng.fill_bytes(&mut key[..]);
    key
}

/// Device key persisted to a private file
///
/// The key file holds the base64 encoded key and is created with owner-only
/// permissions on Unix. Once loaded the key is cached for the lifetime of
/// the store.
pub struct FileKeyStore {
    path: PathBuf,
    cached: Mutex<Option<Zeroizing<[u8; KEY_SIZE]>>>,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_or_create(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>, CryptoError> {
        if self.path.exists() {
            return self.load();
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| unavailable(&self.path, e))?;
        }

        let key = random_key();
        match self.create(&key) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "generated device key");
                Ok(key)
            }
            // Another process created it first; use theirs
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => self.load(),
            Err(e) => Err(unavailable(&self.path, e)),
        }
    }

    fn load(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>, CryptoError> {
        let encoded =
            Zeroizing::new(fs::read_to_string(&self.path).map_err(|e| unavailable(&self.path, e))?);
        let decoded = Zeroizing::new(STANDARD.decode(encoded.trim()).map_err(|_| {
            CryptoError::KeyUnavailable(format!("{} is not a valid key file", self.path.display()))
        })?);

        if decoded.len() != KEY_SIZE {
            return Err(CryptoError::KeyUnavailable(format!(
                "{} holds a {}-byte key, expected {}",
                self.path.display(),
                decoded.len(),
                KEY_SIZE
            )));
        }

        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(&decoded);
        Ok(key)
    }

    /// Write the key to a private temporary file, then link it into place
    ///
    /// Readers see either no key file or a complete one. Fails with
    /// `AlreadyExists` if another process linked its key first.
    fn create(&self, key: &[u8; KEY_SIZE]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Temporary files are created owner-only on Unix
        let mut temp = Builder::new().prefix(".device-key-").tempfile_in(dir)?;
        let encoded = Zeroizing::new(STANDARD.encode(key));
        temp.write_all(encoded.as_bytes())?;
        temp.as_file().sync_all()?;

        temp.persist_noclobber(&self.path)
            .map(|_| ())
            .map_err(|e| e.error)
    }
}

fn unavailable(path: &Path, err: io::Error) -> CryptoError {
    CryptoError::KeyUnavailable(format!("{}: {}", path.display(), err))
}

impl DeviceKeyStore for FileKeyStore {
    fn device_key(&self) -> Result<DerivedKey, CryptoError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| CryptoError::KeyUnavailable("device key cache poisoned".into()))?;

        if cached.is_none() {
            *cached = Some(self.load_or_create()?);
        }

        match cached.as_ref() {
            Some(key) => Ok(DerivedKey::from_bytes(**key)),
            None => Err(CryptoError::KeyUnavailable("device key not loaded".into())),
        }
    }
}

/// Device key held only in memory, for tests and ephemeral sessions
pub struct MemoryKeyStore {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self { key: random_key() }
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceKeyStore for MemoryKeyStore {
    fn device_key(&self) -> Result<DerivedKey, CryptoError> {
        Ok(DerivedKey::from_bytes(*self.key))
    }
}
