//! AES-256-GCM encryption/decryption
//!
//! Provides authenticated encryption for backup artifacts. Each encryption
//! generates its own random nonce and, for password keys, its own salt.
//!
//! Container layout (all integers big-endian):
//!
//! ```text
//! "DRBE" | version u8 | key source u8
//!        | [password only: salt 16 | memory KiB u32 | iterations u32 | parallelism u32]
//!        | nonce 12 | ciphertext + tag 16
//! ```
//!
//! Everything before the ciphertext is authenticated as associated data, so
//! editing the salt or cost parameters fails the same way a wrong password
//! does.

use std::fmt;
use std::sync::Arc;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use serde::Serialize;

use super::device_key::DeviceKeyStore;
use super::key_derivation::{derive_key, generate_salt, DerivedKey, KeyDerivationParams, SALT_SIZE};
use super::secure_memory::SecureString;
use crate::error::CryptoError;

/// Leading bytes of every encrypted artifact
pub const MAGIC: &[u8; 4] = b"DRBE";

/// Current container layout version
pub const CONTAINER_VERSION: u8 = 1;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag
pub const TAG_SIZE: usize = 16;

const DEVICE_TAG: u8 = 0;
const PASSWORD_TAG: u8 = 1;
const PARAMS_SIZE: usize = 12;

/// Where the key for an encryption comes from
#[derive(Debug, Clone)]
pub enum KeySource {
    /// The device-bound key from the configured key store
    DeviceKey,
    /// A key derived from a user password with Argon2id
    PasswordDerived(SecureString),
}

impl KeySource {
    pub fn password(password: impl Into<SecureString>) -> Self {
        Self::PasswordDerived(password.into())
    }

    pub fn kind(&self) -> KeySourceKind {
        match self {
            Self::DeviceKey => KeySourceKind::Device,
            Self::PasswordDerived(_) => KeySourceKind::Password,
        }
    }
}

/// Key source recorded in a container header, without the secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySourceKind {
    Device,
    Password,
}

impl KeySourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for KeySourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum KeyMaterial {
    Device,
    Password {
        salt: [u8; SALT_SIZE],
        params: KeyDerivationParams,
    },
}

/// An encrypted payload with everything needed to decrypt it except the key
///
/// Containers are only produced by [`CipherProvider::encrypt`] or parsed
/// from bytes; callers cannot choose the nonce.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedContainer {
    key: KeyMaterial,
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedContainer {
    /// Whether the bytes start with the container magic
    pub fn is_container(bytes: &[u8]) -> bool {
        bytes.starts_with(MAGIC)
    }

    pub fn key_source(&self) -> KeySourceKind {
        match self.key {
            KeyMaterial::Device => KeySourceKind::Device,
            KeyMaterial::Password { .. } => KeySourceKind::Password,
        }
    }

    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Ciphertext with the authentication tag appended
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    fn header(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(6 + SALT_SIZE + PARAMS_SIZE + NONCE_SIZE);
        header.extend_from_slice(MAGIC);
        header.push(CONTAINER_VERSION);
        match &self.key {
            KeyMaterial::Device => header.push(DEVICE_TAG),
            KeyMaterial::Password { salt, params } => {
                header.push(PASSWORD_TAG);
                header.extend_from_slice(salt);
                header.extend_from_slice(&params.memory_cost.to_be_bytes());
                header.extend_from_slice(&params.time_cost.to_be_bytes());
                header.extend_from_slice(&params.parallelism.to_be_bytes());
            }
        }
        header.extend_from_slice(&self.nonce);
        header
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header();
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parse a container
    ///
    /// Bytes without the magic are `NotEncrypted`; a truncated or
    /// nonsensical header is `AuthenticationFailed`, the same as a damaged
    /// ciphertext.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if !Self::is_container(bytes) {
            return Err(CryptoError::NotEncrypted);
        }
        let mut reader = Reader {
            bytes,
            pos: MAGIC.len(),
        };

        let version = reader.u8()?;
        if version != CONTAINER_VERSION {
            return Err(CryptoError::UnsupportedContainer(version));
        }

        let key = match reader.u8()? {
            DEVICE_TAG => KeyMaterial::Device,
            PASSWORD_TAG => {
                let salt = reader.array::<SALT_SIZE>()?;
                let params = KeyDerivationParams {
                    memory_cost: reader.u32()?,
                    time_cost: reader.u32()?,
                    parallelism: reader.u32()?,
                };
                params
                    .validate()
                    .map_err(|_| CryptoError::AuthenticationFailed)?;
                KeyMaterial::Password { salt, params }
            }
            _ => return Err(CryptoError::AuthenticationFailed),
        };

        let nonce = reader.array::<NONCE_SIZE>()?;
        let ciphertext = reader.rest();
        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::AuthenticationFailed);
        }

        Ok(Self {
            key,
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CryptoError> {
        let end = self.pos.checked_add(n).ok_or(CryptoError::AuthenticationFailed)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(CryptoError::AuthenticationFailed)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CryptoError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CryptoError> {
        Ok(u32::from_be_bytes(self.array::<4>()?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CryptoError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

/// Authenticated encryption of opaque buffers
///
/// The device key store is the only long-lived state; it is shared
/// read-only between operations.
#[derive(Clone)]
pub struct CipherProvider {
    device_keys: Arc<dyn DeviceKeyStore>,
    kdf: KeyDerivationParams,
}

impl CipherProvider {
    /// `kdf` is used for new password-protected containers; decryption
    /// always uses the parameters recorded in the container.
    pub fn new(device_keys: Arc<dyn DeviceKeyStore>, kdf: KeyDerivationParams) -> Self {
        Self { device_keys, kdf }
    }

    /// Encrypt plaintext under a fresh nonce
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key_source: &KeySource,
    ) -> Result<EncryptedContainer, CryptoError> {
        let material = match key_source {
            KeySource::DeviceKey => KeyMaterial::Device,
            KeySource::PasswordDerived(_) => KeyMaterial::Password {
                salt: generate_salt(),
                params: self.kdf,
            },
        };
        let key = self.resolve_key(&material, key_source)?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let mut container = EncryptedContainer {
            key: material,
            nonce,
            ciphertext: Vec::new(),
        };
        let header = container.header();

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Cipher(format!("failed to create cipher: {}", e)))?;
        container.ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &header,
                },
            )
            .map_err(|e| CryptoError::Cipher(format!("encryption failed: {}", e)))?;

        Ok(container)
    }

    /// Decrypt and authenticate a container
    pub fn decrypt(
        &self,
        container: &EncryptedContainer,
        key_source: &KeySource,
    ) -> Result<Vec<u8>, CryptoError> {
        let sealed = container.key_source();
        let supplied = key_source.kind();
        if sealed != supplied {
            return Err(CryptoError::KeySourceMismatch {
                sealed: sealed.as_str(),
                supplied: supplied.as_str(),
            });
        }

        let key = self.resolve_key(&container.key, key_source)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Cipher(format!("failed to create cipher: {}", e)))?;

        cipher
            .decrypt(
                Nonce::from_slice(&container.nonce),
                Payload {
                    msg: &container.ciphertext,
                    aad: &container.header(),
                },
            )
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    fn resolve_key(
        &self,
        material: &KeyMaterial,
        key_source: &KeySource,
    ) -> Result<DerivedKey, CryptoError> {
        match (material, key_source) {
            (KeyMaterial::Device, KeySource::DeviceKey) => self.device_keys.device_key(),
            (KeyMaterial::Password { salt, params }, KeySource::PasswordDerived(password)) => {
                derive_key(password, salt, params)
            }
            _ => Err(CryptoError::KeySourceMismatch {
                sealed: match material {
                    KeyMaterial::Device => "device",
                    KeyMaterial::Password { .. } => "password",
                },
                supplied: key_source.kind().as_str(),
            }),
        }
    }
}
