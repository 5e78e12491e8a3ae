//! Cipher provider for backup artifacts
//!
//! Provides AES-256-GCM encryption keyed either by a device-bound key or by
//! an Argon2id-derived password key.

pub mod device_key;
pub mod encryption;
pub mod key_derivation;
pub mod secure_memory;

pub use device_key::{DeviceKeyStore, FileKeyStore, MemoryKeyStore};
pub use encryption::{CipherProvider, EncryptedContainer, KeySource, KeySourceKind};
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use secure_memory::SecureString;
