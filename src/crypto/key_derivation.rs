//! Key derivation using Argon2id
//!
//! Derives encryption keys from user passwords using Argon2id,
//! a memory-hard key derivation function resistant to GPU/ASIC attacks.
//! Every password-protected artifact carries its own random salt.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Size of the derived key in bytes (256 bits for AES-256)
pub const KEY_SIZE: usize = 32;

/// Size of the per-artifact salt
pub const SALT_SIZE: usize = 16;

/// Largest memory cost accepted from an artifact header (1 GiB)
pub const MAX_MEMORY_COST: u32 = 1024 * 1024;

/// Largest number of Argon2 passes accepted from an artifact header
pub const MAX_TIME_COST: u32 = 64;

/// Largest Argon2 lane count accepted from an artifact header
pub const MAX_PARALLELISM: u32 = 64;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism degree (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KeyDerivationParams {
    /// Cheap parameters for tests and constrained devices
    pub fn light() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    /// Check the parameters are ones Argon2 accepts and within our caps
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.memory_cost > MAX_MEMORY_COST {
            return Err(CryptoError::KeyDerivation(format!(
                "memory cost {} KiB exceeds the {} KiB limit",
                self.memory_cost, MAX_MEMORY_COST
            )));
        }
        if self.time_cost > MAX_TIME_COST {
            return Err(CryptoError::KeyDerivation(format!(
                "time cost {} exceeds the limit of {} passes",
                self.time_cost, MAX_TIME_COST
            )));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(CryptoError::KeyDerivation(format!(
                "parallelism {} exceeds the limit of {} lanes",
                self.parallelism, MAX_PARALLELISM
            )));
        }
        self.argon2_params().map(|_| ())
    }

    fn argon2_params(&self) -> Result<Params, CryptoError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid Argon2 parameters: {}", e)))
    }
}

/// A 256-bit symmetric key, zeroed on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Generate a fresh random salt
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive an encryption key from a password and salt
pub fn derive_key(
    password: &str,
    salt: &[u8; SALT_SIZE],
    params: &KeyDerivationParams,
) -> Result<DerivedKey, CryptoError> {
    params.validate()?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let derived = DerivedKey(key);
    key.zeroize();
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_password_same_key() {
        let salt = generate_salt();
        let params = KeyDerivationParams::light();
        let key1 = derive_key("test_password", &salt, &params).unwrap();
        let key2 = derive_key("test_password", &salt, &params).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_password_different_key() {
        let salt = generate_salt();
        let params = KeyDerivationParams::light();
        let key1 = derive_key("password1", &salt, &params).unwrap();
        let key2 = derive_key("password2", &salt, &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_salt_different_key() {
        let params = KeyDerivationParams::light();
        let key1 = derive_key("same_password", &generate_salt(), &params).unwrap();
        let key2 = derive_key("same_password", &generate_salt(), &params).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_params_out_of_range_rejected() {
        let params = KeyDerivationParams {
            memory_cost: MAX_MEMORY_COST + 1,
            ..KeyDerivationParams::light()
        };
        assert!(matches!(
            derive_key("pw", &generate_salt(), &params),
            Err(CryptoError::KeyDerivation(_))
        ));

        let params = KeyDerivationParams {
            parallelism: 0,
            ..KeyDerivationParams::light()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_time_cost_and_parallelism_capped() {
        let at_limit = KeyDerivationParams {
            time_cost: MAX_TIME_COST,
            parallelism: MAX_PARALLELISM,
            memory_cost: 8 * MAX_PARALLELISM,
        };
        assert!(at_limit.validate().is_ok());

        let slow = KeyDerivationParams {
            memory_cost: MAX_MEMORY_COST,
            time_cost: u32::MAX,
            parallelism: 1,
        };
        assert!(matches!(slow.validate(), Err(CryptoError::KeyDerivation(_))));

        let wide = KeyDerivationParams {
            parallelism: MAX_PARALLELISM + 1,
            memory_cost: 8 * (MAX_PARALLELISM + 1),
            ..KeyDerivationParams::light()
        };
        assert!(matches!(wide.validate(), Err(CryptoError::KeyDerivation(_))));
    }
}
