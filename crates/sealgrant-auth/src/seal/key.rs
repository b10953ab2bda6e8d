//! Sealer key material.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

use crate::config::ConfigError;

/// Key size for AES-256 (256 bits)
pub const KEY_SIZE: usize = 32;

/// A 256-bit sealer key.
///
/// `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SealerKey([u8; KEY_SIZE]);

impl SealerKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self(key)
    }

    /// Parse a key from a hex or base64 string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` unless the input decodes to
    /// exactly 32 bytes.
    pub fn parse(key_str: &str) -> Result<Self, ConfigError> {
        let key_str = key_str.trim();

        // Try hex first
        if key_str.len() == KEY_SIZE * 2 {
            if let Ok(bytes) = hex::decode(key_str) {
                return Self::from_slice(&bytes);
            }
        }

        let bytes = BASE64
            .decode(key_str)
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid base64 key: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// Load the key from an environment variable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the variable is unset, and
    /// `ConfigError::InvalidValue` if it is unreadable or not a valid key.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        match std::env::var(var) {
            Ok(key_str) => Self::parse(&key_str),
            Err(std::env::VarError::NotPresent) => Err(ConfigError::Missing(var.to_string())),
            Err(e) => Err(ConfigError::InvalidValue(format!("Failed to read {var}: {e}"))),
        }
    }

    /// Hex encoding of the key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Standard base64 encoding of the key.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "Key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }
}

impl fmt::Debug for SealerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealerKey(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key() {
        let a = SealerKey::generate();
        let b = SealerKey::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_hex_key() {
        let key = SealerKey::generate();
        let parsed = SealerKey::parse(&key.to_hex()).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_parse_base64_key() {
        let key = SealerKey::generate();
        let parsed = SealerKey::parse(&format!("  {}\n", key.to_base64())).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_parse_wrong_length() {
        let err = SealerKey::parse(&BASE64.encode([0u8; 16])).unwrap_err();
        assert!(err.to_string().contains("32 bytes"));

        assert!(SealerKey::parse("not a key!").is_err());
    }

    #[test]
    fn test_from_env_missing() {
        let err = SealerKey::from_env("SEALGRANT_TEST_KEY_THAT_IS_NOT_SET").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_debug_redacted() {
        let key = SealerKey::generate();
        let debug = format!("{key:?}");
        assert!(!debug.contains(&key.to_hex()));
        assert!(debug.contains("redacted"));
    }
}
