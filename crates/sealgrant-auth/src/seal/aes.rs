//! AES-256-GCM sealer with a keyring.
//!
//! # Envelope
//!
//! ```text
//! base64url( version | key_id_len | key_id | nonce (12) | ciphertext + tag )
//! ```
//!
//! `version | key_id_len | key_id` is authenticated as associated data. The
//! encrypted plaintext is the expiry (big-endian i64 unix seconds) followed
//! by the payload, so the expiry cannot be altered or read without the key.

use std::collections::HashMap;

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use time::OffsetDateTime;

use super::{Sealer, SealerKey, SealingError};
use crate::config::{ConfigError, MAX_KEY_ID_LEN, SealerConfig};

/// Current envelope format version.
const ENVELOPE_VERSION: u8 = 1;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// GCM authentication tag size.
const TAG_SIZE: usize = 16;

/// Size of the sealed expiry prefix.
const EXPIRY_SIZE: usize = 8;

/// Sealer backed by AES-256-GCM.
///
/// One key is current and used for sealing. Further keys may be registered
/// with [`AesGcmSealer::with_key`]; they are only used to unseal values
/// produced before a key change.
pub struct AesGcmSealer {
    current_key_id: String,
    keyring: HashMap<String, Aes256Gcm>,
}

impl AesGcmSealer {
    /// Create a sealer whose current key is `key`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the key id is empty or longer
    /// than 255 bytes.
    pub fn new(key_id: impl Into<String>, key: &SealerKey) -> Result<Self, ConfigError> {
        let key_id = validate_key_id(key_id.into())?;
        let mut keyring = HashMap::new();
        keyring.insert(key_id.clone(), cipher_for(key));

        Ok(Self {
            current_key_id: key_id,
            keyring,
        })
    }

    /// Create a sealer from configuration, reading the key from the
    /// configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the variable is unset, or
    /// `ConfigError::InvalidValue` if the key or key id is invalid.
    pub fn from_config(config: &SealerConfig) -> Result<Self, ConfigError> {
        let key = SealerKey::from_env(&config.key_env)?;
        Self::new(config.key_id.clone(), &key)
    }

    /// Register an additional key accepted for unsealing only.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an invalid key id or one that
    /// is already registered.
    pub fn with_key(
        mut self,
        key_id: impl Into<String>,
        key: &SealerKey,
    ) -> Result<Self, ConfigError> {
        let key_id = validate_key_id(key_id.into())?;
        if self.keyring.contains_key(&key_id) {
            return Err(ConfigError::InvalidValue(format!(
                "duplicate sealer key id: {key_id}"
            )));
        }
        self.keyring.insert(key_id, cipher_for(key));
        Ok(self)
    }

    /// Identifier of the key used for sealing.
    #[must_use]
    pub fn current_key_id(&self) -> &str {
        &self.current_key_id
    }

    fn header(key_id: &str) -> Vec<u8> {
        let mut header = Vec::with_capacity(2 + key_id.len());
        header.push(ENVELOPE_VERSION);
        // Length fits: key ids are validated to at most 255 bytes.
        header.push(key_id.len() as u8);
        header.extend_from_slice(key_id.as_bytes());
        header
    }

    fn unseal_at(&self, sealed: &str, now: OffsetDateTime) -> Result<Vec<u8>, SealingError> {
        let envelope = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| SealingError::Malformed)?;

        if envelope.len() < 2 || envelope[0] != ENVELOPE_VERSION {
            return Err(SealingError::Malformed);
        }

        let header_len = 2 + envelope[1] as usize;
        if envelope.len() < header_len + NONCE_SIZE + TAG_SIZE + EXPIRY_SIZE {
            return Err(SealingError::Malformed);
        }

        let (header, rest) = envelope.split_at(header_len);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        let cipher = std::str::from_utf8(&header[2..])
            .ok()
            .and_then(|key_id| self.keyring.get(key_id))
            .ok_or(SealingError::Tampered)?;

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| SealingError::Tampered)?;

        let (expiry, payload) = plaintext.split_at(EXPIRY_SIZE);
        let mut expiry_bytes = [0u8; EXPIRY_SIZE];
        expiry_bytes.copy_from_slice(expiry);
        let expires_at = i64::from_be_bytes(expiry_bytes);

        if expires_at <= now.unix_timestamp() {
            return Err(SealingError::Expired);
        }

        Ok(payload.to_vec())
    }
}

impl Sealer for AesGcmSealer {
    fn seal(&self, plaintext: &[u8], expires_at: OffsetDateTime) -> Result<String, SealingError> {
        let cipher = self
            .keyring
            .get(&self.current_key_id)
            .ok_or_else(|| SealingError::encryption("current key missing from keyring"))?;

        let header = Self::header(&self.current_key_id);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let mut message = Vec::with_capacity(EXPIRY_SIZE + plaintext.len());
        message.extend_from_slice(&expires_at.unix_timestamp().to_be_bytes());
        message.extend_from_slice(plaintext);

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &message,
                    aad: &header,
                },
            )
            .map_err(|e| SealingError::encryption(format!("AES-GCM encryption failed: {e}")))?;

        let mut envelope = header;
        envelope.reserve(NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(envelope))
    }

    fn unseal(&self, sealed: &str) -> Result<Vec<u8>, SealingError> {
        self.unseal_at(sealed, OffsetDateTime::now_utc())
    }
}

impl std::fmt::Debug for AesGcmSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut key_ids: Vec<&str> = self.keyring.keys().map(String::as_str).collect();
        key_ids.sort_unstable();
        f.debug_struct("AesGcmSealer")
            .field("current_key_id", &self.current_key_id)
            .field("key_ids", &key_ids)
            .finish()
    }
}

fn cipher_for(key: &SealerKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn validate_key_id(key_id: String) -> Result<String, ConfigError> {
    if key_id.is_empty() || key_id.len() > MAX_KEY_ID_LEN {
        return Err(ConfigError::InvalidValue(format!(
            "sealer key id must be 1-{MAX_KEY_ID_LEN} bytes, got {}",
            key_id.len()
        )));
    }
    Ok(key_id)
}
