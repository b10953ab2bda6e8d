//! Authenticated encryption of token payloads.
//!
//! A [`Sealer`] turns bytes into an opaque, URL-safe string and back. It is
//! the only component that touches key material; everything above it deals
//! in plaintext claims.
//!
//! # Example
//!
//! ```
//! use sealgrant_auth::seal::{AesGcmSealer, Sealer, SealerKey};
//! use time::{Duration, OffsetDateTime};
//!
//! let sealer = AesGcmSealer::new("primary", &SealerKey::generate()).unwrap();
//! let expires_at = OffsetDateTime::now_utc() + Duration::minutes(5);
//!
//! let sealed = sealer.seal(b"payload", expires_at).unwrap();
//! assert_eq!(sealer.unseal(&sealed).unwrap(), b"payload");
//! ```

pub mod aes;
pub mod key;

pub use aes::AesGcmSealer;
pub use key::SealerKey;

use time::OffsetDateTime;

/// Errors raised while sealing or unsealing.
///
/// Unsealing only ever yields `Tampered`, `Expired` or `Malformed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SealingError {
    /// The authentication tag did not verify, or the key is unknown.
    #[error("Sealed value failed authentication")]
    Tampered,

    /// The value is past its sealed expiry.
    #[error("Sealed value has expired")]
    Expired,

    /// The value is not a well-formed envelope.
    #[error("Sealed value is malformed")]
    Malformed,

    /// Sealing itself failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),
}

impl SealingError {
    /// Create an `Encryption` error.
    #[must_use]
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption(message.into())
    }

    /// Returns `true` if the failure is attributable to the presented value.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Tampered | Self::Expired | Self::Malformed)
    }
}

/// Authenticated-encryption codec for opaque tokens.
///
/// Implementations must provide confidentiality and integrity, and must
/// refuse to unseal a value after the `expires_at` it was sealed with.
/// Sealing is CPU-bound and performs no I/O.
pub trait Sealer: Send + Sync {
    /// Seals `plaintext` into a URL-safe string valid until `expires_at`.
    fn seal(&self, plaintext: &[u8], expires_at: OffsetDateTime) -> Result<String, SealingError>;

    /// Recovers the plaintext from a sealed string.
    fn unseal(&self, sealed: &str) -> Result<Vec<u8>, SealingError>;
}
