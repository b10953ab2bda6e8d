//! PKCE (Proof Key for Code Exchange) validation
//!
//! Implements RFC 7636 with the `S256` and (optionally) `plain` methods.
//!
//! The challenge is sealed inside the authorization code in a method-tagged
//! form: `"S256" + BASE64URL(SHA256(verifier))` or `"plain" + verifier`.
//!
//! # Example
//!
//! ```
//! use sealgrant_auth::config::PkceConfig;
//! use sealgrant_auth::oauth::{CodeChallenge, PkceValidator, generate_verifier};
//!
//! // Client generates a verifier and sends the S256 challenge
//! let verifier = generate_verifier();
//! let stored = CodeChallenge::s256(&verifier).to_stored();
//!
//! // Server later checks the verifier from the token request
//! let validator = PkceValidator::new(PkceConfig::default());
//! assert!(validator.verify_challenge(Some(&stored), Some(&verifier)).is_ok());
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

use super::grant::ValidatedGrant;
use crate::config::PkceConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkceError {
    /// The code carries no challenge but PKCE is enforced.
    #[error("PKCE is required but the authorization code carries no challenge")]
    ChallengeRequired,

    /// The code carries a challenge but the request has no verifier.
    #[error("code_verifier is required")]
    VerifierMissing,

    /// The `plain` method is not accepted by this server.
    #[error("The plain code challenge method is not allowed")]
    PlainMethodDisallowed,

    /// Unknown challenge method.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// The challenge value is empty.
    #[error("code_challenge cannot be empty")]
    EmptyChallenge,

    /// PKCE verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl PkceError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    /// Create an `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod(method.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if the request itself is malformed or violates policy.
    #[must_use]
    pub fn is_invalid_message(&self) -> bool {
        !self.is_verification_error()
    }

    /// Returns `true` if this is a verification failure.
    #[must_use]
    pub fn is_verification_error(&self) -> bool {
        matches!(self, Self::VerificationFailed)
    }

    /// Get the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        if self.is_verification_error() {
            "invalid_grant"
        } else {
            "invalid_request"
        }
    }
}

// =============================================================================
// Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeChallengeMethod {
    /// SHA-256 hash of the verifier.
    S256,
    /// The verifier itself.
    Plain,
}

impl CodeChallengeMethod {
    /// Parse a `code_challenge_method` request value.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything but `S256` and
    /// `plain`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::unsupported_method(other)),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Code Challenge
// =============================================================================

/// A code challenge together with its method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge {
    method: CodeChallengeMethod,
    value: String,
}

impl CodeChallenge {
    /// Computes the `S256` challenge for `verifier`.
    ///
    /// `BASE64URL(SHA256(ASCII(code_verifier)))`
    #[must_use]
    pub fn s256(verifier: &str) -> Self {
        Self {
            method: CodeChallengeMethod::S256,
            value: s256_hash(verifier),
        }
    }

    /// A `plain` challenge.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            method: CodeChallengeMethod::Plain,
            value: value.into(),
        }
    }

    /// Builds a challenge from authorization request parameters.
    ///
    /// The method defaults to `plain` when absent (RFC 7636 section 4.3).
    ///
    /// # Errors
    ///
    /// Returns `PkceError::EmptyChallenge` for an empty challenge and
    /// `PkceError::UnsupportedMethod` for an unknown method.
    pub fn from_request(challenge: &str, method: Option<&str>) -> Result<Self, PkceError> {
        if challenge.is_empty() {
            return Err(PkceError::EmptyChallenge);
        }
        let method = match method {
            Some(method) => CodeChallengeMethod::parse(method)?,
            None => CodeChallengeMethod::Plain,
        };
        Ok(Self {
            method,
            value: challenge.to_string(),
        })
    }

    /// Parses the stored, method-tagged form.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` if the tag is not recognised.
    pub fn parse(stored: &str) -> Result<Self, PkceError> {
        for method in [CodeChallengeMethod::S256, CodeChallengeMethod::Plain] {
            if let Some(value) = stored.strip_prefix(method.as_str()) {
                return Ok(Self {
                    method,
                    value: value.to_string(),
                });
            }
        }
        Err(PkceError::unsupported_method("unrecognised challenge tag"))
    }

    /// The method-tagged form sealed into authorization codes.
    #[must_use]
    pub fn to_stored(&self) -> String {
        format!("{}{}", self.method.as_str(), self.value)
    }

    #[must_use]
    pub fn method(&self) -> CodeChallengeMethod {
        self.method
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Verify that a verifier matches this challenge.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` if the verifier doesn't match.
    pub fn verify(&self, verifier: &str) -> Result<(), PkceError> {
        let computed = match self.method {
            CodeChallengeMethod::S256 => s256_hash(verifier),
            CodeChallengeMethod::Plain => verifier.to_string(),
        };
        if constant_time_eq(computed.as_bytes(), self.value.as_bytes()) {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }
}

impl fmt::Display for CodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.method.as_str(), self.value)
    }
}

/// Generate a cryptographically random verifier.
///
/// 32 random bytes encoded as base64url (43 characters).
#[must_use]
pub fn generate_verifier() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    // `gen` is a reserved keyword in Rust 2024, so we use r#gen
    let bytes: [u8; 32] = rng.r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn s256_hash(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =============================================================================
// Validator
// =============================================================================

/// Checks a token request's `code_verifier` against the sealed challenge.
#[derive(Debug, Clone, Default)]
pub struct PkceValidator {
    config: PkceConfig,
}

impl PkceValidator {
    #[must_use]
    pub fn new(config: PkceConfig) -> Self {
        Self { config }
    }

    /// Validates PKCE for a validated grant.
    ///
    /// Refresh token grants bypass PKCE.
    ///
    /// # Errors
    ///
    /// See [`PkceValidator::verify_challenge`].
    pub fn validate(
        &self,
        grant: &ValidatedGrant,
        verifier: Option<&str>,
    ) -> Result<(), PkceError> {
        match grant {
            ValidatedGrant::AuthorizationCode(code) => {
                self.verify_challenge(code.code_challenge(), verifier)
            }
            ValidatedGrant::RefreshToken(_) => Ok(()),
        }
    }

    /// Validates `verifier` against a stored challenge.
    ///
    /// # Errors
    ///
    /// - `ChallengeRequired` if there is no challenge and PKCE is forced
    /// - `UnsupportedMethod` if the stored tag is unknown
    /// - `PlainMethodDisallowed` for a `plain` challenge when not allowed
    /// - `VerifierMissing` if a challenge exists but no verifier was sent
    /// - `VerificationFailed` if the verifier does not match
    pub fn verify_challenge(
        &self,
        challenge: Option<&str>,
        verifier: Option<&str>,
    ) -> Result<(), PkceError> {
        let Some(stored) = challenge else {
            if self.config.force {
                return Err(PkceError::ChallengeRequired);
            }
            return Ok(());
        };

        let challenge = CodeChallenge::parse(stored)?;
        if challenge.method() == CodeChallengeMethod::Plain && !self.config.allow_plain {
            return Err(PkceError::PlainMethodDisallowed);
        }

        let verifier = verifier.ok_or(PkceError::VerifierMissing)?;
        challenge.verify(verifier)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{AuthorizeCodeClaims, CommonClaims, RefreshTokenClaims};

    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    fn validator(force: bool, allow_plain: bool) -> PkceValidator {
        PkceValidator::new(PkceConfig { force, allow_plain })
    }

    fn common() -> CommonClaims {
        CommonClaims::builder("client", "https://idp.example.org", "sub")
            .build()
            .unwrap()
    }

    // -------------------------------------------------------------------------
    // Challenge Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_rfc7636_appendix_b_test_vector() {
        let challenge = CodeChallenge::s256(RFC_VERIFIER);
        assert_eq!(challenge.value(), RFC_CHALLENGE);
        assert_eq!(challenge.to_stored(), format!("S256{RFC_CHALLENGE}"));
        assert!(challenge.verify(RFC_VERIFIER).is_ok());
    }

    #[test]
    fn test_parse_stored() {
        let parsed = CodeChallenge::parse(&format!("S256{RFC_CHALLENGE}")).unwrap();
        assert_eq!(parsed.method(), CodeChallengeMethod::S256);
        assert_eq!(parsed.value(), RFC_CHALLENGE);

        let parsed = CodeChallenge::parse("plainabc").unwrap();
        assert_eq!(parsed, CodeChallenge::plain("abc"));

        let err = CodeChallenge::parse("S512xyz").unwrap_err();
        assert!(matches!(err, PkceError::UnsupportedMethod(_)));
    }

    #[test]
    fn test_from_request() {
        let challenge = CodeChallenge::from_request(RFC_CHALLENGE, Some("S256")).unwrap();
        assert_eq!(challenge.method(), CodeChallengeMethod::S256);

        // RFC 7636 4.3: method defaults to plain
        let challenge = CodeChallenge::from_request("abc", None).unwrap();
        assert_eq!(challenge.method(), CodeChallengeMethod::Plain);
        assert_eq!(challenge.to_string(), "plainabc");

        assert!(matches!(
            CodeChallenge::from_request("abc", Some("S384")),
            Err(PkceError::UnsupportedMethod(_))
        ));
        assert_eq!(
            CodeChallenge::from_request("", Some("S256")),
            Err(PkceError::EmptyChallenge)
        );
    }

    #[test]
    fn test_generated_verifier() {
        let a = generate_verifier();
        let b = generate_verifier();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    // -------------------------------------------------------------------------
    // Validator Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_s256_success_and_mismatch() {
        let v = validator(false, false);
        let stored = CodeChallenge::s256(RFC_VERIFIER).to_stored();

        assert!(v.verify_challenge(Some(&stored), Some(RFC_VERIFIER)).is_ok());

        for wrong in ["", "x", "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXK"] {
            assert_eq!(
                v.verify_challenge(Some(&stored), Some(wrong)),
                Err(PkceError::VerificationFailed)
            );
        }
    }

    #[test]
    fn test_plain_gating() {
        let stored = "plainsecret-value";

        assert_eq!(
            validator(false, false).verify_challenge(Some(stored), Some("secret-value")),
            Err(PkceError::PlainMethodDisallowed)
        );

        let allowing = validator(false, true);
        assert!(
            allowing
                .verify_challenge(Some(stored), Some("secret-value"))
                .is_ok()
        );
        assert_eq!(
            allowing.verify_challenge(Some(stored), Some("other")),
            Err(PkceError::VerificationFailed)
        );
    }

    #[test]
    fn test_no_challenge() {
        assert!(validator(false, false).verify_challenge(None, None).is_ok());
        assert!(
            validator(false, false)
                .verify_challenge(None, Some("ignored"))
                .is_ok()
        );
        assert_eq!(
            validator(true, false).verify_challenge(None, Some("v")),
            Err(PkceError::ChallengeRequired)
        );
    }

    #[test]
    fn test_verifier_missing() {
        let stored = CodeChallenge::s256(RFC_VERIFIER).to_stored();
        assert_eq!(
            validator(false, false).verify_challenge(Some(&stored), None),
            Err(PkceError::VerifierMissing)
        );
    }

    #[test]
    fn test_refresh_grant_bypasses_pkce() {
        let forced = validator(true, false);
        let refresh = ValidatedGrant::RefreshToken(RefreshTokenClaims::new(common()));
        assert!(forced.validate(&refresh, None).is_ok());

        let code = ValidatedGrant::AuthorizationCode(AuthorizeCodeClaims::new(common(), None));
        assert_eq!(
            forced.validate(&code, None),
            Err(PkceError::ChallengeRequired)
        );
    }

    // -------------------------------------------------------------------------
    // Error Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_error_classification() {
        assert!(PkceError::VerificationFailed.is_verification_error());
        assert!(!PkceError::VerificationFailed.is_invalid_message());
        for err in [
            PkceError::ChallengeRequired,
            PkceError::VerifierMissing,
            PkceError::PlainMethodDisallowed,
            PkceError::EmptyChallenge,
            PkceError::unsupported_method("S512"),
        ] {
            assert!(err.is_invalid_message());
            assert_eq!(err.oauth_error_code(), "invalid_request");
        }
        assert_eq!(
            PkceError::VerificationFailed.oauth_error_code(),
            "invalid_grant"
        );
    }
}
