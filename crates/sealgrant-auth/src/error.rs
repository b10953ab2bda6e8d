//! Grant validation error types.
//!
//! This module defines the externally surfaced error taxonomy. Lower layers
//! (sealer, codec, PKCE) have their own error enums which are folded into
//! [`GrantError`] at the validator boundary.
//!
//! # Oracle resistance
//!
//! [`GrantError::InvalidGrant`] carries the specific [`InvalidGrantReason`]
//! for server-side logging, but its `Display` output is always the same.
//! Callers that echo errors back to a client cannot leak which check failed.

use std::fmt;

use crate::claims::ClaimsError;
use crate::oauth::pkce::PkceError;
use crate::seal::SealingError;
use crate::token::codec::{CodecError, ParseError};

/// Errors surfaced by grant, PKCE, and access token validation.
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    /// The grant or bearer token is wrong-typed, expired, bound to another
    /// client, replayed, or revoked.
    #[error("Invalid grant")]
    InvalidGrant {
        /// The check that failed. Not part of the display output.
        reason: InvalidGrantReason,
    },

    /// The requested scope cannot be granted.
    #[error("Invalid scope: {message}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        message: String,
    },

    /// The request is malformed (bad PKCE challenge, missing verifier,
    /// forced PKCE violated).
    #[error("Invalid request: {message}")]
    InvalidMessage {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The PKCE code verifier does not match the stored challenge.
    #[error("Message authentication failed")]
    MessageAuthentication,

    /// A replay or revocation cache operation failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred (e.g. sealing a new token).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

/// The specific check behind an [`GrantError::InvalidGrant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidGrantReason {
    /// The token is a different kind than the one required.
    WrongType,
    /// The token could not be unsealed or decoded.
    Unreadable,
    /// The token has expired.
    Expired,
    /// The token was issued to a different client.
    ClientMismatch,
    /// The redirect URI differs from the one the code was issued for.
    RedirectMismatch,
    /// The authorization code has already been redeemed.
    Replayed,
    /// The grant lineage has been revoked.
    Revoked,
}

impl InvalidGrantReason {
    /// Returns the reason as a short string for log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WrongType => "wrong_type",
            Self::Unreadable => "unreadable",
            Self::Expired => "expired",
            Self::ClientMismatch => "client_mismatch",
            Self::RedirectMismatch => "redirect_mismatch",
            Self::Replayed => "replayed",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for InvalidGrantReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl GrantError {
    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(reason: InvalidGrantReason) -> Self {
        Self::InvalidGrant { reason }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(message: impl Into<String>) -> Self {
        Self::InvalidScope {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidMessage` error.
    #[must_use]
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the invalid-grant reason, if this is an `InvalidGrant` error.
    #[must_use]
    pub fn reason(&self) -> Option<InvalidGrantReason> {
        match self {
            Self::InvalidGrant { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Returns `true` if this is an `InvalidGrant` error.
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::InvalidGrant { .. })
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidGrant { .. }
                | Self::InvalidScope { .. }
                | Self::InvalidMessage { .. }
                | Self::MessageAuthentication
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Internal { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidGrant { .. } => ErrorCategory::Grant,
            Self::InvalidScope { .. } => ErrorCategory::Authorization,
            Self::InvalidMessage { .. } => ErrorCategory::Validation,
            Self::MessageAuthentication => ErrorCategory::ProofOfPossession,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::InvalidMessage { .. } => "invalid_request",
            Self::MessageAuthentication => "invalid_grant",
            Self::Storage { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

impl From<PkceError> for GrantError {
    fn from(err: PkceError) -> Self {
        if err.is_verification_error() {
            Self::MessageAuthentication
        } else {
            Self::invalid_message(err.to_string())
        }
    }
}

impl From<ClaimsError> for GrantError {
    /// Minted claims that break their invariants are internal errors.
    fn from(err: ClaimsError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<CodecError> for GrantError {
    /// Decoding failures on an inbound token are always grant failures.
    fn from(err: CodecError) -> Self {
        let reason = match err {
            CodecError::Parse(ParseError::TypeMismatch { .. }) => InvalidGrantReason::WrongType,
            CodecError::Sealing(SealingError::Expired) => InvalidGrantReason::Expired,
            _ => InvalidGrantReason::Unreadable,
        };
        Self::invalid_grant(reason)
    }
}

/// Categories of grant errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Grant or bearer token validation failures.
    Grant,
    /// Scope decisions.
    Authorization,
    /// Malformed request data.
    Validation,
    /// PKCE verifier mismatch; possibly an attack.
    ProofOfPossession,
    /// Cache/storage failures.
    Infrastructure,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant => write!(f, "grant"),
            Self::Authorization => write!(f, "authorization"),
            Self::Validation => write!(f, "validation"),
            Self::ProofOfPossession => write!(f, "proof_of_possession"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
