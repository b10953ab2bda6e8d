//! Binds the claims model to a [`Sealer`].
//!
//! `issue` encodes a claims set canonically and seals it with the claims'
//! own expiry. `parse` unseals, then decodes, refusing any token whose
//! sealed type differs from the one the caller asked for.

use std::sync::Arc;

use crate::claims::{AccessTokenClaims, AuthorizeCodeClaims, RefreshTokenClaims, TokenClaims, wire};
use crate::seal::{Sealer, SealingError};
use crate::types::TokenType;

/// Errors raised while decoding an unsealed payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The token is of a different type than the one expected.
    #[error("Expected a {expected} but found a {found}")]
    TypeMismatch {
        expected: TokenType,
        found: TokenType,
    },

    /// A required claim is absent.
    #[error("Missing required claim: {0}")]
    MissingField(&'static str),

    /// The payload is not a valid claims encoding.
    #[error("Malformed claims: {0}")]
    Malformed(String),
}

/// Errors returned by [`TokenCodec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Sealing(#[from] SealingError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The claims could not be encoded.
    #[error("Failed to encode claims: {0}")]
    Encoding(String),
}

impl CodecError {
    /// Returns `true` if the error is a token type mismatch.
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::Parse(ParseError::TypeMismatch { .. }))
    }
}

/// Issues and parses sealed tokens.
#[derive(Clone)]
pub struct TokenCodec {
    sealer: Arc<dyn Sealer>,
}

impl TokenCodec {
    #[must_use]
    pub fn new(sealer: Arc<dyn Sealer>) -> Self {
        Self { sealer }
    }

    /// Seals `claims` into an opaque token valid until the claims expire.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encoding` or `CodecError::Sealing` if the claims
    /// cannot be encoded or sealed.
    pub fn issue(&self, claims: &TokenClaims) -> Result<String, CodecError> {
        let bytes = wire::encode(claims).map_err(|e| CodecError::Encoding(e.to_string()))?;
        let token = self.sealer.seal(&bytes, claims.common().expires_at())?;
        Ok(token)
    }

    /// Unseals `token` and decodes it as a claims set of type `expected`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Sealing` if the token is tampered, expired or
    /// malformed, and `CodecError::Parse` if it is of another type or its
    /// claims are incomplete.
    pub fn parse(&self, token: &str, expected: TokenType) -> Result<TokenClaims, CodecError> {
        let bytes = self.sealer.unseal(token)?;
        let claims = wire::decode(&bytes, expected)?;
        Ok(claims)
    }

    /// Parses an authorization code.
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::parse`].
    pub fn parse_authorize_code(&self, token: &str) -> Result<AuthorizeCodeClaims, CodecError> {
        match self.parse(token, TokenType::AuthorizationCode)? {
            TokenClaims::AuthorizationCode(claims) => Ok(claims),
            other => Err(mismatch(TokenType::AuthorizationCode, &other)),
        }
    }

    /// Parses a bearer access token.
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::parse`].
    pub fn parse_access_token(&self, token: &str) -> Result<AccessTokenClaims, CodecError> {
        match self.parse(token, TokenType::AccessToken)? {
            TokenClaims::AccessToken(claims) => Ok(claims),
            other => Err(mismatch(TokenType::AccessToken, &other)),
        }
    }

    /// Parses a refresh token.
    ///
    /// # Errors
    ///
    /// See [`TokenCodec::parse`].
    pub fn parse_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, CodecError> {
        match self.parse(token, TokenType::RefreshToken)? {
            TokenClaims::RefreshToken(claims) => Ok(claims),
            other => Err(mismatch(TokenType::RefreshToken, &other)),
        }
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

fn mismatch(expected: TokenType, found: &TokenClaims) -> CodecError {
    CodecError::Parse(ParseError::TypeMismatch {
        expected,
        found: found.token_type(),
    })
}
