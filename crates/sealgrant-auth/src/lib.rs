//! # sealgrant-auth
//!
//! Stateless OAuth 2.0 / OpenID Connect grant tokens.
//!
//! Authorization codes, access tokens and refresh tokens are self-contained
//! sealed envelopes: the claims are encrypted and authenticated with a
//! server-held key, so the server needs no per-token storage beyond a
//! single-use cache for codes and a revocation cache keyed by lineage.
//!
//! ## Overview
//!
//! A code is minted at the authorization endpoint with everything the token
//! endpoint needs (client, subject, scope, consent, PKCE challenge). At the
//! token endpoint it is unsealed, checked for client binding, expiry and
//! single use, then exchanged for an access token and optionally a refresh
//! token. Every token descending from one code shares its lineage id.
//!
//! ## Modules
//!
//! - [`seal`] - authenticated encryption of token payloads
//! - [`claims`] - typed claims sets and their derivation rules
//! - [`token`] - sealed token codec and the grant service
//! - [`oauth`] - grant, PKCE and access token validation
//! - [`storage`] - replay and revocation caches
//! - [`config`] - lifetimes, PKCE policy and sealer configuration
//! - [`types`] - identifiers, scopes and token kinds

pub mod claims;
pub mod config;
pub mod error;
pub mod oauth;
pub mod seal;
pub mod storage;
pub mod token;
pub mod types;

pub use claims::{
    AccessTokenClaims, AuthorizeCodeClaims, ClaimsBuilder, ClaimsError, CommonClaims,
    ConsentClaims, DeliveryClaims, RefreshTokenClaims, TokenClaims,
};
pub use config::{ConfigError, GrantsConfig};
pub use error::{ErrorCategory, GrantError, InvalidGrantReason};
pub use oauth::{AccessTokenValidator, GrantValidator, PkceError, PkceValidator, ValidatedGrant};
pub use seal::{AesGcmSealer, Sealer, SealerKey, SealingError};
pub use storage::{InMemoryReplayCache, InMemoryRevocationCache, ReplayCache, RevocationCache};
pub use token::{CodeExchange, GrantService, RefreshExchange, TokenCodec, TokenSet};
pub use types::{ClientId, GrantKind, Scope, TokenId, TokenType};

/// Type alias for grant operation results.
pub type GrantResult<T> = Result<T, GrantError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sealgrant_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::GrantResult;
    pub use crate::claims::{
        AccessTokenClaims, AuthorizeCodeClaims, CommonClaims, ConsentClaims, DeliveryClaims,
        RefreshTokenClaims, TokenClaims,
    };
    pub use crate::config::{ConfigError, GrantsConfig};
    pub use crate::error::{ErrorCategory, GrantError, InvalidGrantReason};
    pub use crate::oauth::{
        AccessTokenValidator, CodeChallenge, CodeChallengeMethod, GrantValidator, PkceValidator,
        ValidatedGrant,
    };
    pub use crate::seal::{AesGcmSealer, Sealer, SealerKey};
    pub use crate::storage::{
        InMemoryReplayCache, InMemoryRevocationCache, ReplayCache, RevocationCache,
    };
    pub use crate::token::{CodeExchange, GrantService, RefreshExchange, TokenCodec, TokenSet};
    pub use crate::types::{ClientId, GrantKind, Scope, TokenType};
}
