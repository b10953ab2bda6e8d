//! Validation of sealed grants presented at the token endpoint.
//!
//! # Validation Order
//!
//! 1. Unseal and decode as the token type the grant kind requires
//! 2. Client binding
//! 3. Expiry
//! 4. Codes: single-use check against the replay cache, keyed by code id.
//!    Refresh tokens: revocation check keyed by lineage id.
//!
//! Every failure surfaces as [`GrantError::InvalidGrant`]; the specific
//! [`InvalidGrantReason`] is logged but never displayed.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::GrantResult;
use crate::claims::common::instant_after;
use crate::claims::{AuthorizeCodeClaims, CommonClaims, RefreshTokenClaims, TokenClaims};
use crate::error::{GrantError, InvalidGrantReason};
use crate::storage::{ReplayCache, RevocationCache};
use crate::token::TokenCodec;
use crate::types::GrantKind;

/// A grant that passed validation, ready to be exchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedGrant {
    AuthorizationCode(AuthorizeCodeClaims),
    RefreshToken(RefreshTokenClaims),
}

impl ValidatedGrant {
    #[must_use]
    pub fn kind(&self) -> GrantKind {
        match self {
            Self::AuthorizationCode(_) => GrantKind::AuthorizationCode,
            Self::RefreshToken(_) => GrantKind::RefreshToken,
        }
    }

    #[must_use]
    pub fn common(&self) -> &CommonClaims {
        match self {
            Self::AuthorizationCode(c) => c.common(),
            Self::RefreshToken(c) => c.common(),
        }
    }

    #[must_use]
    pub fn into_authorize_code(self) -> Option<AuthorizeCodeClaims> {
        match self {
            Self::AuthorizationCode(c) => Some(c),
            Self::RefreshToken(_) => None,
        }
    }

    #[must_use]
    pub fn into_refresh_token(self) -> Option<RefreshTokenClaims> {
        match self {
            Self::RefreshToken(c) => Some(c),
            Self::AuthorizationCode(_) => None,
        }
    }
}

/// Validates authorization codes and refresh tokens.
pub struct GrantValidator {
    codec: TokenCodec,
    replay_cache: Arc<dyn ReplayCache>,
    revocation_cache: Arc<dyn RevocationCache>,
    replay_revocation: Option<Duration>,
}

impl GrantValidator {
    #[must_use]
    pub fn new(
        codec: TokenCodec,
        replay_cache: Arc<dyn ReplayCache>,
        revocation_cache: Arc<dyn RevocationCache>,
    ) -> Self {
        Self {
            codec,
            replay_cache,
            revocation_cache,
            replay_revocation: None,
        }
    }

    /// On a replayed code, also revoke its lineage for `duration`.
    ///
    /// Tokens already minted from the code then stop validating
    /// (RFC 6749 section 4.1.2). `duration` should cover the longest-lived
    /// token the lineage can hold.
    #[must_use]
    pub fn with_replay_revocation(mut self, duration: Duration) -> Self {
        self.replay_revocation = Some(duration);
        self
    }

    /// Validates a grant at the current time.
    ///
    /// # Errors
    ///
    /// See [`GrantValidator::validate_at`].
    pub async fn validate(
        &self,
        token: &str,
        kind: GrantKind,
        client_id: &str,
    ) -> GrantResult<ValidatedGrant> {
        self.validate_at(token, kind, client_id, OffsetDateTime::now_utc())
            .await
    }

    /// Validates a grant as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `GrantError::InvalidGrant` if the token is unreadable, of the
    /// wrong type, bound to another client, expired, replayed or revoked,
    /// and `GrantError::Storage` if a cache is unavailable.
    #[tracing::instrument(skip_all, fields(grant = %kind, client_id = %client_id))]
    pub async fn validate_at(
        &self,
        token: &str,
        kind: GrantKind,
        client_id: &str,
        now: OffsetDateTime,
    ) -> GrantResult<ValidatedGrant> {
        let claims = self
            .codec
            .parse(token, kind.expected_token_type())
            .map_err(|e| {
                let err = GrantError::from(e);
                if let Some(reason) = err.reason() {
                    tracing::warn!(reason = %reason, "Grant rejected");
                }
                err
            })?;

        let common = claims.common();
        if common.client_id().as_str() != client_id {
            return Err(reject(InvalidGrantReason::ClientMismatch));
        }
        if common.is_expired_at(now) {
            return Err(reject(InvalidGrantReason::Expired));
        }

        let grant = match claims {
            TokenClaims::AuthorizationCode(code) => {
                self.check_single_use(&code, now).await?;
                ValidatedGrant::AuthorizationCode(code)
            }
            TokenClaims::RefreshToken(refresh) => {
                let lineage = refresh.common().lineage_id();
                if self.revocation_cache.is_revoked(lineage.as_str()).await? {
                    return Err(reject(InvalidGrantReason::Revoked));
                }
                ValidatedGrant::RefreshToken(refresh)
            }
            TokenClaims::AccessToken(_) => return Err(reject(InvalidGrantReason::WrongType)),
        };

        tracing::debug!(token_id = %grant.common().id(), "Grant accepted");
        Ok(grant)
    }

    async fn check_single_use(
        &self,
        code: &AuthorizeCodeClaims,
        now: OffsetDateTime,
    ) -> GrantResult<()> {
        let common = code.common();
        if self
            .replay_cache
            .check_replay(common.id().as_str(), common.expires_at())
            .await?
        {
            return Ok(());
        }

        if let Some(duration) = self.replay_revocation {
            let until = instant_after(now, duration);
            self.revocation_cache
                .revoke(common.lineage_id().as_str(), until)
                .await?;
            tracing::warn!(lineage = %common.lineage_id(), "Revoked lineage of replayed code");
        }
        Err(reject(InvalidGrantReason::Replayed))
    }
}

impl std::fmt::Debug for GrantValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantValidator")
            .field("replay_revocation", &self.replay_revocation)
            .finish_non_exhaustive()
    }
}

pub(crate) fn reject(reason: InvalidGrantReason) -> GrantError {
    tracing::warn!(reason = %reason, "Grant rejected");
    GrantError::invalid_grant(reason)
}
