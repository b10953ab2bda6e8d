//! Bearer access token validation for resource and userinfo endpoints.
//!
//! Access tokens are reusable until they expire or their lineage is revoked;
//! there is no replay check.

use std::sync::Arc;

use time::OffsetDateTime;

use super::grant::reject;
use crate::GrantResult;
use crate::claims::AccessTokenClaims;
use crate::error::{GrantError, InvalidGrantReason};
use crate::storage::RevocationCache;
use crate::token::TokenCodec;

/// Validates bearer access tokens.
pub struct AccessTokenValidator {
    codec: TokenCodec,
    revocation_cache: Arc<dyn RevocationCache>,
}

impl AccessTokenValidator {
    #[must_use]
    pub fn new(codec: TokenCodec, revocation_cache: Arc<dyn RevocationCache>) -> Self {
        Self {
            codec,
            revocation_cache,
        }
    }

    /// Validates `token` at the current time.
    ///
    /// # Errors
    ///
    /// See [`AccessTokenValidator::validate_at`].
    pub async fn validate(&self, token: &str) -> GrantResult<AccessTokenClaims> {
        self.validate_at(token, OffsetDateTime::now_utc()).await
    }

    /// Validates `token` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `GrantError::InvalidGrant` if the token is unreadable, not an
    /// access token, expired or revoked, and `GrantError::Storage` if the
    /// revocation cache is unavailable.
    #[tracing::instrument(skip_all)]
    pub async fn validate_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> GrantResult<AccessTokenClaims> {
        let claims = self.codec.parse_access_token(token).map_err(|e| {
            let err = GrantError::from(e);
            if let Some(reason) = err.reason() {
                tracing::warn!(reason = %reason, "Access token rejected");
            }
            err
        })?;

        let common = claims.common();
        if common.is_expired_at(now) {
            return Err(reject(InvalidGrantReason::Expired));
        }
        if self
            .revocation_cache
            .is_revoked(common.lineage_id().as_str())
            .await?
        {
            return Err(reject(InvalidGrantReason::Revoked));
        }

        tracing::debug!(client_id = %common.client_id(), "Access token accepted");
        Ok(claims)
    }
}

impl std::fmt::Debug for AccessTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenValidator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{AuthorizeCodeClaims, CommonClaims, RefreshTokenClaims, TokenClaims};
    use crate::seal::{AesGcmSealer, SealerKey};
    use crate::storage::InMemoryRevocationCache;
    use std::time::Duration;

    fn setup() -> (TokenCodec, Arc<InMemoryRevocationCache>, AccessTokenValidator) {
        let sealer = AesGcmSealer::new("test", &SealerKey::generate()).unwrap();
        let codec = TokenCodec::new(Arc::new(sealer));
        let revocation = Arc::new(InMemoryRevocationCache::new());
        let validator = AccessTokenValidator::new(codec.clone(), revocation.clone());
        (codec, revocation, validator)
    }

    fn common() -> CommonClaims {
        CommonClaims::builder("s6BhdRkqt3", "https://idp.example.org", "248289761001")
            .lifetime(Duration::from_secs(600))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_access_token_reusable() {
        let (codec, _, validator) = setup();
        let claims = AccessTokenClaims::new(common());
        let token = codec.issue(&claims.clone().into()).unwrap();

        for _ in 0..3 {
            assert_eq!(validator.validate(&token).await.unwrap(), claims);
        }
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let (codec, _, validator) = setup();
        let claims = AccessTokenClaims::new(common());
        let expires_at = claims.common().expires_at();
        let token = codec.issue(&claims.into()).unwrap();

        let err = validator.validate_at(&token, expires_at).await.unwrap_err();
        assert_eq!(err.reason(), Some(InvalidGrantReason::Expired));
    }

    #[tokio::test]
    async fn test_revoked_lineage() {
        let (codec, revocation, validator) = setup();
        let claims = AccessTokenClaims::new(common());
        let lineage = claims.common().lineage_id().clone();
        let token = codec.issue(&claims.into()).unwrap();

        revocation.revoke_until(
            lineage.as_str(),
            OffsetDateTime::now_utc() + time::Duration::hours(1),
        );
        let err = validator.validate(&token).await.unwrap_err();
        assert_eq!(err.reason(), Some(InvalidGrantReason::Revoked));
    }

    #[tokio::test]
    async fn test_codes_and_refresh_tokens_are_not_bearer_credentials() {
        let (codec, _, validator) = setup();
        let tokens: [TokenClaims; 2] = [
            AuthorizeCodeClaims::new(common(), None).into(),
            RefreshTokenClaims::new(common()).into(),
        ];
        for claims in tokens {
            let token = codec.issue(&claims).unwrap();
            let err = validator.validate(&token).await.unwrap_err();
            assert_eq!(err.reason(), Some(InvalidGrantReason::WrongType));
            assert_eq!(err.oauth_error_code(), "invalid_grant");
        }
    }
}
