//! Grant service for token endpoint operations.
//!
//! Ties the codec, validators and caches together:
//!
//! - Authorization code issuance
//! - Code exchange (validation, redirect binding, PKCE, token minting)
//! - Refresh with optional scope reduction
//! - Access token validation
//! - Lineage revocation (RFC 7009)
//!
//! # Usage
//!
//! ```ignore
//! use sealgrant_auth::token::{CodeExchange, GrantService};
//!
//! let service = GrantService::new(codec, replay_cache, revocation_cache, config);
//!
//! let tokens = service.exchange_code(&CodeExchange {
//!     code,
//!     client_id: "s6BhdRkqt3".into(),
//!     redirect_uri: Some("https://client.example.org/cb".into()),
//!     code_verifier: Some(verifier),
//! }).await?;
//! ```

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::GrantResult;
use crate::claims::common::instant_after;
use crate::claims::{AccessTokenClaims, AuthorizeCodeClaims, RefreshTokenClaims, TokenClaims};
use crate::config::GrantsConfig;
use crate::error::{GrantError, InvalidGrantReason};
use crate::oauth::grant::reject;
use crate::oauth::{AccessTokenValidator, GrantValidator, PkceValidator};
use crate::storage::{ReplayCache, RevocationCache};
use crate::token::codec::{CodecError, TokenCodec};
use crate::types::{GrantKind, Scope};

/// Token type reported in every [`TokenSet`].
pub const BEARER: &str = "Bearer";

/// An `authorization_code` grant request.
#[derive(Debug, Clone, Default)]
pub struct CodeExchange {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
}

/// A `refresh_token` grant request.
#[derive(Debug, Clone, Default)]
pub struct RefreshExchange {
    pub refresh_token: String,
    pub client_id: String,
    /// Requested scope; `None` keeps the granted scope.
    pub scope: Option<Scope>,
}

/// Tokens minted by a successful exchange.
#[derive(Debug, Clone, Serialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: Scope,

    /// Claims sealed into `access_token`.
    #[serde(skip)]
    pub claims: AccessTokenClaims,
}

/// Orchestrates the grant flows over sealed tokens.
pub struct GrantService {
    codec: TokenCodec,
    revocation_cache: Arc<dyn RevocationCache>,
    grant_validator: GrantValidator,
    access_validator: AccessTokenValidator,
    pkce_validator: PkceValidator,
    config: GrantsConfig,
}

impl GrantService {
    #[must_use]
    pub fn new(
        codec: TokenCodec,
        replay_cache: Arc<dyn ReplayCache>,
        revocation_cache: Arc<dyn RevocationCache>,
        config: GrantsConfig,
    ) -> Self {
        let mut grant_validator =
            GrantValidator::new(codec.clone(), replay_cache, revocation_cache.clone());
        if config.replay.revoke_lineage_on_replay {
            grant_validator =
                grant_validator.with_replay_revocation(config.lifetimes.refresh_token);
        }

        Self {
            access_validator: AccessTokenValidator::new(codec.clone(), revocation_cache.clone()),
            pkce_validator: PkceValidator::new(config.pkce.clone()),
            codec,
            revocation_cache,
            grant_validator,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GrantsConfig {
        &self.config
    }

    /// Seals an authorization code.
    ///
    /// The claims must name the configured issuer and must not outlive the
    /// configured authorization code lifetime.
    ///
    /// # Errors
    ///
    /// Returns `GrantError::Internal` if the claims break either rule or
    /// sealing fails.
    pub fn issue_authorization_code(&self, claims: AuthorizeCodeClaims) -> GrantResult<String> {
        let common = claims.common();
        if common.issuer() != self.config.issuer {
            tracing::warn!(
                issuer = %common.issuer(),
                expected = %self.config.issuer,
                "Refusing to seal a code for another issuer"
            );
            return Err(GrantError::internal("authorization code issuer mismatch"));
        }
        let longest = instant_after(
            common.issued_at(),
            self.config.lifetimes.authorization_code,
        );
        if common.expires_at() > longest {
            tracing::warn!(
                expires_at = %common.expires_at(),
                "Refusing to seal a code that outlives its configured lifetime"
            );
            return Err(GrantError::internal("code lifetime exceeds configuration"));
        }

        let token = self.issue(&claims.into())?;
        tracing::debug!("Issued authorization code");
        Ok(token)
    }

    /// Seals an access token.
    ///
    /// # Errors
    ///
    /// Returns `GrantError::Internal` if sealing fails.
    pub fn issue_access_token(&self, claims: AccessTokenClaims) -> GrantResult<String> {
        self.issue(&claims.into())
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// See [`GrantService::exchange_code_at`].
    pub async fn exchange_code(&self, request: &CodeExchange) -> GrantResult<TokenSet> {
        self.exchange_code_at(request, OffsetDateTime::now_utc())
            .await
    }

    /// Exchanges an authorization code for tokens as of `now`.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the code fails validation, or if it is bound to a
    ///   redirect URI that the request omits or does not repeat exactly
    /// - `InvalidMessage` or `MessageAuthentication` if PKCE fails
    /// - `Storage` if a cache is unavailable
    #[tracing::instrument(skip_all, fields(client_id = %request.client_id))]
    pub async fn exchange_code_at(
        &self,
        request: &CodeExchange,
        now: OffsetDateTime,
    ) -> GrantResult<TokenSet> {
        let grant = self
            .grant_validator
            .validate_at(
                &request.code,
                GrantKind::AuthorizationCode,
                &request.client_id,
                now,
            )
            .await?;

        // A code bound to a redirect URI requires the same URI on exchange
        match (grant.common().redirect_uri(), request.redirect_uri.as_deref()) {
            (Some(bound), Some(sent)) if bound != sent => {
                return Err(reject(InvalidGrantReason::RedirectMismatch));
            }
            (Some(_), None) => return Err(reject(InvalidGrantReason::RedirectMismatch)),
            _ => {}
        }

        self.pkce_validator
            .validate(&grant, request.code_verifier.as_deref())
            .inspect_err(|e| tracing::warn!(error = %e, "PKCE verification failed"))?;

        let Some(code) = grant.into_authorize_code() else {
            return Err(GrantError::internal("validated code grant changed kind"));
        };

        let lifetimes = &self.config.lifetimes;
        let access = AccessTokenClaims::derive_from_code(&code, lifetimes.access_token, now)?;

        let mints_refresh = !self.config.refresh.require_offline_access
            || code.common().scope().has_offline_access();
        let refresh_token = if mints_refresh {
            let refresh =
                RefreshTokenClaims::derive_from_code(&code, lifetimes.refresh_token, now)?;
            Some(self.issue(&refresh.into())?)
        } else {
            None
        };

        tracing::info!(
            subject = %code.common().subject(),
            refresh = refresh_token.is_some(),
            "Authorization code exchanged"
        );
        self.token_set(access, refresh_token)
    }

    /// Mints a new access token from a refresh token.
    ///
    /// # Errors
    ///
    /// See [`GrantService::refresh_at`].
    pub async fn refresh(&self, request: &RefreshExchange) -> GrantResult<TokenSet> {
        self.refresh_at(request, OffsetDateTime::now_utc()).await
    }

    /// Mints a new access token from a refresh token as of `now`.
    ///
    /// The refresh token itself is not rotated; it stays redeemable until it
    /// expires or its lineage is revoked.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the refresh token fails validation
    /// - `InvalidScope` if the requested scope shares nothing with the grant
    /// - `Storage` if the revocation cache is unavailable
    #[tracing::instrument(skip_all, fields(client_id = %request.client_id))]
    pub async fn refresh_at(
        &self,
        request: &RefreshExchange,
        now: OffsetDateTime,
    ) -> GrantResult<TokenSet> {
        let grant = self
            .grant_validator
            .validate_at(
                &request.refresh_token,
                GrantKind::RefreshToken,
                &request.client_id,
                now,
            )
            .await?;

        let Some(refresh) = grant.into_refresh_token() else {
            return Err(GrantError::internal("validated refresh grant changed kind"));
        };

        let access = AccessTokenClaims::derive_from_refresh(
            &refresh,
            request.scope.as_ref(),
            self.config.lifetimes.access_token,
            now,
        )?;

        tracing::info!(scope = %access.common().scope(), "Refresh token redeemed");
        self.token_set(access, None)
    }

    /// Validates a bearer access token.
    ///
    /// # Errors
    ///
    /// Returns `GrantError::InvalidGrant` if the token is unreadable, of the
    /// wrong type, expired or revoked.
    pub async fn validate_access_token(&self, token: &str) -> GrantResult<AccessTokenClaims> {
        self.access_validator.validate(token).await
    }

    /// Validates a bearer access token as of `now`.
    ///
    /// # Errors
    ///
    /// See [`GrantService::validate_access_token`].
    pub async fn validate_access_token_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> GrantResult<AccessTokenClaims> {
        self.access_validator.validate_at(token, now).await
    }

    /// Revokes the lineage of a refresh or access token (RFC 7009).
    ///
    /// Unreadable and expired tokens are accepted silently, as is anything
    /// that is neither a refresh nor an access token.
    ///
    /// # Errors
    ///
    /// Returns `GrantError::InvalidGrant` if the token belongs to another
    /// client, and `GrantError::Storage` if the revocation cache fails.
    #[tracing::instrument(skip_all, fields(client_id = %client_id))]
    pub async fn revoke(&self, token: &str, client_id: &str) -> GrantResult<()> {
        let now = OffsetDateTime::now_utc();
        let claims = match self.codec.parse_refresh_token(token) {
            Ok(refresh) => TokenClaims::from(refresh),
            Err(e) if e.is_type_mismatch() => match self.codec.parse_access_token(token) {
                Ok(access) => TokenClaims::from(access),
                Err(e) => return ignore_unrevocable(&e),
            },
            Err(e) => return ignore_unrevocable(&e),
        };

        let common = claims.common();
        if common.client_id().as_str() != client_id {
            return Err(reject(InvalidGrantReason::ClientMismatch));
        }
        if common.is_expired_at(now) {
            return Ok(());
        }

        let until = instant_after(now, self.config.lifetimes.refresh_token);
        self.revocation_cache
            .revoke(common.lineage_id().as_str(), until)
            .await?;
        tracing::info!(
            token_type = %claims.token_type(),
            lineage = %common.lineage_id(),
            "Revoked token lineage"
        );
        Ok(())
    }

    fn issue(&self, claims: &TokenClaims) -> GrantResult<String> {
        self.codec
            .issue(claims)
            .map_err(|e| GrantError::internal(format!("failed to seal token: {e}")))
    }

    fn token_set(
        &self,
        access: AccessTokenClaims,
        refresh_token: Option<String>,
    ) -> GrantResult<TokenSet> {
        let access_token = self.issue(&access.clone().into())?;
        let common = access.common();
        Ok(TokenSet {
            access_token,
            refresh_token,
            token_type: BEARER,
            expires_in: common.expires_in(common.issued_at()),
            scope: common.scope().clone(),
            claims: access,
        })
    }
}

impl std::fmt::Debug for GrantService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantService")
            .field("issuer", &self.config.issuer)
            .finish_non_exhaustive()
    }
}

fn ignore_unrevocable(err: &CodecError) -> GrantResult<()> {
    match err {
        CodecError::Sealing(e) if !e.is_rejection() => Err(GrantError::internal(e.to_string())),
        _ => {
            tracing::debug!(error = %err, "Ignoring revocation of unusable token");
            Ok(())
        }
    }
}
