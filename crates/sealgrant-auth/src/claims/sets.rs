//! Typed claims sets and the rules for deriving one from another.

use std::time::Duration;

use time::OffsetDateTime;

use super::{ClaimsError, CommonClaims, ConsentClaims, DeliveryClaims};
use crate::error::GrantError;
use crate::types::{Scope, TokenType};
use crate::GrantResult;

// =============================================================================
// Authorization Code
// =============================================================================

/// Claims sealed into an authorization code.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizeCodeClaims {
    common: CommonClaims,
    code_challenge: Option<String>,
}

impl AuthorizeCodeClaims {
    /// Creates code claims. `code_challenge` is the method-prefixed stored
    /// form, see [`crate::oauth::CodeChallenge`].
    #[must_use]
    pub fn new(common: CommonClaims, code_challenge: Option<String>) -> Self {
        Self {
            common,
            code_challenge,
        }
    }

    #[must_use]
    pub fn common(&self) -> &CommonClaims {
        &self.common
    }

    #[must_use]
    pub fn code_challenge(&self) -> Option<&str> {
        self.code_challenge.as_deref()
    }
}

// =============================================================================
// Access Token
// =============================================================================

/// Claims sealed into a bearer access token.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessTokenClaims {
    common: CommonClaims,
}

impl AccessTokenClaims {
    /// Creates access token claims that do not descend from a code.
    #[must_use]
    pub fn new(common: CommonClaims) -> Self {
        Self { common }
    }

    /// Derives the access token issued in exchange for `code`.
    ///
    /// The token joins the code's lineage and carries its identity, scope,
    /// consent and delivery claims unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ClaimsError::InvalidLifetime` for a lifetime under one second.
    pub fn derive_from_code(
        code: &AuthorizeCodeClaims,
        lifetime: Duration,
        now: OffsetDateTime,
    ) -> Result<Self, ClaimsError> {
        let common = code
            .common()
            .successor()
            .issued_at(now)
            .lifetime(lifetime)
            .build()?;
        Ok(Self { common })
    }

    /// Derives an access token from a refresh token, narrowing to the
    /// `requested` scope if one is given.
    ///
    /// The effective scope is the intersection of the granted and requested
    /// scopes. When that is narrower than the granted scope, consent and all
    /// delivery claims are dropped, since they were decided for the wider
    /// grant.
    ///
    /// # Errors
    ///
    /// Returns `GrantError::InvalidScope` if the request shares no value with
    /// a non-empty granted scope.
    pub fn derive_from_refresh(
        refresh: &RefreshTokenClaims,
        requested: Option<&Scope>,
        lifetime: Duration,
        now: OffsetDateTime,
    ) -> GrantResult<Self> {
        let granted = refresh.common().scope();
        let effective = match requested {
            Some(requested) => granted.intersection(requested),
            None => granted.clone(),
        };

        if effective.is_empty() && !granted.is_empty() {
            return Err(GrantError::invalid_scope(
                "requested scope does not overlap the granted scope",
            ));
        }

        let mut builder = refresh.common().successor().issued_at(now).lifetime(lifetime);
        if effective != *granted {
            builder = builder
                .scope(effective)
                .consent(ConsentClaims::default())
                .delivery(DeliveryClaims::default());
        }

        Ok(Self {
            common: builder.build()?,
        })
    }

    #[must_use]
    pub fn common(&self) -> &CommonClaims {
        &self.common
    }
}

// =============================================================================
// Refresh Token
// =============================================================================

/// Claims sealed into a refresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenClaims {
    common: CommonClaims,
}

impl RefreshTokenClaims {
    #[must_use]
    pub fn new(common: CommonClaims) -> Self {
        Self { common }
    }

    /// Derives the refresh token issued in exchange for `code`.
    ///
    /// # Errors
    ///
    /// Returns `ClaimsError::InvalidLifetime` for a lifetime under one second.
    pub fn derive_from_code(
        code: &AuthorizeCodeClaims,
        lifetime: Duration,
        now: OffsetDateTime,
    ) -> Result<Self, ClaimsError> {
        let common = code
            .common()
            .successor()
            .issued_at(now)
            .lifetime(lifetime)
            .build()?;
        Ok(Self { common })
    }

    #[must_use]
    pub fn common(&self) -> &CommonClaims {
        &self.common
    }
}

// =============================================================================
// Token Claims
// =============================================================================

/// Any claims set the codec can seal.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenClaims {
    AuthorizationCode(AuthorizeCodeClaims),
    AccessToken(AccessTokenClaims),
    RefreshToken(RefreshTokenClaims),
}

impl TokenClaims {
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::AuthorizationCode(_) => TokenType::AuthorizationCode,
            Self::AccessToken(_) => TokenType::AccessToken,
            Self::RefreshToken(_) => TokenType::RefreshToken,
        }
    }

    #[must_use]
    pub fn common(&self) -> &CommonClaims {
        match self {
            Self::AuthorizationCode(c) => c.common(),
            Self::AccessToken(c) => c.common(),
            Self::RefreshToken(c) => c.common(),
        }
    }

    #[must_use]
    pub fn as_authorize_code(&self) -> Option<&AuthorizeCodeClaims> {
        match self {
            Self::AuthorizationCode(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_access_token(&self) -> Option<&AccessTokenClaims> {
        match self {
            Self::AccessToken(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_refresh_token(&self) -> Option<&RefreshTokenClaims> {
        match self {
            Self::RefreshToken(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_authorize_code(self) -> Option<AuthorizeCodeClaims> {
        match self {
            Self::AuthorizationCode(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_access_token(self) -> Option<AccessTokenClaims> {
        match self {
            Self::AccessToken(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_refresh_token(self) -> Option<RefreshTokenClaims> {
        match self {
            Self::RefreshToken(c) => Some(c),
            _ => None,
        }
    }

    /// A readable JSON rendering with full claim names, for diagnostics.
    ///
    /// Instants are unix seconds. Absent optional claims are `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let c = self.common();
        serde_json::json!({
            "token_type": self.token_type().as_str(),
            "id": c.id().as_str(),
            "lineage_id": c.lineage_id().as_str(),
            "client_id": c.client_id().as_str(),
            "issuer": c.issuer(),
            "user_principal": c.user_principal(),
            "subject": c.subject(),
            "acr": c.acr(),
            "issued_at": c.issued_at().unix_timestamp(),
            "expires_at": c.expires_at().unix_timestamp(),
            "auth_time": c.auth_time().unix_timestamp(),
            "redirect_uri": c.redirect_uri(),
            "audience": c.audience(),
            "scope": c.scope().as_joined(),
            "nonce": c.nonce(),
            "code_challenge": self
                .as_authorize_code()
                .and_then(AuthorizeCodeClaims::code_challenge),
            "consent": {
                "consentable": c.consent().consentable,
                "consented": c.consent().consented,
            },
            "delivery": {
                "general": c.delivery().general,
                "id_token": c.delivery().id_token,
                "userinfo": c.delivery().userinfo,
            },
        })
    }
}

impl From<AuthorizeCodeClaims> for TokenClaims {
    fn from(claims: AuthorizeCodeClaims) -> Self {
        Self::AuthorizationCode(claims)
    }
}

impl From<AccessTokenClaims> for TokenClaims {
    fn from(claims: AccessTokenClaims) -> Self {
        Self::AccessToken(claims)
    }
}

impl From<RefreshTokenClaims> for TokenClaims {
    fn from(claims: RefreshTokenClaims) -> Self {
        Self::RefreshToken(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-03-01 12:00:00 UTC);

    fn bag(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    fn code(scope: &str) -> AuthorizeCodeClaims {
        let common = CommonClaims::builder("s6BhdRkqt3", "https://idp.example.org", "248289761001")
            .issued_at(NOW - time::Duration::minutes(1))
            .nonce("n-0S6_WzA2Mj")
            .acr("urn:mace:incommon:iap:silver")
            .redirect_uri("https://client.example.org/cb")
            .scope(Scope::from_delimited(scope))
            .consent(ConsentClaims::new(
                vec!["email".into(), "name".into()],
                vec!["email".into()],
            ))
            .delivery(DeliveryClaims::new(
                bag(json!({"email": "jane@example.org"})),
                bag(json!({"name": "Jane"})),
                bag(json!({"locale": "de-DE"})),
            ))
            .build()
            .unwrap();
        AuthorizeCodeClaims::new(common, Some("plainabc".into()))
    }

    fn refresh(scope: &str) -> RefreshTokenClaims {
        RefreshTokenClaims::derive_from_code(&code(scope), Duration::from_secs(7200), NOW).unwrap()
    }

    // -------------------------------------------------------------------------
    // Derivation from a code
    // -------------------------------------------------------------------------

    #[test]
    fn test_access_from_code_copies_context() {
        let code = code("openid profile");
        let access =
            AccessTokenClaims::derive_from_code(&code, Duration::from_secs(600), NOW).unwrap();
        let (c, a) = (code.common(), access.common());

        assert_ne!(a.id(), c.id());
        assert_eq!(a.lineage_id(), c.id());
        assert_eq!(a.client_id(), c.client_id());
        assert_eq!(a.subject(), c.subject());
        assert_eq!(a.acr(), c.acr());
        assert_eq!(a.nonce(), c.nonce());
        assert_eq!(a.auth_time(), c.auth_time());
        assert_eq!(a.scope(), c.scope());
        assert_eq!(a.consent(), c.consent());
        assert_eq!(a.delivery(), c.delivery());
        assert_eq!(a.issued_at(), NOW);
        assert_eq!(a.expires_at(), NOW + time::Duration::minutes(10));
    }

    #[test]
    fn test_refresh_from_code_shares_lineage() {
        let code = code("openid offline_access");
        let refresh =
            RefreshTokenClaims::derive_from_code(&code, Duration::from_secs(7200), NOW).unwrap();
        assert_eq!(refresh.common().lineage_id(), code.common().id());
        assert_eq!(refresh.common().expires_at(), NOW + time::Duration::hours(2));
    }

    // -------------------------------------------------------------------------
    // Derivation from a refresh token
    // -------------------------------------------------------------------------

    #[test]
    fn test_refresh_reduction_drops_consent_and_delivery() {
        let refresh = refresh("1 2 3");
        let requested = Scope::from_delimited("2 4");

        let access = AccessTokenClaims::derive_from_refresh(
            &refresh,
            Some(&requested),
            Duration::from_secs(600),
            NOW,
        )
        .unwrap();

        assert_eq!(access.common().scope(), &Scope::from_delimited("2"));
        assert!(access.common().consent().is_empty());
        assert!(access.common().delivery().is_empty());
        assert_eq!(access.common().lineage_id(), refresh.common().lineage_id());
    }

    #[test]
    fn test_refresh_superset_preserves_consent_and_delivery() {
        let refresh = refresh("1 2 3");
        let requested = Scope::from_delimited("1 2 3 4");

        let access = AccessTokenClaims::derive_from_refresh(
            &refresh,
            Some(&requested),
            Duration::from_secs(600),
            NOW,
        )
        .unwrap();

        assert_eq!(access.common().scope(), refresh.common().scope());
        assert_eq!(access.common().consent(), refresh.common().consent());
        assert_eq!(access.common().delivery(), refresh.common().delivery());
    }

    #[test]
    fn test_refresh_equal_or_absent_scope_preserves() {
        let refresh = refresh("1 2 3");
        let same = Scope::from_delimited("3 2 1");

        for requested in [Some(&same), None] {
            let access = AccessTokenClaims::derive_from_refresh(
                &refresh,
                requested,
                Duration::from_secs(600),
                NOW,
            )
            .unwrap();
            assert!(!access.common().delivery().is_empty());
            assert!(!access.common().consent().is_empty());
        }
    }

    #[test]
    fn test_refresh_disjoint_scope_rejected() {
        let refresh = refresh("openid profile");
        let requested = Scope::from_delimited("admin");

        let err = AccessTokenClaims::derive_from_refresh(
            &refresh,
            Some(&requested),
            Duration::from_secs(600),
            NOW,
        )
        .unwrap_err();
        assert!(matches!(err, GrantError::InvalidScope { .. }));
    }

    // -------------------------------------------------------------------------
    // Token claims
    // -------------------------------------------------------------------------

    #[test]
    fn test_token_claims_discriminator() {
        let code = code("openid");
        let claims = TokenClaims::from(code.clone());
        assert_eq!(claims.token_type(), TokenType::AuthorizationCode);
        assert_eq!(claims.common(), code.common());
        assert!(claims.as_access_token().is_none());
        assert_eq!(claims.into_authorize_code(), Some(code));

        let claims = TokenClaims::from(refresh("openid"));
        assert_eq!(claims.token_type(), TokenType::RefreshToken);
        assert!(claims.into_authorize_code().is_none());
    }

    #[test]
    fn test_to_json_uses_full_names() {
        let json = TokenClaims::from(code("openid profile")).to_json();
        assert_eq!(json["token_type"], "authorization_code");
        assert_eq!(json["client_id"], "s6BhdRkqt3");
        assert_eq!(json["scope"], "openid profile");
        assert_eq!(json["code_challenge"], "plainabc");
        assert_eq!(json["consent"]["consented"], json!(["email"]));
        assert_eq!(json["delivery"]["userinfo"]["locale"], "de-DE");
        assert_eq!(json["issued_at"], (NOW - time::Duration::minutes(1)).unix_timestamp());

        let json = TokenClaims::from(refresh("openid")).to_json();
        assert_eq!(json["token_type"], "refresh_token");
        assert!(json["code_challenge"].is_null());
    }
}
