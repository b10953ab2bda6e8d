//! Fields shared by every token claims set, and their builder.

use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime, UtcOffset};

use super::{ClaimsError, ConsentClaims, DeliveryClaims};
use crate::types::{ClientId, Scope, TokenId};

/// Default lifetime when neither `lifetime` nor `expires_at` is set.
const DEFAULT_LIFETIME: StdDuration = StdDuration::from_secs(300);

/// Protocol state common to authorization codes, access and refresh tokens.
///
/// Immutable once built. Narrowing scope or consent produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonClaims {
    id: TokenId,
    lineage_id: TokenId,
    client_id: ClientId,
    issuer: String,
    user_principal: String,
    subject: String,
    acr: Option<String>,
    issued_at: OffsetDateTime,
    expires_at: OffsetDateTime,
    auth_time: OffsetDateTime,
    redirect_uri: Option<String>,
    audience: Vec<String>,
    scope: Scope,
    nonce: Option<String>,
    consent: ConsentClaims,
    delivery: DeliveryClaims,
}

impl CommonClaims {
    /// Starts building a claims set for `subject`, issued by `issuer` to
    /// `client_id`.
    pub fn builder(
        client_id: impl Into<ClientId>,
        issuer: impl Into<String>,
        subject: impl Into<String>,
    ) -> ClaimsBuilder {
        ClaimsBuilder::new(client_id, issuer, subject)
    }

    /// Unique id of this token.
    #[must_use]
    pub fn id(&self) -> &TokenId {
        &self.id
    }

    /// Id of the grant family this token belongs to.
    #[must_use]
    pub fn lineage_id(&self) -> &TokenId {
        &self.lineage_id
    }

    #[must_use]
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Internal principal name of the authenticated user.
    #[must_use]
    pub fn user_principal(&self) -> &str {
        &self.user_principal
    }

    /// Subject identifier released to the client.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Authentication context class reference.
    #[must_use]
    pub fn acr(&self) -> Option<&str> {
        self.acr.as_deref()
    }

    #[must_use]
    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Instant of the original end-user authentication.
    #[must_use]
    pub fn auth_time(&self) -> OffsetDateTime {
        self.auth_time
    }

    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    #[must_use]
    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    #[must_use]
    pub fn consent(&self) -> &ConsentClaims {
        &self.consent
    }

    #[must_use]
    pub fn delivery(&self) -> &DeliveryClaims {
        &self.delivery
    }

    /// Returns `true` if the token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Seconds left until expiry at `now`, never negative.
    #[must_use]
    pub fn expires_in(&self, now: OffsetDateTime) -> i64 {
        (self.expires_at - now).whole_seconds().max(0)
    }

    /// A builder pre-filled with every field except the id and the
    /// issued/expires instants, for deriving the next token in a lineage.
    pub(crate) fn successor(&self) -> ClaimsBuilder {
        ClaimsBuilder {
            id: None,
            lineage_id: Some(self.lineage_id.clone()),
            client_id: self.client_id.clone(),
            issuer: self.issuer.clone(),
            user_principal: Some(self.user_principal.clone()),
            subject: self.subject.clone(),
            acr: self.acr.clone(),
            issued_at: None,
            lifetime: None,
            expires_at: None,
            auth_time: Some(self.auth_time),
            redirect_uri: self.redirect_uri.clone(),
            audience: self.audience.clone(),
            scope: self.scope.clone(),
            nonce: self.nonce.clone(),
            consent: self.consent.clone(),
            delivery: self.delivery.clone(),
        }
    }
}

/// Builder for [`CommonClaims`].
///
/// Defaults: the user principal is the subject, `issued_at` and `auth_time`
/// are now, the lifetime is five minutes, the id is random and the lineage
/// is the token's own id.
#[derive(Debug, Clone)]
pub struct ClaimsBuilder {
    id: Option<TokenId>,
    lineage_id: Option<TokenId>,
    client_id: ClientId,
    issuer: String,
    user_principal: Option<String>,
    subject: String,
    acr: Option<String>,
    issued_at: Option<OffsetDateTime>,
    lifetime: Option<StdDuration>,
    expires_at: Option<OffsetDateTime>,
    auth_time: Option<OffsetDateTime>,
    redirect_uri: Option<String>,
    audience: Vec<String>,
    scope: Scope,
    nonce: Option<String>,
    consent: ConsentClaims,
    delivery: DeliveryClaims,
}

impl ClaimsBuilder {
    pub fn new(
        client_id: impl Into<ClientId>,
        issuer: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            lineage_id: None,
            client_id: client_id.into(),
            issuer: issuer.into(),
            user_principal: None,
            subject: subject.into(),
            acr: None,
            issued_at: None,
            lifetime: None,
            expires_at: None,
            auth_time: None,
            redirect_uri: None,
            audience: Vec::new(),
            scope: Scope::new(),
            nonce: None,
            consent: ConsentClaims::default(),
            delivery: DeliveryClaims::default(),
        }
    }

    /// Sets the token id.
    #[must_use]
    pub fn id(mut self, id: TokenId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the lineage id.
    #[must_use]
    pub fn lineage_id(mut self, lineage_id: TokenId) -> Self {
        self.lineage_id = Some(lineage_id);
        self
    }

    /// Sets the internal principal name.
    #[must_use]
    pub fn user_principal(mut self, principal: impl Into<String>) -> Self {
        self.user_principal = Some(principal.into());
        self
    }

    #[must_use]
    pub fn acr(mut self, acr: impl Into<String>) -> Self {
        self.acr = Some(acr.into());
        self
    }

    #[must_use]
    pub fn issued_at(mut self, issued_at: OffsetDateTime) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Sets the lifetime, counted from `issued_at`. Ignored when
    /// `expires_at` is set.
    #[must_use]
    pub fn lifetime(mut self, lifetime: StdDuration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    #[must_use]
    pub fn expires_at(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn auth_time(mut self, auth_time: OffsetDateTime) -> Self {
        self.auth_time = Some(auth_time);
        self
    }

    #[must_use]
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    #[must_use]
    pub fn audience(mut self, audience: Vec<String>) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    #[must_use]
    pub fn consent(mut self, consent: ConsentClaims) -> Self {
        self.consent = consent;
        self
    }

    #[must_use]
    pub fn delivery(mut self, delivery: DeliveryClaims) -> Self {
        self.delivery = delivery;
        self
    }

    /// Builds the claims set.
    ///
    /// # Errors
    ///
    /// Returns `ClaimsError::MissingField` if the client id, issuer or
    /// subject is empty, and `ClaimsError::InvalidLifetime` unless the
    /// expiry falls at least one whole second after `issued_at`.
    pub fn build(self) -> Result<CommonClaims, ClaimsError> {
        if self.client_id.as_str().is_empty() {
            return Err(ClaimsError::MissingField("client_id"));
        }
        if self.issuer.is_empty() {
            return Err(ClaimsError::MissingField("issuer"));
        }
        if self.subject.is_empty() {
            return Err(ClaimsError::MissingField("subject"));
        }

        let issued_at = whole_seconds(self.issued_at.unwrap_or_else(OffsetDateTime::now_utc));
        let expires_at = match self.expires_at {
            Some(expires_at) => whole_seconds(expires_at),
            None => {
                let lifetime = Duration::try_from(self.lifetime.unwrap_or(DEFAULT_LIFETIME))
                    .map_err(|_| ClaimsError::InvalidLifetime)?;
                issued_at
                    .checked_add(lifetime)
                    .map(whole_seconds)
                    .ok_or(ClaimsError::InvalidLifetime)?
            }
        };

        if expires_at <= issued_at {
            return Err(ClaimsError::InvalidLifetime);
        }

        let id = self.id.unwrap_or_else(TokenId::generate);
        let lineage_id = self.lineage_id.unwrap_or_else(|| id.clone());
        let user_principal = self
            .user_principal
            .unwrap_or_else(|| self.subject.clone());

        Ok(CommonClaims {
            id,
            lineage_id,
            client_id: self.client_id,
            issuer: self.issuer,
            user_principal,
            subject: self.subject,
            acr: self.acr,
            issued_at,
            expires_at,
            auth_time: self.auth_time.map_or(issued_at, whole_seconds),
            redirect_uri: self.redirect_uri,
            audience: self.audience,
            scope: self.scope,
            nonce: self.nonce,
            consent: self.consent,
            delivery: self.delivery,
        })
    }
}

/// `now + lifetime`, saturating at the largest representable instant.
pub(crate) fn instant_after(now: OffsetDateTime, lifetime: StdDuration) -> OffsetDateTime {
    Duration::try_from(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add(lifetime))
        .unwrap_or(time::PrimitiveDateTime::MAX.assume_utc())
}

/// Drops sub-second precision so instants survive the epoch-seconds
/// encoding unchanged.
fn whole_seconds(instant: OffsetDateTime) -> OffsetDateTime {
    let instant = instant.to_offset(UtcOffset::UTC);
    instant - Duration::nanoseconds(i64::from(instant.nanosecond()))
}
