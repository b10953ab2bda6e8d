//! Canonical byte encoding of claims sets.
//!
//! JSON with short, fixed-order keys. Instants are unix seconds. Optional and
//! empty values are omitted. The `typ` discriminator is checked before any
//! other field is looked at.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use super::{
    AccessTokenClaims, AuthorizeCodeClaims, ClaimsBuilder, ClaimsError, CommonClaims,
    ConsentClaims, DeliveryClaims, RefreshTokenClaims, TokenClaims,
};
use crate::token::codec::ParseError;
use crate::types::{Scope, TokenId, TokenType};

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireClaims {
    typ: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    acr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ath: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rdu: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aud: Vec<String>,
    #[serde(default, skip_serializing_if = "Scope::is_empty")]
    scp: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nnc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cch: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    csd: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    dlv: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    dli: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    dlu: Map<String, Value>,
}

/// Only the discriminator, read ahead of the full document.
#[derive(Deserialize)]
struct Discriminator {
    typ: Option<String>,
}

/// Encodes a claims set.
pub(crate) fn encode(claims: &TokenClaims) -> Result<Vec<u8>, serde_json::Error> {
    let c = claims.common();
    let wire = WireClaims {
        typ: claims.token_type().as_str().to_string(),
        jti: Some(c.id().as_str().to_string()),
        lin: Some(c.lineage_id().as_str().to_string()),
        cid: Some(c.client_id().as_str().to_string()),
        iss: Some(c.issuer().to_string()),
        usr: Some(c.user_principal().to_string()),
        sub: Some(c.subject().to_string()),
        acr: c.acr().map(str::to_string),
        iat: Some(c.issued_at().unix_timestamp()),
        exp: Some(c.expires_at().unix_timestamp()),
        ath: Some(c.auth_time().unix_timestamp()),
        rdu: c.redirect_uri().map(str::to_string),
        aud: c.audience().to_vec(),
        scp: c.scope().clone(),
        nnc: c.nonce().map(str::to_string),
        cch: claims
            .as_authorize_code()
            .and_then(|code| code.code_challenge().map(str::to_string)),
        cns: c.consent().consentable.clone(),
        csd: c.consent().consented.clone(),
        dlv: c.delivery().general.clone(),
        dli: c.delivery().id_token.clone(),
        dlu: c.delivery().userinfo.clone(),
    };
    serde_json::to_vec(&wire)
}

/// Decodes a claims set, requiring it to be of type `expected`.
pub(crate) fn decode(bytes: &[u8], expected: TokenType) -> Result<TokenClaims, ParseError> {
    let discriminator: Discriminator =
        serde_json::from_slice(bytes).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let typ = discriminator.typ.ok_or(ParseError::MissingField("typ"))?;
    let found = TokenType::parse(&typ)
        .ok_or_else(|| ParseError::Malformed(format!("unknown token type: {typ}")))?;
    if found != expected {
        return Err(ParseError::TypeMismatch { expected, found });
    }

    let wire: WireClaims =
        serde_json::from_slice(bytes).map_err(|e| ParseError::Malformed(e.to_string()))?;
    let code_challenge = wire.cch.clone();
    let common = decode_common(wire)?;

    Ok(match found {
        TokenType::AuthorizationCode => AuthorizeCodeClaims::new(common, code_challenge).into(),
        TokenType::AccessToken => AccessTokenClaims::new(common).into(),
        TokenType::RefreshToken => RefreshTokenClaims::new(common).into(),
    })
}

fn decode_common(wire: WireClaims) -> Result<CommonClaims, ParseError> {
    let id = required(wire.jti, "jti")?;
    let lineage = required(wire.lin, "lin")?;
    let client_id = required(wire.cid, "cid")?;
    let issuer = required(wire.iss, "iss")?;
    let principal = required(wire.usr, "usr")?;
    let subject = required(wire.sub, "sub")?;
    let issued_at = instant(required(wire.iat, "iat")?)?;
    let expires_at = instant(required(wire.exp, "exp")?)?;
    let auth_time = instant(required(wire.ath, "ath")?)?;

    let mut builder = ClaimsBuilder::new(client_id, issuer, subject)
        .id(TokenId::new(id))
        .lineage_id(TokenId::new(lineage))
        .user_principal(principal)
        .issued_at(issued_at)
        .expires_at(expires_at)
        .auth_time(auth_time)
        .audience(wire.aud)
        .scope(wire.scp)
        .consent(ConsentClaims::new(wire.cns, wire.csd))
        .delivery(DeliveryClaims::new(wire.dlv, wire.dli, wire.dlu));

    if let Some(acr) = wire.acr {
        builder = builder.acr(acr);
    }
    if let Some(redirect_uri) = wire.rdu {
        builder = builder.redirect_uri(redirect_uri);
    }
    if let Some(nonce) = wire.nnc {
        builder = builder.nonce(nonce);
    }

    builder.build().map_err(|e| match e {
        ClaimsError::MissingField(field) => ParseError::MissingField(field),
        ClaimsError::InvalidLifetime => ParseError::Malformed(e.to_string()),
    })
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ParseError> {
    value.ok_or(ParseError::MissingField(field))
}

fn instant(seconds: i64) -> Result<OffsetDateTime, ParseError> {
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|e| ParseError::Malformed(format!("invalid timestamp: {e}")))
}
