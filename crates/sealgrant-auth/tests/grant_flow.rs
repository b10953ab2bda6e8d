use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use sealgrant_auth::claims::{
    AccessTokenClaims, AuthorizeCodeClaims, CommonClaims, ConsentClaims, DeliveryClaims,
    RefreshTokenClaims, TokenClaims,
};
use sealgrant_auth::oauth::{CodeChallenge, PkceValidator, generate_verifier};
use sealgrant_auth::token::{CodecError, ParseError};
use sealgrant_auth::{
    AesGcmSealer, GrantError, GrantKind, GrantService, GrantValidator, GrantsConfig,
    InMemoryReplayCache, InMemoryRevocationCache, InvalidGrantReason, RefreshExchange, Scope,
    SealerKey, TokenCodec, TokenType,
};

const CLIENT: &str = "s6BhdRkqt3";
const ISSUER: &str = "https://idp.example.org";
const REDIRECT: &str = "https://client.example.org/cb";

fn codec() -> TokenCodec {
    let sealer = AesGcmSealer::new("2026-10", &SealerKey::generate()).expect("sealer");
    TokenCodec::new(Arc::new(sealer))
}

fn common(scope: &str) -> CommonClaims {
    let mut delivery = serde_json::Map::new();
    delivery.insert("email".into(), serde_json::json!("janedoe@example.com"));

    CommonClaims::builder(CLIENT, ISSUER, "248289761001")
        .user_principal("janedoe")
        .acr("urn:mace:incommon:iap:silver")
        .redirect_uri(REDIRECT)
        .audience(vec![CLIENT.to_string()])
        .scope(Scope::from_delimited(scope))
        .nonce("n-0S6_WzA2Mj")
        .consent(ConsentClaims::new(
            vec!["email".into(), "name".into()],
            vec!["email".into()],
        ))
        .delivery(DeliveryClaims::new(
            delivery,
            serde_json::Map::new(),
            serde_json::Map::new(),
        ))
        .lifetime(Duration::from_secs(300))
        .build()
        .expect("claims")
}

fn all_kinds() -> Vec<TokenClaims> {
    let verifier = generate_verifier();
    vec![
        AuthorizeCodeClaims::new(
            common("openid profile"),
            Some(CodeChallenge::s256(&verifier).to_stored()),
        )
        .into(),
        AccessTokenClaims::new(common("openid profile")).into(),
        RefreshTokenClaims::new(common("openid offline_access")).into(),
    ]
}

fn service_with(config: GrantsConfig) -> (GrantService, TokenCodec) {
    let codec = codec();
    let service = GrantService::new(
        codec.clone(),
        Arc::new(InMemoryReplayCache::new()),
        Arc::new(InMemoryRevocationCache::new()),
        config,
    );
    (service, codec)
}

#[test]
fn sealed_tokens_round_trip_field_for_field() {
    let codec = codec();
    for claims in all_kinds() {
        let token = codec.issue(&claims).expect("issue");
        let parsed = codec.parse(&token, claims.token_type()).expect("parse");
        assert_eq!(parsed, claims);
    }
}

#[test]
fn scopes_built_from_raw_values_survive_sealing() {
    let codec = codec();
    let scope: Scope = ["", "openid", "read write"].into_iter().collect();
    assert_eq!(scope, Scope::from_delimited("openid read write"));

    let common = CommonClaims::builder(CLIENT, ISSUER, "248289761001")
        .scope(scope.clone())
        .build()
        .expect("claims");
    let claims: TokenClaims = AccessTokenClaims::new(common).into();
    let token = codec.issue(&claims).expect("issue");
    let parsed = codec.parse_access_token(&token).expect("parse");

    assert_eq!(parsed.common().scope(), &scope);
    assert_eq!(TokenClaims::from(parsed), claims);
}

#[test]
fn every_other_token_type_is_refused() {
    let codec = codec();
    let types = [
        TokenType::AuthorizationCode,
        TokenType::AccessToken,
        TokenType::RefreshToken,
    ];

    for claims in all_kinds() {
        let token = codec.issue(&claims).expect("issue");
        for expected in types.into_iter().filter(|t| *t != claims.token_type()) {
            let err = codec.parse(&token, expected).unwrap_err();
            assert_eq!(
                err,
                CodecError::Parse(ParseError::TypeMismatch {
                    expected,
                    found: claims.token_type(),
                })
            );
        }
    }
}

#[tokio::test]
async fn past_expiry_always_fails_validation() {
    let codec = codec();
    let validator = GrantValidator::new(
        codec.clone(),
        Arc::new(InMemoryReplayCache::new()),
        Arc::new(InMemoryRevocationCache::new()),
    );

    let issued_at = OffsetDateTime::now_utc() - time::Duration::hours(1);
    let claims = CommonClaims::builder(CLIENT, ISSUER, "248289761001")
        .issued_at(issued_at)
        .lifetime(Duration::from_secs(60))
        .build()
        .expect("claims");

    let code = codec
        .issue(&AuthorizeCodeClaims::new(claims.clone(), None).into())
        .expect("issue");
    let refresh = codec
        .issue(&RefreshTokenClaims::new(claims).into())
        .expect("issue");

    for (token, kind) in [
        (code, GrantKind::AuthorizationCode),
        (refresh, GrantKind::RefreshToken),
    ] {
        let err = validator.validate(&token, kind, CLIENT).await.unwrap_err();
        assert_eq!(err.reason(), Some(InvalidGrantReason::Expired));
    }
}

#[test]
fn pkce_s256_and_plain_gating() {
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    let challenge = CodeChallenge::s256(verifier);
    assert_eq!(
        challenge.to_stored(),
        "S256E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
    );

    let strict = PkceValidator::default();
    let stored = challenge.to_stored();
    assert!(strict.verify_challenge(Some(&stored), Some(verifier)).is_ok());
    let err: GrantError = strict
        .verify_challenge(Some(&stored), Some("something-else"))
        .unwrap_err()
        .into();
    assert!(matches!(err, GrantError::MessageAuthentication));

    let plain = "plainthe-verifier-value";
    let err: GrantError = strict
        .verify_challenge(Some(plain), Some("the-verifier-value"))
        .unwrap_err()
        .into();
    assert!(matches!(err, GrantError::InvalidMessage { .. }));

    let lenient = PkceValidator::new(sealgrant_auth::config::PkceConfig {
        force: false,
        allow_plain: true,
    });
    assert!(
        lenient
            .verify_challenge(Some(plain), Some("the-verifier-value"))
            .is_ok()
    );
}

#[tokio::test]
async fn narrowing_refresh_scope_drops_consent_and_delivery() {
    let mut config = GrantsConfig::default();
    config.refresh.require_offline_access = false;
    let (service, codec) = service_with(config);

    let refresh = codec
        .issue(&RefreshTokenClaims::new(common("1 2 3")).into())
        .expect("issue");

    let narrowed = service
        .refresh(&RefreshExchange {
            refresh_token: refresh.clone(),
            client_id: CLIENT.into(),
            scope: Some(Scope::from_delimited("2 4")),
        })
        .await
        .expect("refresh");
    let claims = narrowed.claims.common();
    assert_eq!(claims.scope().as_joined(), "2");
    assert!(claims.consent().is_empty());
    assert!(claims.delivery().is_empty());

    for requested in ["1 2 3", "1 2 3 4"] {
        let kept = service
            .refresh(&RefreshExchange {
                refresh_token: refresh.clone(),
                client_id: CLIENT.into(),
                scope: Some(Scope::from_delimited(requested)),
            })
            .await
            .expect("refresh");
        let claims = kept.claims.common();
        assert_eq!(claims.scope().as_joined(), "1 2 3");
        assert!(!claims.consent().is_empty());
        assert!(!claims.delivery().is_empty());
    }
}

#[tokio::test]
async fn revocation_sticks_across_the_lineage() {
    let mut config = GrantsConfig::default();
    config.refresh.require_offline_access = false;
    let (service, codec) = service_with(config);

    let code = service
        .issue_authorization_code(AuthorizeCodeClaims::new(common("openid"), None))
        .expect("issue");
    let tokens = service
        .exchange_code(&sealgrant_auth::CodeExchange {
            code,
            client_id: CLIENT.into(),
            redirect_uri: Some(REDIRECT.into()),
            code_verifier: None,
        })
        .await
        .expect("exchange");
    let refresh = tokens.refresh_token.expect("refresh token");

    service.revoke(&tokens.access_token, CLIENT).await.expect("revoke");

    let request = RefreshExchange {
        refresh_token: refresh,
        client_id: CLIENT.into(),
        scope: None,
    };
    for _ in 0..3 {
        let err = service
            .validate_access_token(&tokens.access_token)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(InvalidGrantReason::Revoked));

        let err = service.refresh(&request).await.unwrap_err();
        assert_eq!(err.reason(), Some(InvalidGrantReason::Revoked));
    }

    // Tokens from a different code are unaffected
    let unrelated = codec
        .issue(&AccessTokenClaims::new(common("openid")).into())
        .expect("issue");
    assert!(service.validate_access_token(&unrelated).await.is_ok());
}

#[tokio::test]
async fn authorization_code_flow_end_to_end() {
    let mut config = GrantsConfig::default();
    config.refresh.require_offline_access = false;
    let (service, _) = service_with(config);

    let claims = CommonClaims::builder(CLIENT, ISSUER, "248289761001")
        .scope(Scope::from_delimited("openid profile"))
        .redirect_uri(REDIRECT)
        .build()
        .expect("claims");
    let code = service
        .issue_authorization_code(AuthorizeCodeClaims::new(claims, None))
        .expect("issue");

    let request = sealgrant_auth::CodeExchange {
        code,
        client_id: CLIENT.into(),
        redirect_uri: Some(REDIRECT.into()),
        code_verifier: None,
    };

    let tokens = service.exchange_code(&request).await.expect("first redemption");
    assert!(tokens.refresh_token.is_some());
    assert_eq!(tokens.scope.as_joined(), "openid profile");

    let err = service.exchange_code(&request).await.unwrap_err();
    assert!(err.is_invalid_grant());
    assert_eq!(err.oauth_error_code(), "invalid_grant");

    let access = service
        .validate_access_token(&tokens.access_token)
        .await
        .expect("access token");
    assert_eq!(access.common().client_id().as_str(), CLIENT);

    let after_expiry = access.common().expires_at() + time::Duration::seconds(1);
    let err = service
        .validate_access_token_at(&tokens.access_token, after_expiry)
        .await
        .unwrap_err();
    assert_eq!(err.reason(), Some(InvalidGrantReason::Expired));
}
