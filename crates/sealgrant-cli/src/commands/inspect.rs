use anyhow::{Result, bail};
use colored::Colorize;
use time::OffsetDateTime;

use sealgrant_auth::seal::SealingError;
use sealgrant_auth::token::CodecError;
use sealgrant_auth::{TokenClaims, TokenCodec, TokenType};

use crate::cli::{InspectArgs, TokenKind};
use crate::output::{print_field, print_json, print_warning};

pub fn run(codec: &TokenCodec, args: &InspectArgs) -> Result<()> {
    let claims = inspect(codec, &args.token, args.kind)?;
    let common = claims.common();

    print_field("Type", claims.token_type().to_string().bold());
    print_field(
        "Expires in",
        format!("{}s", common.expires_in(OffsetDateTime::now_utc())),
    );
    print_json(&claims.to_json())
}

/// Unseals `token`, either as the given kind or as whichever kind it is.
pub fn inspect(codec: &TokenCodec, token: &str, kind: Option<TokenKind>) -> Result<TokenClaims> {
    let candidates = match kind {
        Some(kind) => vec![token_type(kind)],
        None => vec![
            TokenType::AuthorizationCode,
            TokenType::AccessToken,
            TokenType::RefreshToken,
        ],
    };

    let mut last = None;
    for expected in candidates {
        match codec.parse(token, expected) {
            Ok(claims) => return Ok(claims),
            Err(e) if e.is_type_mismatch() => {
                tracing::debug!(error = %e, "Trying next token type");
                last = Some(e);
            }
            Err(CodecError::Sealing(SealingError::Expired)) => {
                print_warning("The token is sealed correctly but has expired");
                bail!("token expired");
            }
            Err(e) => bail!("Cannot read token: {e}"),
        }
    }

    match last {
        Some(e) => bail!("Cannot read token: {e}"),
        None => bail!("Cannot read token"),
    }
}

fn token_type(kind: TokenKind) -> TokenType {
    match kind {
        TokenKind::Code => TokenType::AuthorizationCode,
        TokenKind::Access => TokenType::AccessToken,
        TokenKind::Refresh => TokenType::RefreshToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealgrant_auth::{AesGcmSealer, CommonClaims, RefreshTokenClaims, SealerKey};
    use std::sync::Arc;

    fn codec() -> TokenCodec {
        let sealer = AesGcmSealer::new("cli", &SealerKey::generate()).unwrap();
        TokenCodec::new(Arc::new(sealer))
    }

    fn refresh_token(codec: &TokenCodec) -> String {
        let common = CommonClaims::builder("s6BhdRkqt3", "https://idp.example.org", "alice")
            .build()
            .unwrap();
        codec
            .issue(&RefreshTokenClaims::new(common).into())
            .unwrap()
    }

    #[test]
    fn test_detects_the_token_type() {
        let codec = codec();
        let token = refresh_token(&codec);
        let claims = inspect(&codec, &token, None).unwrap();
        assert_eq!(claims.token_type(), TokenType::RefreshToken);
    }

    #[test]
    fn test_explicit_type_must_match() {
        let codec = codec();
        let token = refresh_token(&codec);
        assert!(inspect(&codec, &token, Some(TokenKind::Refresh)).is_ok());
        assert!(inspect(&codec, &token, Some(TokenKind::Access)).is_err());
    }

    #[test]
    fn test_foreign_tokens_are_unreadable() {
        let token = refresh_token(&codec());
        let err = inspect(&codec(), &token, None).unwrap_err();
        assert!(err.to_string().starts_with("Cannot read token"));
    }
}
