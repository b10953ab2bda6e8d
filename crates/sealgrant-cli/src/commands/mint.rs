use std::fs;

use anyhow::{Context, Result};

use sealgrant_auth::oauth::CodeChallenge;
use sealgrant_auth::{AuthorizeCodeClaims, CommonClaims, GrantsConfig, Scope, TokenCodec};

use crate::cli::MintCodeArgs;
use crate::output::print_success;

pub fn run(codec: &TokenCodec, args: &MintCodeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            let input = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            GrantsConfig::from_toml_str(&input)?
        }
        None => GrantsConfig::default(),
    };

    let code = mint_code(codec, &config, args)?;
    println!("{code}");
    print_success(&format!(
        "Authorization code for {} valid for {}s",
        args.client_id,
        config.lifetimes.authorization_code.as_secs()
    ));
    Ok(())
}

pub fn mint_code(codec: &TokenCodec, config: &GrantsConfig, args: &MintCodeArgs) -> Result<String> {
    let challenge = args
        .code_challenge
        .as_deref()
        .map(|challenge| {
            CodeChallenge::from_request(challenge, args.code_challenge_method.as_deref())
        })
        .transpose()?
        .map(|challenge| challenge.to_stored());

    let mut builder = CommonClaims::builder(
        args.client_id.as_str(),
        config.issuer.as_str(),
        args.subject.as_str(),
    )
    .scope(Scope::from_delimited(&args.scope))
    .lifetime(config.lifetimes.authorization_code);
    if let Some(redirect_uri) = &args.redirect_uri {
        builder = builder.redirect_uri(redirect_uri.as_str());
    }

    let claims = AuthorizeCodeClaims::new(builder.build()?, challenge);
    Ok(codec.issue(&claims.into())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealgrant_auth::{AesGcmSealer, SealerKey};
    use std::sync::Arc;

    fn args() -> MintCodeArgs {
        MintCodeArgs {
            client_id: "s6BhdRkqt3".into(),
            subject: "248289761001".into(),
            scope: "openid profile".into(),
            redirect_uri: Some("https://client.example.org/cb".into()),
            code_challenge: Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".into()),
            code_challenge_method: Some("S256".into()),
            config: None,
        }
    }

    #[test]
    fn test_minted_code_carries_the_request() {
        let sealer = AesGcmSealer::new("cli", &SealerKey::generate()).unwrap();
        let codec = TokenCodec::new(Arc::new(sealer));

        let token = mint_code(&codec, &GrantsConfig::default(), &args()).unwrap();
        let code = codec.parse_authorize_code(&token).unwrap();

        assert_eq!(code.common().client_id().as_str(), "s6BhdRkqt3");
        assert_eq!(code.common().scope().as_joined(), "openid profile");
        assert_eq!(
            code.common().redirect_uri(),
            Some("https://client.example.org/cb")
        );
        assert_eq!(
            code.code_challenge(),
            Some("S256E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM")
        );
        let lifetime = code.common().expires_at() - code.common().issued_at();
        assert_eq!(lifetime.whole_seconds(), 300);
    }

    #[test]
    fn test_unknown_challenge_method_is_refused() {
        let sealer = AesGcmSealer::new("cli", &SealerKey::generate()).unwrap();
        let codec = TokenCodec::new(Arc::new(sealer));

        let mut args = args();
        args.code_challenge_method = Some("S512".into());
        assert!(mint_code(&codec, &GrantsConfig::default(), &args).is_err());
    }
}
