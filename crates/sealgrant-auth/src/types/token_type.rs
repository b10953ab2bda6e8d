//! Token type discriminator and grant kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of token a claims set describes.
///
/// This is the discriminator sealed into every token. The codec refuses to
/// decode a token as any type other than the one it was issued as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Single-use authorization code.
    AuthorizationCode,
    /// Bearer access token.
    AccessToken,
    /// Refresh token for offline access.
    RefreshToken,
}

impl TokenType {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses the wire representation, returning `None` for unknown values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grant kinds that redeem a sealed grant token at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// `grant_type=authorization_code`
    AuthorizationCode,
    /// `grant_type=refresh_token`
    RefreshToken,
}

impl GrantKind {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// The token type a grant of this kind must present.
    #[must_use]
    pub fn expected_token_type(&self) -> TokenType {
        match self {
            Self::AuthorizationCode => TokenType::AuthorizationCode,
            Self::RefreshToken => TokenType::RefreshToken,
        }
    }
}

impl fmt::Display for GrantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a `grant_type` value is not a sealed-grant kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported grant type: {0}")]
pub struct UnsupportedGrantKind(pub String);

impl FromStr for GrantKind {
    type Err = UnsupportedGrantKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(UnsupportedGrantKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_as_str_parse() {
        for t in [
            TokenType::AuthorizationCode,
            TokenType::AccessToken,
            TokenType::RefreshToken,
        ] {
            assert_eq!(TokenType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TokenType::parse("id_token"), None);
    }

    #[test]
    fn test_grant_kind_from_str() {
        assert_eq!(
            "authorization_code".parse::<GrantKind>().unwrap(),
            GrantKind::AuthorizationCode
        );
        assert_eq!(
            "refresh_token".parse::<GrantKind>().unwrap(),
            GrantKind::RefreshToken
        );

        let err = "client_credentials".parse::<GrantKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported grant type: client_credentials");
    }

    #[test]
    fn test_grant_kind_expected_token_type() {
        assert_eq!(
            GrantKind::AuthorizationCode.expected_token_type(),
            TokenType::AuthorizationCode
        );
        assert_eq!(
            GrantKind::RefreshToken.expected_token_type(),
            TokenType::RefreshToken
        );
    }
}
