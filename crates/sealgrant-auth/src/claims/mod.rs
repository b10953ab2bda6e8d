//! Token claims model.
//!
//! Every token carries a [`CommonClaims`] value wrapped in a type-specific
//! set: [`AuthorizeCodeClaims`], [`AccessTokenClaims`] or
//! [`RefreshTokenClaims`]. [`TokenClaims`] is the closed sum of the three
//! and is what the codec seals and unseals.
//!
//! Claims sets are immutable. Deriving the next token in a grant lineage
//! (code to access token, refresh token to access token) builds a new value
//! with a fresh id and the same lineage id.
//!
//! # Example
//!
//! ```
//! use sealgrant_auth::claims::{AccessTokenClaims, AuthorizeCodeClaims, CommonClaims};
//! use sealgrant_auth::types::Scope;
//! use std::time::Duration;
//! use time::OffsetDateTime;
//!
//! let common = CommonClaims::builder("s6BhdRkqt3", "https://idp.example.org", "alice")
//!     .scope(Scope::from_delimited("openid profile"))
//!     .redirect_uri("https://client.example.org/cb")
//!     .build()
//!     .unwrap();
//! let code = AuthorizeCodeClaims::new(common, None);
//!
//! let now = OffsetDateTime::now_utc();
//! let access = AccessTokenClaims::derive_from_code(&code, Duration::from_secs(600), now).unwrap();
//! assert_eq!(access.common().lineage_id(), code.common().id());
//! ```

pub mod common;
pub mod consent;
pub mod sets;
pub(crate) mod wire;

pub use common::{ClaimsBuilder, CommonClaims};
pub use consent::{ConsentClaims, DeliveryClaims};
pub use sets::{AccessTokenClaims, AuthorizeCodeClaims, RefreshTokenClaims, TokenClaims};

/// Errors raised while constructing a claims set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsError {
    /// A required field is empty.
    #[error("Missing required claim: {0}")]
    MissingField(&'static str),

    /// The expiry does not fall after the issuance instant.
    #[error("Claims must expire at least one second after issuance")]
    InvalidLifetime,
}
