//! Validation of inbound grants and bearer tokens.
//!
//! - [`grant`] - authorization code and refresh token validation
//! - [`pkce`] - PKCE challenge/verifier checks on code redemption
//! - [`access`] - bearer access token validation
//!
//! # Example
//!
//! ```ignore
//! use sealgrant_auth::oauth::{GrantValidator, PkceValidator};
//! use sealgrant_auth::types::GrantKind;
//!
//! let grant = grant_validator
//!     .validate(&code, GrantKind::AuthorizationCode, &client_id)
//!     .await?;
//! pkce_validator.validate(&grant, code_verifier.as_deref())?;
//! ```

pub mod access;
pub mod grant;
pub mod pkce;

pub use access::AccessTokenValidator;
pub use grant::{GrantValidator, ValidatedGrant};
pub use pkce::{CodeChallenge, CodeChallengeMethod, PkceError, PkceValidator, generate_verifier};
