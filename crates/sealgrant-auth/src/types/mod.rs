//! Common types used across the sealing, claims, and validation modules.
//!
//! ## Domain Types
//!
//! - [`ClientId`] - OAuth 2.0 client identifier
//! - [`TokenId`] - Token and lineage identifier
//! - [`TokenType`] - Sealed discriminator for codes, access and refresh tokens
//! - [`GrantKind`] - Token endpoint grant kinds that present a sealed grant
//! - [`Scope`] - Ordered scope set

pub mod ids;
pub mod scope;
pub mod token_type;

pub use ids::{ClientId, TokenId};
pub use scope::{OFFLINE_ACCESS, OPENID, Scope};
pub use token_type::{GrantKind, TokenType, UnsupportedGrantKind};
