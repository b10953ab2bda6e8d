//! Sealed token issuance and grant orchestration.
//!
//! - [`codec`] - typed claims to and from sealed strings
//! - [`service`] - code exchange, refresh, validation and revocation

pub mod codec;
pub mod service;

pub use codec::{CodecError, ParseError, TokenCodec};
pub use service::{BEARER, CodeExchange, GrantService, RefreshExchange, TokenSet};
