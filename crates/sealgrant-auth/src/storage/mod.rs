//! Cache interfaces consumed by the validators.
//!
//! This module defines the two pieces of server-side state the otherwise
//! stateless grant pipeline needs:
//!
//! - [`ReplayCache`] - single-use enforcement for authorization codes
//! - [`RevocationCache`] - lasting revocation of grant lineages
//!
//! Both may be backed by network storage. In-memory implementations are
//! provided for single-process deployments and tests.

pub mod memory;
pub mod replay;
pub mod revocation;

pub use memory::{InMemoryReplayCache, InMemoryRevocationCache};
pub use replay::ReplayCache;
pub use revocation::RevocationCache;
