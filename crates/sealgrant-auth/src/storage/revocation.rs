//! Revocation cache trait for grant lineages.
//!
//! Revocation is keyed by lineage id, so revoking a grant family rejects the
//! code, every access token and every refresh token derived from it.
//!
//! # Security Considerations
//!
//! - Reads must reflect every revocation issued before the call
//! - A record must be kept until `until` has passed; afterwards it may be
//!   dropped, since no token of the lineage outlives it

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::GrantResult;

/// Lineage revocation records.
///
/// # Implementations
///
/// - [`InMemoryRevocationCache`](super::InMemoryRevocationCache) -
///   process-local, backed by `DashMap`
#[async_trait]
pub trait RevocationCache: Send + Sync {
    /// Returns `true` if `id` is revoked and the record has not expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_revoked(&self, id: &str) -> GrantResult<bool>;

    /// Revokes `id` until `until`.
    ///
    /// # Idempotency
    ///
    /// Revoking an already-revoked id succeeds and keeps the later of the
    /// two `until` instants.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, id: &str, until: OffsetDateTime) -> GrantResult<()>;
}
