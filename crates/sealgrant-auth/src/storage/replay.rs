//! Replay cache trait for single-use authorization codes.
//!
//! # Security Considerations
//!
//! - Check-and-mark must be atomic: when the same code is redeemed
//!   concurrently, exactly one caller may see `true`
//! - Entries must live at least until the code itself expires
//! - Validators never cache the answer; the cache is the sole arbiter

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::GrantResult;

/// Single-use enforcement for sealed grant ids.
///
/// # Implementations
///
/// - [`InMemoryReplayCache`](super::InMemoryReplayCache) - process-local,
///   backed by `DashMap`
///
/// A shared deployment needs a backend with an atomic conditional insert,
/// for example:
///
/// ```sql
/// INSERT INTO seen_codes (id, valid_until)
/// VALUES ($1, $2)
/// ON CONFLICT (id) DO NOTHING
/// RETURNING id
/// ```
#[async_trait]
pub trait ReplayCache: Send + Sync {
    /// Atomically checks whether `id` has been presented before and marks it
    /// as seen.
    ///
    /// # Arguments
    ///
    /// * `id` - The token id (for codes, the code's own id)
    /// * `valid_until` - How long the mark must be remembered
    ///
    /// # Returns
    ///
    /// `true` the first time `id` is presented before `valid_until`, and
    /// `false` on every later presentation (replay detected).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn check_replay(&self, id: &str, valid_until: OffsetDateTime) -> GrantResult<bool>;
}
