//! In-memory replay and revocation caches.
//!
//! Suitable for single-process deployments and tests. Entries are keyed by id
//! with the instant after which they may be forgotten; call
//! `cleanup_expired` periodically to bound memory.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use super::{ReplayCache, RevocationCache};
use crate::GrantResult;

// =============================================================================
// Replay Cache
// =============================================================================

/// Replay cache backed by a concurrent map.
///
/// Check-and-mark runs under the shard lock of the entry API, so concurrent
/// redemptions of one id see exactly one `true`.
#[derive(Debug, Default)]
pub struct InMemoryReplayCache {
    seen: DashMap<String, OffsetDateTime>,
}

impl InMemoryReplayCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// [`ReplayCache::check_replay`] evaluated at `now`.
    pub fn check_replay_at(
        &self,
        id: &str,
        valid_until: OffsetDateTime,
        now: OffsetDateTime,
    ) -> bool {
        match self.seen.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return false;
                }
                // The previous mark lapsed; this is a fresh presentation.
                entry.insert(valid_until);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(valid_until);
                true
            }
        }
    }

    /// Removes entries whose validity has passed, returning how many.
    pub fn cleanup_expired(&self) -> usize {
        cleanup(&self.seen, OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[async_trait]
impl ReplayCache for InMemoryReplayCache {
    async fn check_replay(&self, id: &str, valid_until: OffsetDateTime) -> GrantResult<bool> {
        Ok(self.check_replay_at(id, valid_until, OffsetDateTime::now_utc()))
    }
}

// =============================================================================
// Revocation Cache
// =============================================================================

/// Revocation cache backed by a concurrent map.
#[derive(Debug, Default)]
pub struct InMemoryRevocationCache {
    revoked: DashMap<String, OffsetDateTime>,
}

impl InMemoryRevocationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// [`RevocationCache::is_revoked`] evaluated at `now`.
    #[must_use]
    pub fn is_revoked_at(&self, id: &str, now: OffsetDateTime) -> bool {
        self.revoked.get(id).is_some_and(|until| *until > now)
    }

    /// Records a revocation, keeping the later `until` if one exists.
    pub fn revoke_until(&self, id: &str, until: OffsetDateTime) {
        self.revoked
            .entry(id.to_string())
            .and_modify(|existing| {
                if until > *existing {
                    *existing = until;
                }
            })
            .or_insert(until);
    }

    /// Removes records that no longer apply, returning how many.
    pub fn cleanup_expired(&self) -> usize {
        cleanup(&self.revoked, OffsetDateTime::now_utc())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

#[async_trait]
impl RevocationCache for InMemoryRevocationCache {
    async fn is_revoked(&self, id: &str) -> GrantResult<bool> {
        Ok(self.is_revoked_at(id, OffsetDateTime::now_utc()))
    }

    async fn revoke(&self, id: &str, until: OffsetDateTime) -> GrantResult<()> {
        self.revoke_until(id, until);
        Ok(())
    }
}

fn cleanup(map: &DashMap<String, OffsetDateTime>, now: OffsetDateTime) -> usize {
    let before = map.len();
    map.retain(|_, until| *until > now);
    before.saturating_sub(map.len())
}
