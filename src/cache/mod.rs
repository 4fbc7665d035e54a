//! Location cache keyed by raw client IP string
//!
//! Entries expire after a period without access (sliding TTL). Negative
//! results are cached as `None` so unresolvable clients do not trigger a
//! shard walk on every event.

use moka::future::Cache;
use std::time::Duration;

use crate::geo::Location;

/// Default sliding expiration (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default upper bound on cached clients
pub const DEFAULT_MAX_ENTRIES: u64 = 100_000;

/// Concurrent cache of resolved client locations
#[derive(Clone)]
pub struct LocationCache {
    entries: Cache<String, Option<Location>>,
}

impl LocationCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_idle(ttl)
            .build();

        Self { entries }
    }

    /// Look up a client.
    ///
    /// `None` is a miss; `Some(None)` is a cached "no location" result.
    /// A hit resets the entry's expiration timer.
    pub async fn get(&self, client_ip: &str) -> Option<Option<Location>> {
        self.entries.get(client_ip).await
    }

    pub async fn insert(&self, client_ip: &str, location: Option<Location>) {
        self.entries.insert(client_ip.to_string(), location).await;
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}
