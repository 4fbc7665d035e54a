//! Fallback resolution across adjacent shards
//!
//! Shard boundaries are numeric prefix cuts, so a range can be authored
//! under a lower prefix than the one its addresses map to. When the direct
//! shard has no match the resolver walks backwards one prefix at a time,
//! up to a fixed number of total attempts. Forward shards are never tried.

use std::sync::Arc;
use tracing::debug;

use crate::geo::models::IpRange;
use crate::geo::shard::ShardKey;
use crate::geo::store::{load_or_empty, ShardStore};

/// Total shard attempts: the direct shard plus four backward steps
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Outcome of a fallback walk
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// All ranges containing the address, in file order
    pub matches: Vec<IpRange>,
    /// Shard that produced the matches, if any
    pub shard: Option<ShardKey>,
    /// Number of shards loaded
    pub attempts: usize,
}

impl Resolution {
    /// First match in file order, the canonical answer
    pub fn first(&self) -> Option<&IpRange> {
        self.matches.first()
    }

    pub fn into_first(self) -> Option<IpRange> {
        self.matches.into_iter().next()
    }

    pub fn is_found(&self) -> bool {
        !self.matches.is_empty()
    }
}

#[derive(Clone)]
pub struct FallbackResolver {
    store: Arc<dyn ShardStore>,
    max_attempts: usize,
}

impl FallbackResolver {
    pub fn new(store: Arc<dyn ShardStore>) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Arc<dyn ShardStore>, max_attempts: usize) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Find every range containing `ip`, walking back from its shard
    pub fn resolve(&self, ip: u32) -> Resolution {
        let mut key = Some(ShardKey::locate(ip));
        let mut attempts = 0;

        while let Some(current) = key {
            if attempts == self.max_attempts {
                break;
            }
            attempts += 1;

            let matches: Vec<IpRange> = load_or_empty(self.store.as_ref(), current)
                .iter()
                .filter(|range| range.contains(ip))
                .cloned()
                .collect();

            if !matches.is_empty() {
                debug!(
                    "Resolved {} in shard {} after {} attempt(s)",
                    ip, current, attempts
                );
                return Resolution {
                    matches,
                    shard: Some(current),
                    attempts,
                };
            }

            key = current.previous();
        }

        debug!("No range for {} after {} attempt(s)", ip, attempts);
        Resolution {
            attempts,
            ..Default::default()
        }
    }

    /// Canonical range for `ip`, if any
    pub fn locate(&self, ip: u32) -> Option<IpRange> {
        self.resolve(ip).into_first()
    }
}
