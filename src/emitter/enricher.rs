//! Cache-fronted location lookup for client IP strings

use tokio::task;
use tracing::debug;

use crate::cache::LocationCache;
use crate::emitter::EmitError;
use crate::geo::{parse_ipv4, FallbackResolver, Location};

/// Result of a location lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub location: Option<Location>,
    pub cache_hit: bool,
}

/// Resolves client IPs through the location cache and the fallback resolver
#[derive(Clone)]
pub struct Enricher {
    cache: LocationCache,
    resolver: FallbackResolver,
}

impl Enricher {
    pub fn new(cache: LocationCache, resolver: FallbackResolver) -> Self {
        Self { cache, resolver }
    }

    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    /// Look up the location of `client_ip`.
    ///
    /// The cache is keyed by the string exactly as given; the address is
    /// trimmed only for parsing. Unparseable addresses and exhausted
    /// fallback walks both cache `None`.
    pub async fn locate(&self, client_ip: &str) -> Result<Lookup, EmitError> {
        if let Some(location) = self.cache.get(client_ip).await {
            return Ok(Lookup {
                location,
                cache_hit: true,
            });
        }

        let location = match parse_ipv4(client_ip.trim()) {
            Ok(key) => {
                let resolver = self.resolver.clone();
                task::spawn_blocking(move || resolver.locate(key))
                    .await?
                    .map(Location::from)
            }
            Err(e) => {
                debug!("Not resolving client address: {}", e);
                None
            }
        };

        self.cache.insert(client_ip, location.clone()).await;

        Ok(Lookup {
            location,
            cache_hit: false,
        })
    }
}
