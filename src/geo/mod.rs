//! IP-to-location resolution over a partitioned CSV dataset
//!
//! The dataset lives under `<root>/ipdb/<folder>/<prefix>_IPLocation.csv`.
//! Lookups convert a dotted IPv4 string to an integer key, derive the
//! shard that should hold it, and walk backwards through a few adjacent
//! shards when the direct one has no matching range.

pub mod codec;
pub mod error;
pub mod models;
pub mod resolver;
pub mod shard;
pub mod store;

pub use codec::{format_ipv4, parse_ipv4};
pub use error::{GeoError, GeoResult};
pub use models::{IpRange, Location};
pub use resolver::{FallbackResolver, Resolution, DEFAULT_MAX_ATTEMPTS};
pub use shard::{ShardKey, IPDB_DIR};
pub use store::{open_store, CachedShardStore, CsvShardStore, ShardStore};
