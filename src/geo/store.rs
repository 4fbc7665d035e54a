//! Shard storage: reading `*_IPLocation.csv` files into ordered ranges
//!
//! Shards are read-only and parsed on demand. A missing shard is an empty
//! shard, and a malformed row is skipped on its own without failing the
//! rest of the file.

use moka::sync::Cache;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::geo::error::{GeoError, GeoResult};
use crate::geo::models::IpRange;
use crate::geo::shard::{ShardKey, IPDB_DIR};

/// Field separator between quoted columns
const FIELD_SEPARATOR: &str = "\",\"";

/// Column count of a well-formed row
const COLUMNS: usize = 10;

/// Source of parsed shards
pub trait ShardStore: Send + Sync {
    /// Load every range stored in the shard at `key`, in file order.
    ///
    /// A shard that does not exist loads as an empty slice.
    fn load(&self, key: ShardKey) -> GeoResult<Arc<[IpRange]>>;
}

/// Result of parsing a shard's text
#[derive(Debug, Default)]
pub struct ParsedShard {
    pub ranges: Vec<IpRange>,
    /// Rejected rows as (1-based line number, reason)
    pub rejected: Vec<(usize, GeoError)>,
}

/// Parse one quote-delimited row.
///
/// Column order is `low, high, iso, country, state, city, lat, long, zip, tz`.
pub fn parse_row(line: &str) -> GeoResult<IpRange> {
    let values: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if values.len() < COLUMNS {
        return Err(GeoError::MalformedRow {
            reason: format!("expected {} columns, found {}", COLUMNS, values.len()),
        });
    }

    let low_ip = parse_bound(values[0].trim_start_matches('"'), "low")?;
    let high_ip = parse_bound(values[1], "high")?;
    if low_ip > high_ip {
        return Err(GeoError::MalformedRow {
            reason: format!("low bound {} exceeds high bound {}", low_ip, high_ip),
        });
    }

    Ok(IpRange {
        low_ip,
        high_ip,
        iso_code: values[2].to_string(),
        country: values[3].to_string(),
        state: values[4].to_string(),
        city: values[5].to_string(),
        latitude: values[6].to_string(),
        longitude: values[7].to_string(),
        zip: values[8].to_string(),
        timezone: values[9].trim_end_matches('"').to_string(),
    })
}

fn parse_bound(value: &str, which: &str) -> GeoResult<u32> {
    value.parse::<u32>().map_err(|e| GeoError::MalformedRow {
        reason: format!("{} bound '{}': {}", which, value, e),
    })
}

/// Parse a whole shard, keeping every row that parses
pub fn parse_shard(text: &str) -> ParsedShard {
    let mut parsed = ParsedShard::default();

    for (index, line) in text.trim_start_matches('\u{feff}').lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(line) {
            Ok(range) => parsed.ranges.push(range),
            Err(e) => parsed.rejected.push((index + 1, e)),
        }
    }

    parsed
}

/// Read and parse the shard file at `path`; a missing file is empty
pub fn read_shard(path: &Path) -> GeoResult<ParsedShard> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ParsedShard::default()),
        Err(source) => {
            return Err(GeoError::ShardIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    Ok(parse_shard(&String::from_utf8_lossy(&bytes)))
}

/// Shard store backed by the `<root>/ipdb` directory tree
#[derive(Debug, Clone)]
pub struct CsvShardStore {
    ipdb_dir: PathBuf,
}

impl CsvShardStore {
    /// Create a store reading shards beneath `<root>/ipdb`
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(IPDB_DIR))
    }

    /// Create a store reading shards directly beneath `ipdb_dir`
    pub fn new(ipdb_dir: impl Into<PathBuf>) -> Self {
        Self {
            ipdb_dir: ipdb_dir.into(),
        }
    }

    pub fn shard_path(&self, key: ShardKey) -> PathBuf {
        key.path_in(&self.ipdb_dir)
    }
}

impl ShardStore for CsvShardStore {
    fn load(&self, key: ShardKey) -> GeoResult<Arc<[IpRange]>> {
        let path = self.shard_path(key);
        let parsed = read_shard(&path)?;

        for (line, reason) in &parsed.rejected {
            debug!("Skipping row {} of {}: {}", line, path.display(), reason);
        }

        Ok(parsed.ranges.into())
    }
}

/// Shard store wrapper that keeps recently parsed shards in memory
pub struct CachedShardStore {
    inner: Arc<dyn ShardStore>,
    shards: Cache<ShardKey, Arc<[IpRange]>>,
}

impl CachedShardStore {
    pub fn new(inner: Arc<dyn ShardStore>, max_shards: u64) -> Self {
        let shards = Cache::builder().max_capacity(max_shards).build();
        Self { inner, shards }
    }
}

impl ShardStore for CachedShardStore {
    fn load(&self, key: ShardKey) -> GeoResult<Arc<[IpRange]>> {
        if let Some(cached) = self.shards.get(&key) {
            return Ok(cached);
        }

        let ranges = self.inner.load(key)?;
        self.shards.insert(key, Arc::clone(&ranges));
        Ok(ranges)
    }
}

/// Build the store described by the configuration: a CSV tree, optionally
/// fronted by a parse cache when `shard_cache_entries > 0`
pub fn open_store(ipdb_dir: impl Into<PathBuf>, shard_cache_entries: u64) -> Arc<dyn ShardStore> {
    let csv: Arc<dyn ShardStore> = Arc::new(CsvShardStore::new(ipdb_dir));
    if shard_cache_entries > 0 {
        Arc::new(CachedShardStore::new(csv, shard_cache_entries))
    } else {
        csv
    }
}

/// Load a shard, degrading any read failure to an empty shard
pub(crate) fn load_or_empty(store: &dyn ShardStore, key: ShardKey) -> Arc<[IpRange]> {
    match store.load(key) {
        Ok(ranges) => ranges,
        Err(e) => {
            warn!("Treating shard {} as empty: {}", key, e);
            Arc::from(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ROW: &str =
        r#""0","16909060","US","United States","CA","Mountain View","37.4","-122.1","94043","PST""#;

    #[test]
    fn test_parse_row_column_mapping() {
        let range = parse_row(ROW).unwrap();
        assert_eq!(range.low_ip, 0);
        assert_eq!(range.high_ip, 16909060);
        assert_eq!(range.iso_code, "US");
        assert_eq!(range.country, "United States");
        assert_eq!(range.state, "CA");
        assert_eq!(range.city, "Mountain View");
        assert_eq!(range.latitude, "37.4");
        assert_eq!(range.longitude, "-122.1");
        assert_eq!(range.zip, "94043");
        assert_eq!(range.timezone, "PST");
    }

    #[test]
    fn test_parse_row_rejects_bad_rows() {
        assert!(parse_row(r#""1","2","US""#).is_err());
        assert!(parse_row(r#""x","2","US","A","B","C","1","2","3","T""#).is_err());
        assert!(parse_row(r#""9","2","US","A","B","C","1","2","3","T""#).is_err());
        assert!(parse_row("").is_err());
    }

    #[test]
    fn test_parse_shard_skips_corrupt_line() {
        let text = format!(
            "{}\n\"garbage\n{}\n",
            ROW, r#""16909061","16909100","DE","Germany","BE","Berlin","52.5","13.4","10115","CET""#
        );
        let parsed = parse_shard(&text);
        assert_eq!(parsed.ranges.len(), 2);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.rejected[0].0, 2);
        assert_eq!(parsed.ranges[1].city, "Berlin");
    }

    #[test]
    fn test_parse_shard_handles_crlf() {
        let text = format!("{}\r\n{}\r\n", ROW, ROW);
        let parsed = parse_shard(&text);
        assert_eq!(parsed.ranges.len(), 2);
        assert_eq!(parsed.ranges[0].timezone, "PST");
    }

    #[test]
    fn test_missing_shard_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvShardStore::from_root(dir.path());
        let ranges = store.load(ShardKey::new(12, 345)).unwrap();
        assert!(ranges.is_empty());
    }

    struct CountingStore {
        loads: AtomicUsize,
    }

    impl ShardStore for CountingStore {
        fn load(&self, _key: ShardKey) -> GeoResult<Arc<[IpRange]>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![parse_row(ROW).unwrap()].into())
        }
    }

    #[test]
    fn test_cached_store_parses_once() {
        let counting = Arc::new(CountingStore {
            loads: AtomicUsize::new(0),
        });
        let cached = CachedShardStore::new(counting.clone(), 16);

        let first = cached.load(ShardKey::new(0, 0)).unwrap();
        let second = cached.load(ShardKey::new(0, 0)).unwrap();

        assert_eq!(first, second);
        assert_eq!(counting.loads.load(Ordering::SeqCst), 1);
    }
}
