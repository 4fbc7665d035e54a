//! Resolution tests against an on-disk `ipdb` tree

use geolog::geo::{
    parse_ipv4, CsvShardStore, FallbackResolver, Location, ShardKey, ShardStore,
    DEFAULT_MAX_ATTEMPTS,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Write a shard file under `<root>/ipdb`
fn write_shard(root: &Path, key: ShardKey, rows: &[&str]) {
    let path = key.path_in(&root.join("ipdb"));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, rows.join("\n")).unwrap();
}

fn row(low: u32, high: u32, country: &str, state: &str, city: &str) -> String {
    format!(
        r#""{}","{}","XX","{}","{}","{}","1.5","2.5","1000","UTC""#,
        low, high, country, state, city
    )
}

fn resolver(root: &TempDir) -> FallbackResolver {
    FallbackResolver::new(Arc::new(CsvShardStore::from_root(root.path())))
}

#[test]
fn test_end_to_end_example() {
    let root = tempfile::tempdir().unwrap();
    write_shard(
        root.path(),
        ShardKey::new(0, 0),
        &[r#""0","16909060","US","United States","CA","Mountain View","37.4","-122.1","94043","PST""#],
    );

    let key = parse_ipv4("0.0.1.0").unwrap();
    assert_eq!(key, 256);

    let range = resolver(&root).locate(key).expect("range should resolve");
    let location = Location::from(range);
    assert_eq!(location.country, "United States");
    assert_eq!(location.state, "CA");
    assert_eq!(location.city, "Mountain View");
    assert_eq!(location.latitude, "37.4");
    assert_eq!(location.longitude, "-122.1");
}

#[test]
fn test_fallback_reaches_four_steps_back() {
    let root = tempfile::tempdir().unwrap();
    let ip = parse_ipv4("1.2.3.4").unwrap(); // 0016909060 -> 00/169
    assert_eq!(ShardKey::locate(ip), ShardKey::new(0, 169));

    write_shard(
        root.path(),
        ShardKey::new(0, 165),
        &[&row(16_500_000, 16_999_999, "Austria", "Vienna", "Vienna")],
    );

    let resolution = resolver(&root).resolve(ip);
    assert!(resolution.is_found());
    assert_eq!(resolution.attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(resolution.shard, Some(ShardKey::new(0, 165)));
    assert_eq!(resolution.first().unwrap().country, "Austria");
}

#[test]
fn test_fallback_gives_up_after_five_attempts() {
    let root = tempfile::tempdir().unwrap();
    let ip = parse_ipv4("1.2.3.4").unwrap();

    write_shard(
        root.path(),
        ShardKey::new(0, 164),
        &[&row(16_400_000, 16_999_999, "Austria", "Vienna", "Vienna")],
    );

    let resolution = resolver(&root).resolve(ip);
    assert!(!resolution.is_found());
    assert_eq!(resolution.attempts, DEFAULT_MAX_ATTEMPTS);
}

#[test]
fn test_every_address_in_range_resolves_to_it() {
    let root = tempfile::tempdir().unwrap();
    let low = parse_ipv4("8.8.8.0").unwrap();
    let high = parse_ipv4("8.8.8.255").unwrap();
    let shard = ShardKey::locate(low);
    assert_eq!(shard, ShardKey::locate(high));

    write_shard(
        root.path(),
        shard,
        &[
            &row(low - 1000, low - 1, "Nowhere", "-", "-"),
            &row(low, high, "United States", "CA", "Mountain View"),
            &row(high + 1, high + 1000, "Nowhere", "-", "-"),
        ],
    );

    let resolver = resolver(&root);
    for ip in (low..=high).step_by(17).chain([low, high]) {
        let range = resolver.locate(ip).expect("address inside range");
        assert_eq!(range.low_ip, low);
        assert_eq!(range.country, "United States");
    }
    assert_ne!(resolver.locate(high + 1).unwrap().low_ip, low);
}

#[test]
fn test_corrupt_row_does_not_spoil_shard() {
    let root = tempfile::tempdir().unwrap();
    let key = ShardKey::new(12, 34);
    write_shard(
        root.path(),
        key,
        &[
            &row(1_234_000_000, 1_234_099_999, "France", "IDF", "Paris"),
            r#""1234100000","not-a-number","FR","France""#,
            &row(1_234_100_000, 1_234_199_999, "France", "ARA", "Lyon"),
        ],
    );

    let store = CsvShardStore::from_root(root.path());
    let ranges = store.load(key).unwrap();
    assert_eq!(ranges.len(), 2);
    assert_eq!(ranges[0].city, "Paris");
    assert_eq!(ranges[1].city, "Lyon");
}

#[test]
fn test_missing_dataset_resolves_nothing() {
    let root = tempfile::tempdir().unwrap();
    let resolution = resolver(&root).resolve(parse_ipv4("203.0.113.7").unwrap());
    assert!(!resolution.is_found());
    assert_eq!(resolution.attempts, DEFAULT_MAX_ATTEMPTS);
}

#[test]
fn test_walk_crosses_into_previous_folder_on_disk() {
    let root = tempfile::tempdir().unwrap();
    let ip = 2_000_000_500; // 20/000
    write_shard(
        root.path(),
        ShardKey::new(19, 999),
        &[&row(1_999_990_000, 2_000_010_000, "Japan", "Tokyo", "Tokyo")],
    );

    let resolution = resolver(&root).resolve(ip);
    assert_eq!(resolution.shard, Some(ShardKey::new(19, 999)));
    assert_eq!(resolution.attempts, 2);
}
