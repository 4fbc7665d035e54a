//! Shard addressing for the partitioned `ipdb` tree
//!
//! An integer key is rendered as a zero-padded 10-digit decimal string.
//! The first two digits select the folder and the next three select the
//! file prefix, so `16909060` (`0016909060`) lives in `00/169_IPLocation.csv`.

use std::fmt;
use std::path::{Path, PathBuf};

/// Directory under the configured root holding the shard tree
pub const IPDB_DIR: &str = "ipdb";

/// File name suffix shared by every shard
pub const SHARD_SUFFIX: &str = "_IPLocation.csv";

const MAX_PREFIX: u16 = 999;

/// Coordinate of a single shard file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardKey {
    /// Two-digit folder index, always in `0..=99` for keys derived from a `u32`
    pub folder: u8,
    /// Three-digit file prefix index in `0..=999`
    pub prefix: u16,
}

impl ShardKey {
    pub fn new(folder: u8, prefix: u16) -> Self {
        Self { folder, prefix }
    }

    /// Derive the shard that should contain `ip_key`
    pub fn locate(ip_key: u32) -> Self {
        let digits = format!("{:010}", ip_key);
        // u32::MAX has ten digits, so both slices are always present and numeric
        let folder = digits[0..2].parse::<u8>().unwrap_or(0);
        let prefix = digits[2..5].parse::<u16>().unwrap_or(0);
        Self { folder, prefix }
    }

    /// The next shard below this one in key order.
    ///
    /// Prefix `000` wraps to `999` of the previous folder. Returns `None`
    /// for `00/000`, which has nothing below it.
    pub fn previous(self) -> Option<Self> {
        if self.prefix > 0 {
            Some(Self::new(self.folder, self.prefix - 1))
        } else if self.folder > 0 {
            Some(Self::new(self.folder - 1, MAX_PREFIX))
        } else {
            None
        }
    }

    /// Path of this shard relative to the `ipdb` directory
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(format!("{:02}", self.folder))
            .join(format!("{:03}{}", self.prefix, SHARD_SUFFIX))
    }

    /// Full path of this shard beneath an `ipdb` directory
    pub fn path_in(&self, ipdb_dir: &Path) -> PathBuf {
        ipdb_dir.join(self.relative_path())
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:03}", self.folder, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_slices_padded_digits() {
        assert_eq!(ShardKey::locate(16909060), ShardKey::new(0, 169));
        assert_eq!(ShardKey::locate(256), ShardKey::new(0, 0));
        assert_eq!(ShardKey::locate(134744072), ShardKey::new(1, 347));
        assert_eq!(ShardKey::locate(u32::MAX), ShardKey::new(42, 949));
    }

    #[test]
    fn test_locate_is_deterministic() {
        for key in [0u32, 1, 99_999, 100_000, 3_000_000_000, u32::MAX] {
            assert_eq!(ShardKey::locate(key), ShardKey::locate(key));
        }
    }

    #[test]
    fn test_previous_wraps_folder() {
        assert_eq!(ShardKey::new(3, 5).previous(), Some(ShardKey::new(3, 4)));
        assert_eq!(ShardKey::new(3, 0).previous(), Some(ShardKey::new(2, 999)));
        assert_eq!(ShardKey::new(0, 0).previous(), None);
    }

    #[test]
    fn test_shard_path_layout() {
        let path = ShardKey::new(7, 42).path_in(Path::new("/srv/www/ipdb"));
        assert_eq!(path, PathBuf::from("/srv/www/ipdb/07/042_IPLocation.csv"));
        assert_eq!(ShardKey::new(7, 42).to_string(), "07/042");
    }
}
