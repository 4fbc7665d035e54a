//! Data models for IP geolocation

use serde::{Deserialize, Serialize};

/// One row of the shard dataset: an inclusive IP range and its location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRange {
    pub low_ip: u32,
    pub high_ip: u32,
    pub iso_code: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub latitude: String,
    pub longitude: String,
    pub zip: String,
    pub timezone: String,
}

impl IpRange {
    pub fn contains(&self, ip: u32) -> bool {
        self.low_ip <= ip && ip <= self.high_ip
    }
}

/// Geographic attributes attached to an enriched event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// ISO country code (e.g., "US")
    pub iso_code: String,

    /// Country name
    pub country: String,

    /// Region/state/province
    pub state: String,

    /// City name
    pub city: String,

    /// Coordinates are carried as text, exactly as stored in the dataset
    pub latitude: String,
    pub longitude: String,

    pub zip: String,
    pub timezone: String,
}

impl From<IpRange> for Location {
    fn from(range: IpRange) -> Self {
        Self {
            iso_code: range.iso_code,
            country: range.country,
            state: range.state,
            city: range.city,
            latitude: range.latitude,
            longitude: range.longitude,
            zip: range.zip,
            timezone: range.timezone,
        }
    }
}
