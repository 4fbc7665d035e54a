//! Log sinks receiving enriched event records
//!
//! The sink owns delivery. Callers hand it a record and do not observe the
//! outcome beyond the returned `Result`, which the emitter discards.

pub mod log_analytics;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::geo::Location;

pub use log_analytics::LogAnalyticsSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink has no configured destination")]
    Unconfigured,
    #[error("invalid shared key: {0}")]
    InvalidKey(String),
    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sink rejected record with status {status}")]
    Rejected { status: u16 },
    #[error("{0}")]
    Other(String),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Outbound record: caller-supplied fields plus optional geo attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedEvent {
    #[serde(rename = "Computer")]
    pub computer: String,
    #[serde(rename = "EventID")]
    pub event_id: i32,
    #[serde(rename = "CustomerID")]
    pub customer_id: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Country", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "State", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// City
    #[serde(rename = "Location", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "Long", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(rename = "Lat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
}

impl EnrichedEvent {
    pub fn new(
        description: &str,
        client_ip: &str,
        event_id: i32,
        customer_id: &str,
        location: Option<&Location>,
    ) -> Self {
        Self {
            computer: client_ip.to_string(),
            event_id,
            customer_id: customer_id.to_string(),
            description: description.to_string(),
            country: location.map(|l| l.country.clone()),
            state: location.map(|l| l.state.clone()),
            location: location.map(|l| l.city.clone()),
            longitude: location.map(|l| l.longitude.clone()),
            latitude: location.map(|l| l.latitude.clone()),
        }
    }

    pub fn has_location(&self) -> bool {
        self.country.is_some()
    }
}

#[async_trait]
pub trait LogSink: Send + Sync {
    /// Whether the sink has a destination. Checked on every emit.
    fn is_configured(&self) -> bool;

    /// Deliver one record
    async fn post(&self, event: &EnrichedEvent) -> SinkResult<()>;
}

/// Sink with no destination; emission through it is a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSink;

#[async_trait]
impl LogSink for DisabledSink {
    fn is_configured(&self) -> bool {
        false
    }

    async fn post(&self, _event: &EnrichedEvent) -> SinkResult<()> {
        Err(SinkError::Unconfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_location_omits_geo_fields() {
        let event = EnrichedEvent::new("installed", "10.0.0.1", 3, "contoso", None);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["Computer"], "10.0.0.1");
        assert_eq!(json["EventID"], 3);
        assert_eq!(json["CustomerID"], "contoso");
        assert_eq!(json["Description"], "installed");
        assert!(json.get("Country").is_none());
        assert!(json.get("Lat").is_none());
        assert!(!event.has_location());
    }

    #[test]
    fn test_record_with_location() {
        let location = Location {
            country: "United States".to_string(),
            state: "CA".to_string(),
            city: "Mountain View".to_string(),
            latitude: "37.4".to_string(),
            longitude: "-122.1".to_string(),
            ..Default::default()
        };
        let event = EnrichedEvent::new("installed", "10.0.0.1", 0, "", Some(&location));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["Country"], "United States");
        assert_eq!(json["State"], "CA");
        assert_eq!(json["Location"], "Mountain View");
        assert_eq!(json["Long"], "-122.1");
        assert_eq!(json["Lat"], "37.4");
    }
}
