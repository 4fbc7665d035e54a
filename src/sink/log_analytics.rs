//! Log Analytics HTTP Data Collector sink
//!
//! Records are posted as a JSON array and signed with the workspace's
//! shared key (HMAC-SHA256 over a canonical string, base64 encoded).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;

use crate::config::SinkConfig;
use crate::sink::{EnrichedEvent, LogSink, SinkError, SinkResult};

const API_VERSION: &str = "2016-04-01";
const CONTENT_TYPE: &str = "application/json";
const RESOURCE: &str = "/api/logs";

#[derive(Clone)]
pub struct LogAnalyticsSink {
    workspace_id: String,
    shared_key: String,
    log_type: String,
    endpoint: String,
    client: Client,
}

impl LogAnalyticsSink {
    pub fn from_config(config: &SinkConfig) -> SinkResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("geolog/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let workspace_id = config.workspace_id.clone().unwrap_or_default();
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| default_endpoint(&workspace_id));

        Ok(Self {
            workspace_id,
            shared_key: config.shared_key.clone().unwrap_or_default(),
            log_type: config.log_type.clone(),
            endpoint,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorization(&self, content_length: usize, date: &str) -> SinkResult<String> {
        let signature = sign(&self.shared_key, content_length, date)?;
        Ok(format!("SharedKey {}:{}", self.workspace_id, signature))
    }
}

fn default_endpoint(workspace_id: &str) -> String {
    format!(
        "https://{}.ods.opinsights.azure.com{}?api-version={}",
        workspace_id, RESOURCE, API_VERSION
    )
}

/// RFC 1123 date as expected in `x-ms-date`
pub fn rfc1123(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Compute the SharedKey signature for a POST of `content_length` bytes
pub fn sign(shared_key: &str, content_length: usize, date: &str) -> SinkResult<String> {
    let key = STANDARD
        .decode(shared_key)
        .map_err(|e| SinkError::InvalidKey(e.to_string()))?;

    let string_to_sign = format!(
        "POST\n{}\n{}\nx-ms-date:{}\n{}",
        content_length, CONTENT_TYPE, date, RESOURCE
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| SinkError::InvalidKey(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl LogSink for LogAnalyticsSink {
    fn is_configured(&self) -> bool {
        !self.workspace_id.is_empty() && !self.shared_key.is_empty()
    }

    async fn post(&self, event: &EnrichedEvent) -> SinkResult<()> {
        if !self.is_configured() {
            return Err(SinkError::Unconfigured);
        }

        let body = serde_json::to_vec(&[event])?;
        let date = rfc1123(Utc::now());
        let authorization = self.authorization(body.len(), &date)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", authorization)
            .header("Log-Type", &self.log_type)
            .header("x-ms-date", &date)
            .header("Content-Type", CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("Posted event {} for {}", event.event_id, event.computer);
        Ok(())
    }
}
