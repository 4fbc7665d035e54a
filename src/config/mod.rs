use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub cache: CacheConfig,
    pub emitter: EmitterConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Root directory holding the `ipdb` tree. `None` defers to the
    /// path supplied by the plugin host.
    pub www_path: Option<PathBuf>,
    /// Number of parsed shards kept in memory (0 disables the parse cache)
    pub shard_cache_entries: u64,
    /// Total shard attempts per lookup, including the direct shard
    pub fallback_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Sliding expiration of a cached client, in seconds
    pub ttl_secs: u64,
    /// Upper bound on cached clients
    pub max_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub workspace_id: Option<String>,
    pub shared_key: Option<String>,
    pub log_type: String,
    /// Overrides the endpoint derived from the workspace id
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "SinkConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SinkConfig {
    const fn default_timeout_secs() -> u64 {
        10
    }

    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.workspace_id) && present(&self.shared_key)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            workspace_id: None,
            shared_key: None,
            log_type: "RuckZuck".to_string(),
            endpoint: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig {
                www_path: None,
                shard_cache_entries: 0,
                fallback_attempts: crate::geo::DEFAULT_MAX_ATTEMPTS,
            },
            cache: CacheConfig {
                ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
                max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            },
            emitter: EmitterConfig { workers: 4 },
            sink: SinkConfig::default(),
        }
    }
}

/// First non-empty value among several variable names
fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value '{value}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let www_path = env_any(&["GEOLOG_WWW_PATH"]).map(PathBuf::from);
        let shard_cache_entries = env_parse(
            "GEOLOG_SHARD_CACHE_ENTRIES",
            defaults.dataset.shard_cache_entries,
        )?;
        let fallback_attempts =
            env_parse("GEOLOG_FALLBACK_ATTEMPTS", defaults.dataset.fallback_attempts)?;
        if fallback_attempts == 0 {
            anyhow::bail!("GEOLOG_FALLBACK_ATTEMPTS must be at least 1");
        }

        let ttl_secs = env_parse("GEOLOG_CACHE_TTL_SECS", defaults.cache.ttl_secs)?;
        let max_entries = env_parse("GEOLOG_CACHE_MAX_ENTRIES", defaults.cache.max_entries)?;

        let workers = env_parse("GEOLOG_WORKERS", defaults.emitter.workers)?.max(1);

        let workspace_id = env_any(&["LOG_WORKSPACE_ID", "Log-WorkspaceID"]);
        let shared_key = env_any(&["LOG_SHARED_KEY", "Log-SharedKey"]);
        let log_type = env_any(&["LOG_TYPE"]).unwrap_or(defaults.sink.log_type);
        let endpoint = env_any(&["LOG_ENDPOINT"]);
        let timeout_secs = env_parse("LOG_TIMEOUT_SECS", defaults.sink.timeout_secs)?;

        let sink = SinkConfig {
            workspace_id,
            shared_key,
            log_type,
            endpoint,
            timeout_secs,
        };

        if !sink.is_configured() {
            tracing::info!("Log sink credentials not set; event emission is disabled");
        }

        Ok(Config {
            dataset: DatasetConfig {
                www_path,
                shard_cache_entries,
                fallback_attempts,
            },
            cache: CacheConfig {
                ttl_secs,
                max_entries,
            },
            emitter: EmitterConfig { workers },
            sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.dataset.fallback_attempts, 5);
        assert_eq!(config.sink.log_type, "RuckZuck");
        assert!(!config.sink.is_configured());
    }

    #[test]
    fn test_sink_needs_non_empty_credentials() {
        let mut sink = SinkConfig {
            workspace_id: Some("ws".to_string()),
            shared_key: Some(String::new()),
            ..Default::default()
        };
        assert!(!sink.is_configured());

        sink.shared_key = Some("a2V5".to_string());
        assert!(sink.is_configured());
    }
}
