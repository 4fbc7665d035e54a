//! Host-facing log plugin
//!
//! The host sets `settings`, calls `init` with the plugin's own directory
//! and then forwards log lines through `write_log`. Re-initialising drops
//! the previous cache and closes the old worker pool without waiting on it.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::LocationCache;
use crate::config::Config;
use crate::emitter::{Enricher, EventEmitter, StatsSnapshot};
use crate::geo::{open_store, FallbackResolver, IPDB_DIR};
use crate::sink::{DisabledSink, LogAnalyticsSink, LogSink};

/// Setting overriding the root directory that holds `ipdb`
pub const SETTING_WWW_PATH: &str = "wwwPath";

/// Setting written by `init` with the resolved `ipdb` directory
pub const SETTING_IPDB: &str = "ipdb";

pub struct GeoLogPlugin {
    pub settings: HashMap<String, String>,
    config: Config,
    sink: Option<Arc<dyn LogSink>>,
    emitter: Option<EventEmitter>,
}

impl GeoLogPlugin {
    /// Plugin using a sink built from `config.sink`
    pub fn new(config: Config) -> Self {
        Self {
            settings: HashMap::new(),
            config,
            sink: None,
            emitter: None,
        }
    }

    /// Plugin delivering to a caller-provided sink
    pub fn with_sink(config: Config, sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(config)
        }
    }

    pub fn name(&self) -> &'static str {
        env!("CARGO_PKG_NAME")
    }

    /// Set up the cache, dataset location and worker pool.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn init(&mut self, plugin_path: impl AsRef<Path>) -> Result<()> {
        // Old workers finish their queue on their own; init never waits on the sink
        if let Some(previous) = self.emitter.take() {
            previous.enricher().cache().clear();
            previous.detach();
        }

        let root = self
            .settings
            .get(SETTING_WWW_PATH)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .or_else(|| self.config.dataset.www_path.clone())
            .unwrap_or_else(|| plugin_path.as_ref().to_path_buf());

        let ipdb = root.join(IPDB_DIR);
        if !ipdb.exists() {
            std::fs::create_dir_all(&ipdb)
                .with_context(|| format!("failed to create {}", ipdb.display()))?;
        }
        self.settings
            .insert(SETTING_IPDB.to_string(), ipdb.to_string_lossy().into_owned());

        let store = open_store(&ipdb, self.config.dataset.shard_cache_entries);
        let resolver =
            FallbackResolver::with_max_attempts(store, self.config.dataset.fallback_attempts);
        let cache = LocationCache::new(
            Duration::from_secs(self.config.cache.ttl_secs),
            self.config.cache.max_entries,
        );

        let sink = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => self.build_sink(),
        };
        if !sink.is_configured() {
            info!("No log destination configured; {} is inert", self.name());
        }

        self.emitter = Some(EventEmitter::new(
            Enricher::new(cache, resolver),
            sink,
            self.config.emitter.workers,
        ));

        info!("Initialized {} with dataset at {}", self.name(), ipdb.display());
        Ok(())
    }

    fn build_sink(&self) -> Arc<dyn LogSink> {
        match LogAnalyticsSink::from_config(&self.config.sink) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                warn!("Failed to build log sink, emission disabled: {}", e);
                Arc::new(DisabledSink)
            }
        }
    }

    /// Forward one log line. A no-op before `init`.
    pub fn write_log(&self, text: &str, client_ip: &str, event_id: i32, customer_id: &str) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(text, client_ip, event_id, customer_id);
        }
    }

    pub fn emitter(&self) -> Option<&EventEmitter> {
        self.emitter.as_ref()
    }

    /// Drain queued events and stop the worker pool
    pub async fn shutdown(&mut self) -> Option<StatsSnapshot> {
        match self.emitter.take() {
            Some(emitter) => Some(emitter.shutdown().await),
            None => None,
        }
    }
}
