//! Fire-and-forget event enrichment and dispatch
//!
//! `emit` only enqueues. A fixed pool of worker tasks drains an unbounded
//! channel, resolves the client's location (cache first), builds the
//! enriched record and posts it to the sink. Every failure stops at the
//! worker: callers never wait on or observe delivery.

pub mod enricher;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::sink::{EnrichedEvent, LogSink, SinkError};

pub use enricher::{Enricher, Lookup};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("location resolution task failed: {0}")]
    Resolution(#[from] tokio::task::JoinError),
    #[error("sink delivery failed: {0}")]
    Sink(#[from] SinkError),
}

/// One queued call to `emit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogJob {
    pub text: String,
    pub client_ip: String,
    pub event_id: i32,
    pub customer_id: String,
}

/// Successful processing of a job
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub event: EnrichedEvent,
    pub cache_hit: bool,
}

/// Live counters updated by `emit` and the workers
#[derive(Debug, Default)]
pub struct EmitterStats {
    /// Jobs accepted onto the queue
    enqueued: AtomicU64,
    /// Jobs the sink accepted
    delivered: AtomicU64,
    /// Jobs dropped by a resolution or sink failure
    failed: AtomicU64,
    /// Lookups that produced a location
    resolved: AtomicU64,
    /// Lookups that produced no location
    unresolved: AtomicU64,
    /// Lookups answered from the location cache
    cache_hits: AtomicU64,
}

/// Point-in-time copy of `EmitterStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Jobs accepted onto the queue
    pub enqueued: u64,
    /// Jobs the sink accepted
    pub delivered: u64,
    /// Jobs dropped by a resolution or sink failure
    pub failed: u64,
    /// Lookups that produced a location
    pub resolved: u64,
    /// Lookups that produced no location
    pub unresolved: u64,
    /// Lookups answered from the location cache
    pub cache_hits: u64,
}

impl EmitterStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    enricher: Enricher,
    sink: Arc<dyn LogSink>,
    stats: EmitterStats,
}

impl Shared {
    async fn process(&self, job: LogJob) -> Result<Dispatched, EmitError> {
        let lookup = self.enricher.locate(&job.client_ip).await?;

        if lookup.cache_hit {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if lookup.location.is_some() {
            self.stats.resolved.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.unresolved.fetch_add(1, Ordering::Relaxed);
        }

        let event = EnrichedEvent::new(
            &job.text,
            &job.client_ip,
            job.event_id,
            &job.customer_id,
            lookup.location.as_ref(),
        );
        self.sink.post(&event).await?;

        Ok(Dispatched {
            event,
            cache_hit: lookup.cache_hit,
        })
    }
}

pub struct EventEmitter {
    shared: Arc<Shared>,
    sender: mpsc::UnboundedSender<LogJob>,
    workers: Vec<JoinHandle<()>>,
}

impl EventEmitter {
    /// Start `workers` dispatch tasks on the current tokio runtime
    pub fn new(enricher: Enricher, sink: Arc<dyn LogSink>, workers: usize) -> Self {
        let shared = Arc::new(Shared {
            enricher,
            sink,
            stats: EmitterStats::default(),
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(async move {
                    run_worker(shared, receiver).await;
                })
            })
            .collect();

        Self {
            shared,
            sender,
            workers,
        }
    }

    /// Queue one event for enrichment and delivery.
    ///
    /// Returns immediately. Does nothing while the sink is unconfigured;
    /// that check runs on every call.
    pub fn emit(&self, text: &str, client_ip: &str, event_id: i32, customer_id: &str) {
        if !self.shared.sink.is_configured() {
            return;
        }

        let job = LogJob {
            text: text.to_string(),
            client_ip: client_ip.to_string(),
            event_id,
            customer_id: customer_id.to_string(),
        };

        if self.sender.send(job).is_ok() {
            self.shared.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Run one job inline and return its outcome instead of discarding it
    pub async fn process(&self, job: LogJob) -> Result<Dispatched, EmitError> {
        self.shared.process(job).await
    }

    pub fn enricher(&self) -> &Enricher {
        &self.shared.enricher
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Close the queue and wait for workers to drain what was already queued
    pub async fn shutdown(self) -> StatsSnapshot {
        let Self {
            shared,
            sender,
            workers,
        } = self;
        drop(sender);

        for worker in workers {
            let _ = worker.await;
        }

        info!("Event emitter stopped");
        shared.stats.snapshot()
    }

    /// Close the queue without waiting.
    ///
    /// Workers keep running in the background until the jobs already
    /// queued are finished, then exit.
    pub fn detach(self) -> StatsSnapshot {
        let snapshot = self.shared.stats.snapshot();
        drop(self.sender);
        snapshot
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<LogJob>>>,
) {
    loop {
        let job = { receiver.lock().await.recv().await };
        let Some(job) = job else {
            break;
        };

        match shared.process(job).await {
            Ok(_) => {
                shared.stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                shared.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
