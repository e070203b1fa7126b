//! Shard router - serializes samples per vehicle across parallel workers
//!
//! Every sample for a given vehicle hashes to the same shard, so each
//! (vehicle, zone) pair is only ever evaluated on one worker task and the
//! tracker's read-modify-write needs no locking. Different vehicles proceed
//! in parallel across shards.

use crate::domain::types::PositionSample;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::publisher::EventPublisher;
use crate::io::store::LocationStore;
use crate::services::pipeline::IngestionPipeline;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Routing failure for one sample
#[derive(Debug, PartialEq, Eq)]
pub enum RouteError {
    /// The target shard's channel is full; the sample is dropped
    Full,
    /// Workers have shut down
    Closed,
}

/// Routes samples to shard workers by vehicle id hash
#[derive(Clone)]
pub struct IngestSender {
    shards: Vec<mpsc::Sender<PositionSample>>,
}

impl IngestSender {
    /// Hand a sample to its shard without blocking
    pub fn try_send(&self, sample: PositionSample) -> Result<(), RouteError> {
        let idx = self.shard_for(&sample);
        match self.shards[idx].try_send(sample) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(RouteError::Full),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(RouteError::Closed),
        }
    }

    fn shard_for(&self, sample: &PositionSample) -> usize {
        let mut hasher = FxHasher::default();
        sample.vehicle_id.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }
}

/// Spawn the shard workers and return the routing handle
///
/// Each worker owns one `IngestionPipeline` (and with it one slice of the
/// containment state); the store and publisher handles are shared. Workers
/// stop taking new samples on shutdown but finish the sample in hand.
pub fn spawn_ingest_shards(
    config: &Config,
    store: Arc<dyn LocationStore>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    shutdown: watch::Receiver<bool>,
) -> IngestSender {
    let mut shards = Vec::with_capacity(config.shards());

    for shard_id in 0..config.shards() {
        let (tx, rx) = mpsc::channel(config.ingest_buffer());
        let pipeline = IngestionPipeline::new(
            config.clone(),
            store.clone(),
            publisher.clone(),
            metrics.clone(),
        );
        tokio::spawn(run_shard(shard_id, pipeline, rx, shutdown.clone()));
        shards.push(tx);
    }

    info!(shards = %config.shards(), "ingest_shards_started");
    IngestSender { shards }
}

async fn run_shard(
    shard_id: usize,
    mut pipeline: IngestionPipeline,
    mut rx: mpsc::Receiver<PositionSample>,
    mut shutdown: watch::Receiver<bool>,
) {
    // Containment pruning piggybacks on a coarse tick; the TTL itself is
    // config-driven
    let mut prune_tick = interval(Duration::from_secs(60));
    prune_tick.tick().await; // First tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!(shard = %shard_id, "shard_shutdown");
                    return;
                }
            }
            _ = prune_tick.tick() => {
                pipeline.prune_containment();
            }
            sample = rx.recv() => {
                let Some(sample) = sample else {
                    info!(shard = %shard_id, "shard_channel_closed");
                    return;
                };
                let vehicle_id = sample.vehicle_id.clone();
                // An individual bad sample never stops the worker
                if let Err(e) = pipeline.ingest(sample).await {
                    warn!(shard = %shard_id, vehicle_id = %vehicle_id, error = %e, "sample_aborted");
                }
            }
        }
    }
}
