//! Ingestion pipeline - validate, persist, evaluate, publish
//!
//! One pipeline instance runs per shard worker, so every (vehicle, zone)
//! read-modify-write happens on a single task without locks. The store and
//! publisher are shared handles, safe for concurrent use across shards.
//!
//! The sample's durability guarantee is stronger than the alert's delivery
//! guarantee: the pipeline reports success once the append commits, and a
//! publish failure after bounded retries is logged and counted, never
//! surfaced as an error.

use crate::domain::types::{PositionSample, TransitionEvent, TransitionKind};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::publisher::EventPublisher;
use crate::io::store::{LocationStore, StorageError};
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

use super::transitions::TransitionTracker;

/// Sample rejected before any side effect
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("vehicle_id is required")]
    EmptyVehicleId,
    #[error("timestamp must be a positive integer")]
    NonPositiveTimestamp,
}

/// Terminal failure for one sample. Never stops the ingestion loop.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid sample: {0}")]
    Validation(#[from] ValidationError),
    #[error("persist failed: {0}")]
    Storage(#[from] StorageError),
}

/// Outcome of a successfully ingested sample
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Transition events evaluated for this sample (already published,
    /// subject to `publish_failed`)
    pub events: SmallVec<[TransitionEvent; 2]>,
    /// Events whose publication exhausted the retry budget
    pub publish_failed: usize,
}

pub struct IngestionPipeline {
    tracker: TransitionTracker,
    store: Arc<dyn LocationStore>,
    publisher: Arc<dyn EventPublisher>,
    config: Config,
    metrics: Arc<Metrics>,
}

impl IngestionPipeline {
    pub fn new(
        config: Config,
        store: Arc<dyn LocationStore>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            tracker: TransitionTracker::new(config.alert_policy()),
            store,
            publisher,
            config,
            metrics,
        }
    }

    /// Process one sample to completion: validate, persist, evaluate each
    /// configured zone, publish the resulting events.
    ///
    /// Returns Ok once the sample is durably stored, regardless of publish
    /// outcome. Validation and storage failures abort the sample with no
    /// further side effects.
    pub async fn ingest(&mut self, sample: PositionSample) -> Result<IngestReport, IngestError> {
        if let Err(e) = validate(&sample) {
            self.metrics.record_sample_rejected();
            return Err(IngestError::Validation(e));
        }

        if let Err(e) = self.persist(&sample).await {
            self.metrics.record_storage_error();
            return Err(IngestError::Storage(e));
        }
        self.metrics.record_sample_persisted();

        let mut report = IngestReport::default();
        let point = sample.point();
        for zone in self.config.zones() {
            if let Some(event) =
                self.tracker.evaluate(&sample.vehicle_id, zone, point, sample.timestamp)
            {
                self.metrics.record_transition(event.kind == TransitionKind::Entered);
                report.events.push(event);
            }
        }

        for event in &report.events {
            if !self.publish_with_retry(event).await {
                report.publish_failed += 1;
            }
        }

        Ok(report)
    }

    /// Append with a bounded timeout so a stalled store cannot wedge the shard
    async fn persist(&self, sample: &PositionSample) -> Result<(), StorageError> {
        let timeout = Duration::from_millis(self.config.append_timeout_ms());
        match tokio::time::timeout(timeout, self.store.append(sample)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout),
        }
    }

    /// Publish one event with bounded attempts and linear backoff.
    /// Returns true on delivery, false once the budget is exhausted.
    async fn publish_with_retry(&self, event: &TransitionEvent) -> bool {
        let attempts = self.config.publish_attempts().max(1);
        let backoff = Duration::from_millis(self.config.publish_backoff_ms());

        for attempt in 1..=attempts {
            match self.publisher.publish(event).await {
                Ok(()) => {
                    self.metrics.record_alert_published();
                    info!(
                        vehicle_id = %event.vehicle_id,
                        zone_id = %event.zone_id,
                        event = %event.kind,
                        timestamp = %event.timestamp,
                        "alert_published"
                    );
                    return true;
                }
                Err(e) if attempt < attempts => {
                    self.metrics.record_publish_retry();
                    warn!(
                        vehicle_id = %event.vehicle_id,
                        zone_id = %event.zone_id,
                        attempt = %attempt,
                        error = %e,
                        "alert_publish_retry"
                    );
                    tokio::time::sleep(backoff * attempt).await;
                }
                Err(e) => {
                    self.metrics.record_publish_failure();
                    error!(
                        vehicle_id = %event.vehicle_id,
                        zone_id = %event.zone_id,
                        attempts = %attempts,
                        error = %e,
                        "alert_publish_failed"
                    );
                }
            }
        }
        false
    }

    /// Drop containment state for pairs past the inactivity window
    pub fn prune_containment(&mut self) {
        let ttl = Duration::from_secs(self.config.containment_ttl_secs());
        let removed = self.tracker.prune_inactive(ttl);
        if removed > 0 {
            info!(removed = %removed, remaining = %self.tracker.tracked_pairs(), "containment_pruned");
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_pairs(&self) -> usize {
        self.tracker.tracked_pairs()
    }
}

fn validate(sample: &PositionSample) -> Result<(), ValidationError> {
    if sample.vehicle_id.is_empty() {
        return Err(ValidationError::EmptyVehicleId);
    }
    if sample.timestamp <= 0 {
        return Err(ValidationError::NonPositiveTimestamp);
    }
    Ok(())
}
