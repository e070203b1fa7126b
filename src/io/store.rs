//! Location store - durable append-only log of position samples
//!
//! The pipeline only requires the narrow `LocationStore` contract; the
//! backing technology is a collaborator concern. Two implementations are
//! provided: `MemoryStore` for tests and ephemeral deployments, and the
//! file-backed store in `jsonl_store`.

use crate::domain::types::{PositionSample, VehicleId};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Persistence failure. Aborts the sample that triggered it; never fatal to
/// the ingestion loop.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("append timed out")]
    Timeout,
}

/// Append-only log of position samples, queryable by vehicle and time range
///
/// `append` is synchronously durable: once it returns Ok the sample is
/// visible to `latest` and `range`. Implementations must be safe for
/// concurrent use from multiple shard workers.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn append(&self, sample: &PositionSample) -> Result<(), StorageError>;

    /// The sample with the greatest timestamp for the vehicle, if any
    async fn latest(&self, vehicle: &VehicleId) -> Result<Option<PositionSample>, StorageError>;

    /// Samples with `start <= timestamp <= end`, ascending by timestamp.
    /// Empty result is not an error.
    async fn range(
        &self,
        vehicle: &VehicleId,
        start: i64,
        end: i64,
    ) -> Result<Vec<PositionSample>, StorageError>;
}

/// Per-vehicle logs kept sorted by timestamp for range queries
#[derive(Default)]
pub(crate) struct VehicleLogs {
    logs: FxHashMap<VehicleId, Vec<PositionSample>>,
}

impl VehicleLogs {
    pub(crate) fn insert(&mut self, sample: PositionSample) {
        let log = self.logs.entry(sample.vehicle_id.clone()).or_default();
        // Samples usually arrive in timestamp order; partition_point keeps
        // the log sorted when they do not
        let idx = log.partition_point(|s| s.timestamp <= sample.timestamp);
        log.insert(idx, sample);
    }

    pub(crate) fn latest(&self, vehicle: &VehicleId) -> Option<PositionSample> {
        self.logs.get(vehicle).and_then(|log| log.last().cloned())
    }

    pub(crate) fn range(&self, vehicle: &VehicleId, start: i64, end: i64) -> Vec<PositionSample> {
        if start > end {
            return Vec::new();
        }
        let Some(log) = self.logs.get(vehicle) else {
            return Vec::new();
        };
        let lo = log.partition_point(|s| s.timestamp < start);
        let hi = log.partition_point(|s| s.timestamp <= end);
        log[lo..hi].to_vec()
    }
}

/// In-memory location store
pub struct MemoryStore {
    inner: RwLock<VehicleLogs>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { inner: RwLock::new(VehicleLogs::default()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn append(&self, sample: &PositionSample) -> Result<(), StorageError> {
        self.inner.write().insert(sample.clone());
        Ok(())
    }

    async fn latest(&self, vehicle: &VehicleId) -> Result<Option<PositionSample>, StorageError> {
        Ok(self.inner.read().latest(vehicle))
    }

    async fn range(
        &self,
        vehicle: &VehicleId,
        start: i64,
        end: i64,
    ) -> Result<Vec<PositionSample>, StorageError> {
        Ok(self.inner.read().range(vehicle, start, end))
    }
}
