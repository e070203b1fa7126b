//! End-to-end ingestion scenarios against the real stores
//!
//! Exercises the full pipeline (validate, persist, evaluate, publish) with
//! an in-process recording publisher, including the reference depot scenario
//! and the file-backed store.

use async_trait::async_trait;
use fleet_gateway::domain::types::{
    PositionSample, TransitionEvent, TransitionKind, VehicleId, Zone,
};
use fleet_gateway::infra::{Config, Metrics};
use fleet_gateway::io::publisher::{EventPublisher, PublishError};
use fleet_gateway::io::{JsonlStore, LocationStore, MemoryStore};
use fleet_gateway::services::IngestionPipeline;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// Publisher that records delivered events and can simulate broker loss
struct RecordingPublisher {
    events: Mutex<Vec<TransitionEvent>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    fn new() -> Self {
        Self { events: Mutex::new(Vec::new()), fail: AtomicBool::new(false) }
    }

    fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &TransitionEvent) -> Result<(), PublishError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Mqtt("connection reset".to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}

fn depot_zone() -> Zone {
    Zone {
        id: "depot-jakarta".to_string(),
        latitude: -6.2088,
        longitude: 106.8456,
        radius_m: 50.0,
    }
}

fn sample(vehicle: &str, latitude: f64, ts: i64) -> PositionSample {
    PositionSample {
        vehicle_id: VehicleId::from(vehicle),
        latitude,
        longitude: 106.8456,
        timestamp: ts,
    }
}

const INSIDE_LAT: f64 = -6.2088;
// ~55m north of the depot center, outside the 50m radius
const OUTSIDE_LAT: f64 = -6.2088 + 0.0005;

fn test_config() -> Config {
    Config::default().with_zones(vec![depot_zone()]).with_publish_retry(1, 0)
}

#[tokio::test]
async fn test_depot_scenario_alerts_and_history() {
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let metrics = Arc::new(Metrics::new());
    let mut pipeline = IngestionPipeline::new(
        test_config(),
        store.clone(),
        publisher.clone(),
        metrics,
    );

    // Baseline outside the zone, then the reference sequence:
    // inside, inside, outside, inside
    let vehicle = "B1234XYZ";
    pipeline.ingest(sample(vehicle, OUTSIDE_LAT, 1)).await.unwrap();
    pipeline.ingest(sample(vehicle, INSIDE_LAT, 2)).await.unwrap();
    pipeline.ingest(sample(vehicle, INSIDE_LAT, 3)).await.unwrap();
    pipeline.ingest(sample(vehicle, OUTSIDE_LAT, 4)).await.unwrap();
    pipeline.ingest(sample(vehicle, INSIDE_LAT, 5)).await.unwrap();

    // Exactly one entered per dwell, with the matching exit in between
    let emitted: Vec<(TransitionKind, i64)> =
        publisher.events().iter().map(|e| (e.kind, e.timestamp)).collect();
    assert_eq!(
        emitted,
        vec![
            (TransitionKind::Entered, 2),
            (TransitionKind::Exited, 4),
            (TransitionKind::Entered, 5),
        ]
    );

    // Every sample was persisted regardless of alert outcome
    let id = VehicleId::from(vehicle);
    let latest = store.latest(&id).await.unwrap().unwrap();
    assert_eq!(latest.timestamp, 5);

    // Inclusive range query returns exactly the middle samples, ascending
    let middle = store.range(&id, 2, 3).await.unwrap();
    let timestamps: Vec<i64> = middle.iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![2, 3]);
}

#[tokio::test]
async fn test_publish_outage_does_not_lose_samples() {
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let metrics = Arc::new(Metrics::new());
    let mut pipeline = IngestionPipeline::new(
        test_config(),
        store.clone(),
        publisher.clone(),
        metrics,
    );

    let vehicle = "B1234XYZ";
    pipeline.ingest(sample(vehicle, OUTSIDE_LAT, 1)).await.unwrap();

    // Broker goes away; the entry alert is lost but ingestion succeeds
    publisher.fail.store(true, Ordering::SeqCst);
    let report = pipeline.ingest(sample(vehicle, INSIDE_LAT, 2)).await.unwrap();
    assert_eq!(report.publish_failed, 1);

    // Broker returns; the next transition is delivered
    publisher.fail.store(false, Ordering::SeqCst);
    pipeline.ingest(sample(vehicle, OUTSIDE_LAT, 3)).await.unwrap();

    let emitted: Vec<TransitionKind> = publisher.events().iter().map(|e| e.kind).collect();
    assert_eq!(emitted, vec![TransitionKind::Exited]);

    // latest/range reflect every persisted sample, including the one whose
    // alert was lost
    let id = VehicleId::from(vehicle);
    let all = store.range(&id, 1, 3).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(store.latest(&id).await.unwrap().unwrap().timestamp, 3);
}

#[tokio::test]
async fn test_pipeline_over_jsonl_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("locations.jsonl");

    let publisher = Arc::new(RecordingPublisher::new());
    let metrics = Arc::new(Metrics::new());
    let vehicle = "B1234XYZ";

    {
        let store = Arc::new(JsonlStore::open(&path).unwrap());
        let mut pipeline = IngestionPipeline::new(
            test_config(),
            store,
            publisher.clone(),
            metrics.clone(),
        );
        pipeline.ingest(sample(vehicle, OUTSIDE_LAT, 1)).await.unwrap();
        pipeline.ingest(sample(vehicle, INSIDE_LAT, 2)).await.unwrap();
    }

    assert_eq!(publisher.events().len(), 1);

    // A fresh process sees the durably stored history
    let reopened = JsonlStore::open(&path).unwrap();
    let id = VehicleId::from(vehicle);
    let history = reopened.range(&id, 1, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(reopened.latest(&id).await.unwrap().unwrap().timestamp, 2);
}

#[tokio::test]
async fn test_two_vehicles_do_not_interfere() {
    let store = Arc::new(MemoryStore::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let metrics = Arc::new(Metrics::new());
    let mut pipeline = IngestionPipeline::new(
        test_config(),
        store.clone(),
        publisher.clone(),
        metrics,
    );

    // Vehicle A dwells inside; vehicle B arrives later
    pipeline.ingest(sample("A1", OUTSIDE_LAT, 1)).await.unwrap();
    pipeline.ingest(sample("A1", INSIDE_LAT, 2)).await.unwrap();
    pipeline.ingest(sample("B2", OUTSIDE_LAT, 2)).await.unwrap();
    pipeline.ingest(sample("B2", INSIDE_LAT, 3)).await.unwrap();
    pipeline.ingest(sample("A1", INSIDE_LAT, 4)).await.unwrap();

    let emitted: Vec<(String, TransitionKind)> = publisher
        .events()
        .iter()
        .map(|e| (e.vehicle_id.to_string(), e.kind))
        .collect();
    assert_eq!(
        emitted,
        vec![
            ("A1".to_string(), TransitionKind::Entered),
            ("B2".to_string(), TransitionKind::Entered),
        ]
    );
}
