//! MQTT client for receiving vehicle position reports
//!
//! Subscribes to the location topic filter (`fleet/vehicle/+/location`),
//! parses each payload into a `PositionSample` and routes it to the shard
//! workers. Malformed payloads are dropped with a logged warning and never
//! reach the pipeline.

use crate::domain::types::{LocationPayload, PositionSample, VehicleId};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::router::{IngestSender, RouteError};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Start the MQTT client and route parsed samples to the shard workers
///
/// Samples are handed over with try_send to avoid blocking the MQTT
/// eventloop; drops are counted in metrics and logged (rate-limited).
pub async fn start_mqtt_client(
    config: &Config,
    ingest: IngestSender,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut mqttoptions =
        MqttOptions::new("fleet-gateway", config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));

    if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
        mqttoptions.set_credentials(username, password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);
    client.subscribe(config.mqtt_topic(), QoS::AtMostOnce).await?;

    info!(
        topic = %config.mqtt_topic(),
        host = %config.mqtt_host(),
        port = %config.mqtt_port(),
        "MQTT client subscribed"
    );

    // Rate-limit drop warnings to 1 per second
    let mut last_drop_warn = Instant::now() - Duration::from_secs(2);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mqtt_shutdown");
                    return Ok(());
                }
            }
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let Some(sample) = parse_location_message(&publish.topic, &publish.payload)
                        else {
                            metrics.record_sample_rejected();
                            continue;
                        };

                        debug!(
                            vehicle_id = %sample.vehicle_id,
                            timestamp = %sample.timestamp,
                            "sample_received"
                        );
                        metrics.record_sample_received();

                        match ingest.try_send(sample) {
                            Ok(()) => {}
                            Err(RouteError::Full) => {
                                metrics.record_sample_dropped();
                                if last_drop_warn.elapsed() > Duration::from_secs(1) {
                                    warn!("sample_dropped: shard channel full");
                                    last_drop_warn = Instant::now();
                                }
                            }
                            Err(RouteError::Closed) => {
                                warn!("Shard channels closed");
                                return Ok(());
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

/// Parse an inbound location message into a sample
///
/// The vehicle id comes from the payload when present, otherwise from the
/// topic segment after `vehicle`. Returns None (with a logged warning) for
/// payloads the pipeline should never see.
pub fn parse_location_message(topic: &str, payload: &[u8]) -> Option<PositionSample> {
    let json_str = match std::str::from_utf8(payload) {
        Ok(s) => s,
        Err(e) => {
            warn!(topic = %topic, error = %e, "Invalid UTF-8 in MQTT payload");
            return None;
        }
    };

    let parsed: LocationPayload = match serde_json::from_str(json_str) {
        Ok(p) => p,
        Err(e) => {
            warn!(topic = %topic, error = %e, "Invalid location payload");
            return None;
        }
    };

    let vehicle_id = match parsed.vehicle_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => match vehicle_id_from_topic(topic) {
            Some(id) => id.to_string(),
            None => {
                warn!(topic = %topic, "No vehicle id in payload or topic");
                return None;
            }
        },
    };

    Some(PositionSample {
        vehicle_id: VehicleId(vehicle_id),
        latitude: parsed.latitude,
        longitude: parsed.longitude,
        timestamp: parsed.timestamp,
    })
}

/// Extract the vehicle id from a topic of the form `.../vehicle/{id}/location`
fn vehicle_id_from_topic(topic: &str) -> Option<&str> {
    let segments: Vec<&str> = topic.split('/').filter(|s| !s.is_empty()).collect();
    let idx = segments.iter().position(|s| *s == "vehicle")?;
    match (segments.get(idx + 1), segments.get(idx + 2)) {
        (Some(id), Some(&"location")) if !id.is_empty() => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let payload = br#"{"vehicle_id":"B1234XYZ","latitude":-6.2088,"longitude":106.8456,"timestamp":1700000000}"#;
        let sample = parse_location_message("fleet/vehicle/B1234XYZ/location", payload).unwrap();
        assert_eq!(sample.vehicle_id, VehicleId::from("B1234XYZ"));
        assert_eq!(sample.latitude, -6.2088);
        assert_eq!(sample.timestamp, 1700000000);
    }

    #[test]
    fn test_vehicle_id_from_topic_when_missing() {
        let payload = br#"{"latitude":-6.2,"longitude":106.8,"timestamp":10}"#;
        let sample = parse_location_message("fleet/vehicle/B5678ABC/location", payload).unwrap();
        assert_eq!(sample.vehicle_id, VehicleId::from("B5678ABC"));
    }

    #[test]
    fn test_vehicle_id_from_topic_when_empty() {
        let payload = br#"{"vehicle_id":"","latitude":-6.2,"longitude":106.8,"timestamp":10}"#;
        let sample = parse_location_message("/fleet/vehicle/B9XYZ/location", payload).unwrap();
        assert_eq!(sample.vehicle_id, VehicleId::from("B9XYZ"));
    }

    #[test]
    fn test_payload_id_wins_over_topic() {
        let payload = br#"{"vehicle_id":"FROM_PAYLOAD","latitude":0.0,"longitude":0.0,"timestamp":1}"#;
        let sample = parse_location_message("fleet/vehicle/FROM_TOPIC/location", payload).unwrap();
        assert_eq!(sample.vehicle_id, VehicleId::from("FROM_PAYLOAD"));
    }

    #[test]
    fn test_invalid_json_is_dropped() {
        assert!(parse_location_message("fleet/vehicle/X/location", b"not json").is_none());
    }

    #[test]
    fn test_no_vehicle_id_anywhere_is_dropped() {
        let payload = br#"{"latitude":-6.2,"longitude":106.8,"timestamp":10}"#;
        assert!(parse_location_message("some/other/topic", payload).is_none());
    }

    #[test]
    fn test_topic_extraction() {
        assert_eq!(vehicle_id_from_topic("fleet/vehicle/B1/location"), Some("B1"));
        assert_eq!(vehicle_id_from_topic("/fleet/vehicle/B1/location"), Some("B1"));
        assert_eq!(vehicle_id_from_topic("fleet/vehicle/B1/telemetry"), None);
        assert_eq!(vehicle_id_from_topic("fleet/vehicle"), None);
    }
}
