//! Alert publisher - delivers geofence transition events over MQTT
//!
//! Delivery intent is at-least-once: the pipeline retries a failed publish
//! up to a bounded attempt count, and a lost alert never aborts ingestion of
//! the sample that produced it.

use crate::domain::types::{AlertPayload, TransitionEvent};
use crate::infra::config::Config;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Alert delivery failure. Retryable; never fatal to sample processing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("alert encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("mqtt publish: {0}")]
    Mqtt(String),
    #[error("publish timed out")]
    Timeout,
}

/// Downstream delivery of transition events
///
/// Fields must reach the transport verbatim; events for the same
/// (vehicle, zone) pair are handed over in the order the tracker produced
/// them.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &TransitionEvent) -> Result<(), PublishError>;
}

/// MQTT alert publisher backed by rumqttc
pub struct MqttEventPublisher {
    client: AsyncClient,
    topic: String,
    timeout: Duration,
}

impl MqttEventPublisher {
    /// Create the publisher and spawn its connection eventloop.
    ///
    /// rumqttc reconnects on poll, so transient broker unavailability only
    /// delays delivery; it does not tear the publisher down.
    pub fn new(config: &Config) -> Self {
        let client_id = format!("fleet-alerts-{}", std::process::id());
        let mut mqttoptions = MqttOptions::new(client_id, config.mqtt_host(), config.mqtt_port());
        mqttoptions.set_keep_alive(Duration::from_secs(30));
        mqttoptions.set_clean_session(true);

        if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
            mqttoptions.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("alert_publisher_connected");
                    }
                    Ok(Event::Incoming(Packet::PubAck(_))) => {
                        debug!("alert_publisher_puback");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "alert_publisher_connection_error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self {
            client,
            topic: config.alerts_topic().to_string(),
            timeout: Duration::from_millis(config.publish_timeout_ms()),
        }
    }
}

#[async_trait]
impl EventPublisher for MqttEventPublisher {
    async fn publish(&self, event: &TransitionEvent) -> Result<(), PublishError> {
        let json = serde_json::to_string(&AlertPayload::from(event))?;

        // QoS 1 for at-least-once handoff to the broker; bounded so a stalled
        // connection cannot block the shard worker
        let send = self.client.publish(&self.topic, QoS::AtLeastOnce, false, json.into_bytes());
        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PublishError::Mqtt(e.to_string())),
            Err(_) => Err(PublishError::Timeout),
        }
    }
}
