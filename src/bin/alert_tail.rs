//! Alert consumer for local testing
//!
//! Subscribes to the geofence alert topic and logs each decoded alert, the
//! way a downstream dispatch worker would.

use clap::Parser;
use fleet_gateway::domain::types::AlertPayload;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Tails geofence alerts from the broker
#[derive(Parser, Debug)]
#[command(name = "alert-tail", version, about)]
struct Args {
    /// MQTT broker host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// Alert topic to subscribe to
    #[arg(long, default_value = "fleet/alerts/geofence")]
    topic: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let client_id = format!("alert-tail-{}", std::process::id());
    let mut mqttoptions = MqttOptions::new(client_id, &args.host, args.port);
    mqttoptions.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 10);
    client.subscribe(&args.topic, QoS::AtLeastOnce).await?;

    info!(topic = %args.topic, host = %args.host, "alert-tail listening");

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match serde_json::from_slice::<AlertPayload>(&publish.payload) {
                    Ok(alert) => {
                        info!(
                            vehicle_id = %alert.vehicle_id,
                            zone_id = %alert.zone_id,
                            event = %alert.event,
                            latitude = %format!("{:.6}", alert.location.latitude),
                            longitude = %format!("{:.6}", alert.location.longitude),
                            timestamp = %alert.timestamp,
                            "geofence_alert"
                        );
                    }
                    Err(e) => warn!(error = %e, "invalid_alert_payload"),
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("connected");
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "mqtt_error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}
