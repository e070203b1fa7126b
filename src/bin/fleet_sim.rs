//! Mock vehicle publisher for local testing
//!
//! Drives a vehicle on a deterministic north-south sweep through the zone
//! center so the gateway sees regular boundary crossings in both directions.

use clap::Parser;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Simulated vehicle publishing position reports over MQTT
#[derive(Parser, Debug)]
#[command(name = "fleet-sim", version, about)]
struct Args {
    /// MQTT broker host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// Vehicle identifier
    #[arg(long, default_value = "B1234XYZ")]
    vehicle: String,

    /// Zone center latitude the sweep oscillates around
    #[arg(long, default_value_t = -6.2088)]
    latitude: f64,

    /// Zone center longitude
    #[arg(long, default_value_t = 106.8456)]
    longitude: f64,

    /// Sweep amplitude in degrees of latitude (~111 km per degree)
    #[arg(long, default_value_t = 0.0015)]
    amplitude: f64,

    /// Seconds between reports
    #[arg(long, default_value_t = 2)]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();
    let topic = format!("fleet/vehicle/{}/location", args.vehicle);

    let client_id = format!("fleet-sim-{}", std::process::id());
    let mut mqttoptions = MqttOptions::new(client_id, &args.host, args.port);
    mqttoptions.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 10);

    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                warn!(error = %e, "mqtt_error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    info!(topic = %topic, host = %args.host, port = %args.port, "fleet-sim started");

    let mut interval = tokio::time::interval(Duration::from_secs(args.interval_secs));
    let mut step = 0u64;

    loop {
        interval.tick().await;

        // Full in-out-in cycle every 16 reports
        let phase = (step as f64) * std::f64::consts::TAU / 16.0;
        let latitude = args.latitude + args.amplitude * phase.sin();
        let timestamp =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;

        let payload = json!({
            "vehicle_id": args.vehicle,
            "latitude": latitude,
            "longitude": args.longitude,
            "timestamp": timestamp,
        });

        match client.publish(&topic, QoS::AtMostOnce, false, payload.to_string()).await {
            Ok(()) => {
                info!(latitude = %format!("{:.6}", latitude), timestamp = %timestamp, "published")
            }
            Err(e) => warn!(error = %e, "publish_failed"),
        }

        step += 1;
    }
}
