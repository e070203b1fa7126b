//! Fleet gateway - location ingestion and geofence alerting
//!
//! Receives vehicle position reports over MQTT, persists them to an
//! append-only location log, and publishes a geofence alert when a vehicle
//! crosses a configured zone boundary.
//!
//! Module structure:
//! - `domain/` - Core types (PositionSample, Zone, TransitionEvent) and geometry
//! - `io/` - External interfaces (MQTT ingest, alert publisher, location store)
//! - `services/` - Pipeline, transition tracking, shard routing
//! - `infra/` - Infrastructure (Config, Metrics, Broker)

use clap::Parser;
use fleet_gateway::infra::{Config, Metrics, StorageMode};
use fleet_gateway::io::{JsonlStore, LocationStore, MemoryStore, MqttEventPublisher};
use fleet_gateway::services::spawn_ingest_shards;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Fleet gateway - vehicle location ingestion and geofence alerting
#[derive(Parser, Debug)]
#[command(name = "fleet-gateway", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(git_hash = %env!("GIT_HASH"), "fleet-gateway starting");

    let args = Args::parse();
    let config = Config::load(args.config.as_deref());

    info!(
        config_file = %config.config_file(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        mqtt_topic = %config.mqtt_topic(),
        alerts_topic = %config.alerts_topic(),
        alert_policy = ?config.alert_policy(),
        zones = %config.zones().len(),
        shards = %config.shards(),
        storage_mode = ?config.storage_mode(),
        "config_loaded"
    );

    // Start embedded MQTT broker if enabled
    if config.broker_enabled() {
        fleet_gateway::infra::broker::start_embedded_broker(&config);
    }

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());

    // Open the location store
    let store: Arc<dyn LocationStore> = match config.storage_mode() {
        StorageMode::Jsonl => Arc::new(JsonlStore::open(config.storage_path())?),
        StorageMode::Memory => Arc::new(MemoryStore::new()),
    };

    // Alert publisher (connection eventloop spawned internally)
    let publisher = Arc::new(MqttEventPublisher::new(&config));

    // Shard workers own the pipeline state; one vehicle always lands on one shard
    let ingest = spawn_ingest_shards(
        &config,
        store,
        publisher,
        metrics.clone(),
        shutdown_rx.clone(),
    );

    // Start MQTT ingest client
    let mqtt_config = config.clone();
    let mqtt_metrics = metrics.clone();
    let mqtt_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) =
            fleet_gateway::io::mqtt::start_mqtt_client(&mqtt_config, ingest, mqtt_metrics, mqtt_shutdown)
                .await
        {
            tracing::error!(error = %e, "MQTT client error");
        }
    });

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report(metrics_interval).log();
        }
    });

    info!("fleet-gateway started");

    // Block until Ctrl+C, then stop intake; in-flight samples run to completion
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown_signal_received");
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    info!("fleet-gateway shutdown complete");
    Ok(())
}
