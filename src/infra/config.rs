//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! All values are loaded once at startup and immutable thereafter.

use crate::domain::types::Zone;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// When an alert event is fired for a zone
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Fire only when the containment state changes (default). Guarantees at
    /// most one entry alert per continuous dwell inside a zone.
    OnTransition,
    /// Fire an entry alert on every sample inside the zone. Matches the
    /// legacy repeat-while-inside behavior some downstream consumers expect.
    EveryInsideSample,
}

/// Which backing store holds the location log
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Jsonl,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_location_topic")]
    pub topic: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_location_topic() -> String {
    "fleet/vehicle/+/location".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default = "default_alerts_topic")]
    pub topic: String,
    #[serde(default = "default_alert_policy")]
    pub policy: AlertPolicy,
    /// Bounded publish attempts per alert before giving up
    #[serde(default = "default_publish_attempts")]
    pub publish_attempts: u32,
    /// Base backoff between attempts; grows linearly per attempt
    #[serde(default = "default_publish_backoff_ms")]
    pub publish_backoff_ms: u64,
    /// Per-attempt timeout for the broker handoff
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

fn default_alerts_topic() -> String {
    "fleet/alerts/geofence".to_string()
}

fn default_alert_policy() -> AlertPolicy {
    AlertPolicy::OnTransition
}

fn default_publish_attempts() -> u32 {
    3
}

fn default_publish_backoff_ms() -> u64 {
    500
}

fn default_publish_timeout_ms() -> u64 {
    2000
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            topic: default_alerts_topic(),
            policy: default_alert_policy(),
            publish_attempts: default_publish_attempts(),
            publish_backoff_ms: default_publish_backoff_ms(),
            publish_timeout_ms: default_publish_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_mode")]
    pub mode: StorageMode,
    /// File path for the JSONL location log
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Timeout for a single append before the sample is aborted
    #[serde(default = "default_append_timeout_ms")]
    pub append_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: default_storage_mode(),
            path: default_storage_path(),
            append_timeout_ms: default_append_timeout_ms(),
        }
    }
}

fn default_storage_mode() -> StorageMode {
    StorageMode::Jsonl
}

fn default_storage_path() -> String {
    "data/locations.jsonl".to_string()
}

fn default_append_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Number of shard workers; all samples for a vehicle land on one shard
    #[serde(default = "default_shards")]
    pub shards: usize,
    /// Per-shard channel capacity (backpressure bound)
    #[serde(default = "default_buffer")]
    pub buffer: usize,
    /// Containment state for a (vehicle, zone) pair is dropped after this
    /// many seconds without a sample
    #[serde(default = "default_containment_ttl_secs")]
    pub containment_ttl_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            shards: default_shards(),
            buffer: default_buffer(),
            containment_ttl_secs: default_containment_ttl_secs(),
        }
    }
}

fn default_shards() -> usize {
    4
}

fn default_buffer() -> usize {
    1000
}

fn default_containment_ttl_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_broker_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
}

fn default_broker_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_broker_bind_address(),
            port: default_broker_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default = "default_zones")]
    pub zones: Vec<Zone>,
}

fn default_zones() -> Vec<Zone> {
    vec![Zone {
        id: "depot-jakarta".to_string(),
        latitude: -6.2088,
        longitude: 106.8456,
        radius_m: 50.0,
    }]
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_topic: String,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    alerts_topic: String,
    alert_policy: AlertPolicy,
    publish_attempts: u32,
    publish_backoff_ms: u64,
    publish_timeout_ms: u64,
    storage_mode: StorageMode,
    storage_path: String,
    append_timeout_ms: u64,
    shards: usize,
    ingest_buffer: usize,
    containment_ttl_secs: u64,
    metrics_interval_secs: u64,
    broker_enabled: bool,
    broker_bind_address: String,
    broker_port: u16,
    zones: Vec<Zone>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt_host: "localhost".to_string(),
            mqtt_port: 1883,
            mqtt_topic: default_location_topic(),
            mqtt_username: None,
            mqtt_password: None,
            alerts_topic: default_alerts_topic(),
            alert_policy: AlertPolicy::OnTransition,
            publish_attempts: default_publish_attempts(),
            publish_backoff_ms: default_publish_backoff_ms(),
            publish_timeout_ms: default_publish_timeout_ms(),
            storage_mode: StorageMode::Jsonl,
            storage_path: default_storage_path(),
            append_timeout_ms: default_append_timeout_ms(),
            shards: default_shards(),
            ingest_buffer: default_buffer(),
            containment_ttl_secs: default_containment_ttl_secs(),
            metrics_interval_secs: default_metrics_interval(),
            broker_enabled: false,
            broker_bind_address: default_broker_bind_address(),
            broker_port: default_broker_port(),
            zones: default_zones(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from environment, falling back to the default
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            mqtt_host: toml_config.mqtt.host,
            mqtt_port: toml_config.mqtt.port,
            mqtt_topic: toml_config.mqtt.topic,
            mqtt_username: toml_config.mqtt.username,
            mqtt_password: toml_config.mqtt.password,
            alerts_topic: toml_config.alerts.topic,
            alert_policy: toml_config.alerts.policy,
            publish_attempts: toml_config.alerts.publish_attempts,
            publish_backoff_ms: toml_config.alerts.publish_backoff_ms,
            publish_timeout_ms: toml_config.alerts.publish_timeout_ms,
            storage_mode: toml_config.storage.mode,
            storage_path: toml_config.storage.path,
            append_timeout_ms: toml_config.storage.append_timeout_ms,
            shards: toml_config.ingest.shards.max(1),
            ingest_buffer: toml_config.ingest.buffer,
            containment_ttl_secs: toml_config.ingest.containment_ttl_secs,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            broker_enabled: toml_config.broker.enabled,
            broker_bind_address: toml_config.broker.bind_address,
            broker_port: toml_config.broker.port,
            zones: toml_config.zones,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load(cli_path: Option<&str>) -> Self {
        let config_path = Self::resolve_config_path(cli_path);

        match Self::from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_topic(&self) -> &str {
        &self.mqtt_topic
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn alerts_topic(&self) -> &str {
        &self.alerts_topic
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        self.alert_policy
    }

    pub fn publish_attempts(&self) -> u32 {
        self.publish_attempts
    }

    pub fn publish_backoff_ms(&self) -> u64 {
        self.publish_backoff_ms
    }

    pub fn publish_timeout_ms(&self) -> u64 {
        self.publish_timeout_ms
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn append_timeout_ms(&self) -> u64 {
        self.append_timeout_ms
    }

    pub fn shards(&self) -> usize {
        self.shards
    }

    pub fn ingest_buffer(&self) -> usize {
        self.ingest_buffer
    }

    pub fn containment_ttl_secs(&self) -> u64 {
        self.containment_ttl_secs
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn broker_enabled(&self) -> bool {
        self.broker_enabled
    }

    pub fn broker_bind_address(&self) -> &str {
        &self.broker_bind_address
    }

    pub fn broker_port(&self) -> u16 {
        self.broker_port
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests and embedders to set the zone list
    pub fn with_zones(mut self, zones: Vec<Zone>) -> Self {
        self.zones = zones;
        self
    }

    /// Builder method for tests and embedders to set the alert policy
    pub fn with_alert_policy(mut self, policy: AlertPolicy) -> Self {
        self.alert_policy = policy;
        self
    }

    /// Builder method for tests and embedders to set publish retry bounds
    pub fn with_publish_retry(mut self, attempts: u32, backoff_ms: u64) -> Self {
        self.publish_attempts = attempts;
        self.publish_backoff_ms = backoff_ms;
        self
    }

    /// Builder method for tests and embedders to bound the store append
    pub fn with_append_timeout(mut self, timeout_ms: u64) -> Self {
        self.append_timeout_ms = timeout_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt_host(), "localhost");
        assert_eq!(config.mqtt_port(), 1883);
        assert_eq!(config.mqtt_topic(), "fleet/vehicle/+/location");
        assert_eq!(config.alerts_topic(), "fleet/alerts/geofence");
        assert_eq!(config.alert_policy(), AlertPolicy::OnTransition);
        assert_eq!(config.publish_attempts(), 3);
        assert_eq!(config.shards(), 4);
    }

    #[test]
    fn test_default_zone() {
        let config = Config::default();
        assert_eq!(config.zones().len(), 1);
        let zone = &config.zones()[0];
        assert_eq!(zone.id, "depot-jakarta");
        assert_eq!(zone.radius_m, 50.0);
    }

    #[test]
    fn test_resolve_config_path_default() {
        std::env::remove_var("CONFIG_FILE");
        assert_eq!(Config::resolve_config_path(None), "config/dev.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        assert_eq!(
            Config::resolve_config_path(Some("config/prod.toml")),
            "config/prod.toml"
        );
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [mqtt]
            host = "broker"
            port = 1884
            "#,
        )
        .unwrap();
        assert_eq!(toml_config.mqtt.host, "broker");
        assert_eq!(toml_config.alerts.topic, "fleet/alerts/geofence");
        assert_eq!(toml_config.zones.len(), 1);
    }

    #[test]
    fn test_parse_alert_policy() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [mqtt]
            host = "broker"
            port = 1883

            [alerts]
            policy = "every_inside_sample"
            "#,
        )
        .unwrap();
        assert_eq!(toml_config.alerts.policy, AlertPolicy::EveryInsideSample);
    }
}
