//! Integration tests for configuration loading

use fleet_gateway::infra::{AlertPolicy, Config, StorageMode};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[mqtt]
host = "test-host"
port = 1884
topic = "test/vehicle/+/location"
username = "fleet"
password = "secret"

[alerts]
topic = "test/alerts"
policy = "on_transition"
publish_attempts = 5
publish_backoff_ms = 100
publish_timeout_ms = 1500

[storage]
mode = "memory"
path = "/tmp/test.jsonl"
append_timeout_ms = 750

[ingest]
shards = 8
buffer = 500
containment_ttl_secs = 120

[metrics]
interval_secs = 15

[broker]
enabled = true
bind_address = "127.0.0.1"
port = 1893

[[zones]]
id = "depot-a"
latitude = -6.2088
longitude = 106.8456
radius_m = 50.0

[[zones]]
id = "depot-b"
latitude = -6.9175
longitude = 107.6191
radius_m = 120.0
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.mqtt_host(), "test-host");
    assert_eq!(config.mqtt_port(), 1884);
    assert_eq!(config.mqtt_username(), Some("fleet"));
    assert_eq!(config.alerts_topic(), "test/alerts");
    assert_eq!(config.alert_policy(), AlertPolicy::OnTransition);
    assert_eq!(config.publish_attempts(), 5);
    assert_eq!(config.storage_mode(), StorageMode::Memory);
    assert_eq!(config.append_timeout_ms(), 750);
    assert_eq!(config.shards(), 8);
    assert_eq!(config.containment_ttl_secs(), 120);
    assert_eq!(config.metrics_interval_secs(), 15);
    assert!(config.broker_enabled());
    assert_eq!(config.broker_port(), 1893);

    assert_eq!(config.zones().len(), 2);
    assert_eq!(config.zones()[0].id, "depot-a");
    assert_eq!(config.zones()[1].radius_m, 120.0);
}

#[test]
fn test_load_falls_back_to_defaults() {
    let config = Config::load(Some("/nonexistent/path.toml"));
    assert_eq!(config.mqtt_host(), "localhost");
    assert_eq!(config.alerts_topic(), "fleet/alerts/geofence");
    assert_eq!(config.zones().len(), 1);
    assert_eq!(config.zones()[0].id, "depot-jakarta");
}

#[test]
fn test_defaults_fill_missing_sections() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(
            br#"
[mqtt]
host = "broker"
port = 1883
"#,
        )
        .unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();
    assert_eq!(config.mqtt_topic(), "fleet/vehicle/+/location");
    assert_eq!(config.alert_policy(), AlertPolicy::OnTransition);
    assert_eq!(config.storage_mode(), StorageMode::Jsonl);
    assert_eq!(config.publish_attempts(), 3);
    assert!(!config.broker_enabled());
}

#[test]
fn test_invalid_toml_is_an_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"not valid toml [[[").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
