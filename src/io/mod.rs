//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `mqtt` - MQTT client for receiving vehicle position reports
//! - `publisher` - MQTT publisher for geofence alert events
//! - `store` - Location store contract and in-memory implementation
//! - `jsonl_store` - File-backed location store (JSONL format)

pub mod jsonl_store;
pub mod mqtt;
pub mod publisher;
pub mod store;

// Re-export commonly used types
pub use jsonl_store::JsonlStore;
pub use publisher::{EventPublisher, MqttEventPublisher, PublishError};
pub use store::{LocationStore, MemoryStore, StorageError};
