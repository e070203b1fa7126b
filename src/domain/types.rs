//! Shared types for the fleet gateway

use serde::{Deserialize, Serialize};

/// Newtype wrapper for vehicle identifiers to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(s: &str) -> Self {
        VehicleId(s.to_string())
    }
}

/// A WGS-84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A named circular geofence zone, configured at startup and immutable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

impl Zone {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// One reported position-and-timestamp observation for a vehicle
///
/// Wire shape matches the inbound MQTT payload:
/// `{"vehicle_id": "...", "latitude": .., "longitude": .., "timestamp": ..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub vehicle_id: VehicleId,
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch seconds. Monotonicity per vehicle is not guaranteed.
    pub timestamp: i64,
}

impl PositionSample {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Inbound payload before the vehicle id has been resolved
///
/// `vehicle_id` may be absent or empty, in which case it is derived from the
/// topic segment `fleet/vehicle/{id}/location`.
#[derive(Debug, Deserialize)]
pub struct LocationPayload {
    #[serde(default)]
    pub vehicle_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
}

/// Direction of a geofence boundary crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Entered,
    Exited,
}

impl TransitionKind {
    /// Wire name used in the alert payload `event` field
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Entered => "geofence_entry",
            TransitionKind::Exited => "geofence_exit",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A containment change for a (vehicle, zone) pair
///
/// Created by the transition tracker, handed to the publisher and then
/// discarded; alerts are not persisted by this process.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionEvent {
    pub vehicle_id: VehicleId,
    pub zone_id: String,
    pub kind: TransitionKind,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
}

/// Alert payload as published to the outbound topic
///
/// `{"vehicle_id", "event": "geofence_entry"|"geofence_exit",
///   "location": {"latitude", "longitude"}, "timestamp"}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub vehicle_id: String,
    pub zone_id: String,
    pub event: String,
    pub location: AlertLocation,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&TransitionEvent> for AlertPayload {
    fn from(event: &TransitionEvent) -> Self {
        Self {
            vehicle_id: event.vehicle_id.0.clone(),
            zone_id: event.zone_id.clone(),
            event: event.kind.as_str().to_string(),
            location: AlertLocation { latitude: event.latitude, longitude: event.longitude },
            timestamp: event.timestamp,
        }
    }
}
