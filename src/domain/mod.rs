//! Domain models - core business types and geofence geometry
//!
//! This module contains the canonical data types used throughout the system:
//! - `PositionSample` - one reported position observation for a vehicle
//! - `Zone` - a named circular geofence region
//! - `TransitionEvent` - a containment change for a (vehicle, zone) pair
//! - geometry helpers (haversine distance, containment test)

pub mod geo;
pub mod types;
