//! Per-(vehicle, zone) containment state and transition detection
//!
//! The tracker converts a containment result for a new sample into zero or
//! one transition events, based on the prior state for the same pair. It is
//! the only owner of containment state; callers must serialize evaluations
//! for the same pair (the shard router guarantees this by routing all
//! samples for a vehicle to one worker).

use crate::domain::types::{GeoPoint, TransitionEvent, TransitionKind, VehicleId, Zone};
use crate::infra::config::AlertPolicy;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    vehicle: VehicleId,
    zone: String,
}

#[derive(Debug)]
struct ContainmentState {
    inside: bool,
    last_seen: Instant,
}

/// Tracks containment per (vehicle, zone) pair and emits transitions
pub struct TransitionTracker {
    states: FxHashMap<PairKey, ContainmentState>,
    policy: AlertPolicy,
}

impl TransitionTracker {
    pub fn new(policy: AlertPolicy) -> Self {
        Self { states: FxHashMap::default(), policy }
    }

    /// Evaluate one sample against one zone
    ///
    /// First observation for a pair establishes the baseline and never fires
    /// (there is no prior state to transition from). After that, an event
    /// fires only when containment changes: at most one `entered` per
    /// continuous dwell, with a matching `exited` when the vehicle leaves.
    ///
    /// Under `AlertPolicy::EveryInsideSample` the legacy behavior applies
    /// instead: an entry alert on every sample inside the zone, no exit
    /// alerts. State is still maintained so switching policies is safe.
    pub fn evaluate(
        &mut self,
        vehicle: &VehicleId,
        zone: &Zone,
        point: GeoPoint,
        timestamp: i64,
    ) -> Option<TransitionEvent> {
        let now_inside = zone.contains(point);
        let key = PairKey { vehicle: vehicle.clone(), zone: zone.id.clone() };

        let transition = match self.states.get_mut(&key) {
            None => {
                self.states.insert(
                    key,
                    ContainmentState { inside: now_inside, last_seen: Instant::now() },
                );
                debug!(
                    vehicle_id = %vehicle,
                    zone_id = %zone.id,
                    inside = %now_inside,
                    "containment_baseline"
                );
                None
            }
            Some(state) => {
                state.last_seen = Instant::now();
                if state.inside == now_inside {
                    None
                } else {
                    state.inside = now_inside;
                    Some(if now_inside {
                        TransitionKind::Entered
                    } else {
                        TransitionKind::Exited
                    })
                }
            }
        };

        let kind = match self.policy {
            AlertPolicy::OnTransition => transition?,
            AlertPolicy::EveryInsideSample => {
                if now_inside {
                    TransitionKind::Entered
                } else {
                    return None;
                }
            }
        };

        Some(TransitionEvent {
            vehicle_id: vehicle.clone(),
            zone_id: zone.id.clone(),
            kind,
            latitude: point.latitude,
            longitude: point.longitude,
            timestamp,
        })
    }

    /// Drop pairs not observed within the inactivity window. Returns the
    /// number of pairs removed.
    ///
    /// A pruned pair behaves like a brand new one: the next sample
    /// re-establishes the baseline without firing.
    pub fn prune_inactive(&mut self, ttl: Duration) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| state.last_seen.elapsed() < ttl);
        before - self.states.len()
    }

    /// Number of (vehicle, zone) pairs currently tracked
    pub fn tracked_pairs(&self) -> usize {
        self.states.len()
    }
}
