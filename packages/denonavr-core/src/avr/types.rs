//! Domain types for receiver zones and the all-zone-stereo group.

use std::collections::BTreeSet;

use serde::Serialize;

/// Zone number as used on the wire. Zone 1 is the main zone.
pub type ZoneNumber = u32;

/// Cached power state of one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    /// Zone number (1-based, stable for the client's lifetime).
    pub zone_number: ZoneNumber,
    /// Whether the zone was powered on at the last successful poll.
    pub power_on: bool,
}

impl ZoneState {
    /// Creates a zone in standby, as zones are first seen.
    #[must_use]
    pub fn new(zone_number: ZoneNumber) -> Self {
        Self {
            zone_number,
            power_on: false,
        }
    }
}

/// All-zone-stereo state: main zone audio duplicated to a set of zones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StereoGroupState {
    /// Whether all-zone-stereo is active.
    pub enabled: bool,
    /// Zones flagged as members (never zone 1).
    pub member_zones: BTreeSet<ZoneNumber>,
}

/// One parsed status document, not yet applied to any state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Power flag per reported zone, in document order (index 0 is zone 1).
    pub zone_power: Vec<bool>,
    /// Stereo group as reported.
    pub stereo_group: StereoGroupState,
}

/// Point-in-time copy of a receiver's cached state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverSnapshot {
    /// Known zones, ordered by zone number.
    pub zones: Vec<ZoneState>,
    /// All-zone-stereo group.
    pub stereo_group: StereoGroupState,
}

impl ReceiverSnapshot {
    /// Returns the state of a zone if it is known.
    #[must_use]
    pub fn zone(&self, zone_number: ZoneNumber) -> Option<&ZoneState> {
        let index = usize::try_from(zone_number).ok()?.checked_sub(1)?;
        self.zones.get(index)
    }
}
