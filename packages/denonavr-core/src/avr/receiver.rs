//! In-memory model of one receiver.
//!
//! Pure data structure, no I/O. [`AvrClient`](super::AvrClient) keeps it
//! behind a lock and applies each parsed [`StatusReport`] in one step.

use super::types::{ReceiverSnapshot, StatusReport, StereoGroupState, ZoneNumber, ZoneState};

/// Cached zones and stereo group of one receiver.
///
/// Zones are created lazily the first time a poll reports them and are never
/// removed: `zones[i].zone_number == i + 1` always holds, and `zone_count`
/// only grows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceiverState {
    zone_count: usize,
    zones: Vec<ZoneState>,
    stereo_group: StereoGroupState,
}

impl ReceiverState {
    /// Creates a state with no known zones.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of zones ever reported by the receiver.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zone_count
    }

    /// Known zones, ordered by zone number.
    #[must_use]
    pub fn zones(&self) -> &[ZoneState] {
        &self.zones
    }

    /// Returns a zone by number.
    #[must_use]
    pub fn zone(&self, zone_number: ZoneNumber) -> Option<&ZoneState> {
        let index = usize::try_from(zone_number).ok()?.checked_sub(1)?;
        self.zones.get(index)
    }

    /// Current all-zone-stereo group.
    #[must_use]
    pub fn stereo_group(&self) -> &StereoGroupState {
        &self.stereo_group
    }

    /// Applies a parsed status report.
    ///
    /// Grows the zone list to the reported count, assigns power by position
    /// and replaces the stereo group wholesale. A report listing fewer zones
    /// than known leaves the trailing zones at their previous state.
    ///
    /// # Returns
    /// `true` if any zone or the stereo group changed.
    pub fn apply(&mut self, report: StatusReport) -> bool {
        let reported = report.zone_power.len();
        let mut changed = false;

        if reported < self.zone_count {
            log::debug!(
                "[Avr] Receiver reported {} zones, keeping {} known zones",
                reported,
                self.zone_count
            );
        }

        if reported > self.zone_count {
            log::info!(
                "[Avr] Zone count grew from {} to {}",
                self.zone_count,
                reported
            );
            self.zone_count = reported;
            changed = true;
        }

        while self.zones.len() < self.zone_count {
            let next = ZoneNumber::try_from(self.zones.len() + 1).unwrap_or(ZoneNumber::MAX);
            self.zones.push(ZoneState::new(next));
        }

        for (zone, power_on) in self.zones.iter_mut().zip(report.zone_power) {
            if zone.power_on != power_on {
                zone.power_on = power_on;
                changed = true;
            }
        }

        let unknown: Vec<ZoneNumber> = report
            .stereo_group
            .member_zones
            .iter()
            .copied()
            .filter(|zone| self.zone(*zone).is_none())
            .collect();
        if !unknown.is_empty() {
            log::debug!(
                "[Avr] Stereo group lists zones not reported by the receiver: {:?}",
                unknown
            );
        }

        if self.stereo_group != report.stereo_group {
            self.stereo_group = report.stereo_group;
            changed = true;
        }

        changed
    }

    /// Copies the current state.
    #[must_use]
    pub fn snapshot(&self) -> ReceiverSnapshot {
        ReceiverSnapshot {
            zones: self.zones.clone(),
            stereo_group: self.stereo_group.clone(),
        }
    }
}
