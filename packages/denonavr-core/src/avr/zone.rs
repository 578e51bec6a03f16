//! Handle to one zone of a receiver.

use std::fmt;
use std::sync::Arc;

use super::client::AvrClient;
use super::types::ZoneNumber;
use crate::error::AvrResult;
use crate::protocol_constants::{URL_ZONE_POWER_ON, URL_ZONE_POWER_STANDBY};

/// Lightweight handle to a zone.
///
/// Reads come from the client's cache; commands go through the client.
/// Handles stay valid for the client's lifetime because zones are never
/// removed.
#[derive(Clone)]
pub struct AvrZone {
    zone_number: ZoneNumber,
    client: Arc<AvrClient>,
}

impl AvrZone {
    pub(crate) fn new(zone_number: ZoneNumber, client: Arc<AvrClient>) -> Self {
        Self {
            zone_number,
            client,
        }
    }

    /// 1-based zone number.
    #[must_use]
    pub fn zone_number(&self) -> ZoneNumber {
        self.zone_number
    }

    /// Power state at the last successful poll. No I/O.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.client.is_zone_on(self.zone_number).unwrap_or(false)
    }

    /// Sends a power-on or standby command for this zone.
    ///
    /// The cached state is not touched; [`is_on`](Self::is_on) keeps its old
    /// value until the next [`update`](Self::update).
    pub async fn set_power_state(&self, on: bool) -> AvrResult<u16> {
        self.client
            .issue_command(&power_command_path(self.zone_number, on))
            .await
    }

    /// Refreshes the whole receiver; every zone shares one poll.
    pub async fn update(&self) -> AvrResult<()> {
        self.client.update().await
    }

    /// Client owning this zone.
    #[must_use]
    pub fn client(&self) -> &Arc<AvrClient> {
        &self.client
    }
}

impl fmt::Debug for AvrZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvrZone")
            .field("host", &self.client.host())
            .field("zone_number", &self.zone_number)
            .field("is_on", &self.is_on())
            .finish()
    }
}

/// Relative path of a zone power command.
#[must_use]
pub fn power_command_path(zone_number: ZoneNumber, on: bool) -> String {
    let template = if on {
        URL_ZONE_POWER_ON
    } else {
        URL_ZONE_POWER_STANDBY
    };
    template.replace("{zone}", &zone_number.to_string())
}
