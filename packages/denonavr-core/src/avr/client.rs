//! Receiver client: status polling and raw command transport.
//!
//! [`AvrClient`] is the single point of HTTP interaction with one receiver.
//! It owns the receiver's cached zones and stereo group; consumers read them
//! through snapshots or [`AvrZone`] handles.
//!
//! # Consistency
//!
//! `update()` calls are single-flight per client: a second caller waits for
//! the first to finish. The parsed document is applied under one write lock,
//! so [`AvrClient::snapshot`] always returns the state of exactly one poll.
//! Reading zones one at a time through handles does not give that guarantee
//! across zones; take a snapshot when several values must agree.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::receiver::ReceiverState;
use super::status::parse_status_xml;
use super::transport::{AvrTransport, ReqwestTransport};
use super::types::{ReceiverSnapshot, ZoneNumber, ZoneState};
use super::zone::AvrZone;
use crate::error::{AvrError, AvrResult, ErrorCode};
use crate::events::{EventEmitter, NoopEventEmitter, ReceiverEvent};
use crate::protocol_constants::{
    STATUS_REQUEST, URL_COMMAND, URL_MAIN_POWER_ON, URL_MAIN_POWER_STANDBY,
};
use crate::state::Config;
use crate::utils::{build_base_url, now_millis};

/// Client for one physical receiver.
pub struct AvrClient {
    host: String,
    port: u16,
    base_url: String,
    stereo_first_zone: ZoneNumber,
    transport: Arc<dyn AvrTransport>,
    state: RwLock<ReceiverState>,
    /// Serializes `update()` so parse-and-apply is never interleaved.
    update_lock: Mutex<()>,
    emitter: Arc<dyn EventEmitter>,
}

impl AvrClient {
    /// Creates a client for `host:port` using an HTTP transport with the
    /// configured request timeout.
    ///
    /// # Errors
    /// Returns [`AvrError::Configuration`] if `config` is invalid, or an HTTP
    /// error if the underlying client cannot be built.
    pub fn new(host: impl Into<String>, port: u16, config: &Config) -> AvrResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::with_transport(host, port, Arc::new(transport), config)
    }

    /// Creates a client over an existing transport.
    ///
    /// Use this to share one HTTP connection pool between receivers.
    ///
    /// # Errors
    /// Returns [`AvrError::Configuration`] if `config` is invalid.
    pub fn with_transport(
        host: impl Into<String>,
        port: u16,
        transport: Arc<dyn AvrTransport>,
        config: &Config,
    ) -> AvrResult<Self> {
        config.validate().map_err(AvrError::Configuration)?;
        let host = host.into();
        let base_url = build_base_url(&host, port);
        Ok(Self {
            host,
            port,
            base_url,
            stereo_first_zone: config.stereo_first_zone,
            transport,
            state: RwLock::new(ReceiverState::new()),
            update_lock: Mutex::new(()),
            emitter: Arc::new(NoopEventEmitter),
        })
    }

    /// Sets the emitter notified after every successful update.
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Receiver host name or IP.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Receiver port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL (`http://{host}:{port}`).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────────────────

    /// Polls the receiver and applies the result.
    ///
    /// Sends one status POST, parses the whole document, then updates every
    /// zone and the stereo group in one step. On any failure the cached state
    /// is left exactly as it was.
    ///
    /// # Errors
    /// - [`AvrError::Http`] if the request could not be completed
    /// - [`AvrError::HttpStatus`] if the receiver answered with non-200
    /// - [`AvrError::Parse`] if the document was malformed
    pub async fn update(&self) -> AvrResult<()> {
        let _guard = self.update_lock.lock().await;

        let url = format!("{}{}", self.base_url, URL_COMMAND);
        let reply = self.transport.post_xml(&url, STATUS_REQUEST).await.map_err(|e| {
            log::warn!("[Avr] Status poll to {} failed: {}", self.host, e);
            e
        })?;

        if reply.status != 200 {
            log::warn!(
                "[Avr] Status poll to {} returned HTTP {}",
                self.host,
                reply.status
            );
            return Err(AvrError::HttpStatus(reply.status));
        }

        let report = parse_status_xml(&reply.body, self.stereo_first_zone).map_err(|e| {
            log::warn!("[Avr] Ignoring status from {}: {}", self.host, e);
            e
        })?;

        let (changed, snapshot) = {
            let mut state = self.state.write();
            let changed = state.apply(report);
            (changed, state.snapshot())
        };

        if changed {
            log::info!(
                "[Avr] {} state changed: {} zones, stereo {}",
                self.host,
                snapshot.zones.len(),
                if snapshot.stereo_group.enabled {
                    "on"
                } else {
                    "off"
                }
            );
        } else {
            log::debug!("[Avr] {} state unchanged", self.host);
        }

        self.emitter.emit_receiver(ReceiverEvent::StateUpdated {
            host: self.host.clone(),
            port: self.port,
            snapshot,
            changed,
            timestamp: now_millis(),
        });

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Sends a command GET to `base_url + relative_path`.
    ///
    /// This is a raw transport primitive: it neither parses the response nor
    /// touches cached state. The new state becomes visible only after a
    /// later [`update`](Self::update).
    ///
    /// # Returns
    /// The HTTP status code (always 200 on success).
    ///
    /// # Errors
    /// - [`AvrError::Http`] if the request could not be completed
    /// - [`AvrError::CommandRejected`] if the receiver answered with non-200
    pub async fn issue_command(&self, relative_path: &str) -> AvrResult<u16> {
        let url = format!("{}{}", self.base_url, relative_path);
        log::info!("[Avr] Command {} -> {}", relative_path, self.host);

        let status = self.transport.get(&url).await.map_err(|e| {
            log::warn!(
                "[Avr] Command {} to {} failed ({}): {}",
                relative_path,
                self.host,
                e.code(),
                e
            );
            e
        })?;

        if status != 200 {
            log::warn!(
                "[Avr] Command {} rejected by {} with HTTP {}",
                relative_path,
                self.host,
                status
            );
            return Err(AvrError::CommandRejected(status));
        }

        Ok(status)
    }

    /// Switches the whole receiver on or to standby.
    ///
    /// Like zone commands, this does not change cached state.
    pub async fn set_main_power(&self, on: bool) -> AvrResult<u16> {
        self.issue_command(if on {
            URL_MAIN_POWER_ON
        } else {
            URL_MAIN_POWER_STANDBY
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cached State
    // ─────────────────────────────────────────────────────────────────────────

    /// Handles for every known zone, ordered by zone number.
    #[must_use]
    pub fn zones(self: &Arc<Self>) -> Vec<AvrZone> {
        self.state
            .read()
            .zones()
            .iter()
            .map(|zone| AvrZone::new(zone.zone_number, Arc::clone(self)))
            .collect()
    }

    /// Handle for one zone, if the receiver has reported it.
    #[must_use]
    pub fn zone(self: &Arc<Self>, zone_number: ZoneNumber) -> Option<AvrZone> {
        let known = self.state.read().zone(zone_number).is_some();
        known.then(|| AvrZone::new(zone_number, Arc::clone(self)))
    }

    /// Number of zones ever reported.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.state.read().zone_count()
    }

    /// Cached power state of one zone.
    #[must_use]
    pub fn is_zone_on(&self, zone_number: ZoneNumber) -> Option<bool> {
        self.state.read().zone(zone_number).map(|z| z.power_on)
    }

    /// Cached state of every known zone.
    #[must_use]
    pub fn zone_states(&self) -> Vec<ZoneState> {
        self.state.read().zones().to_vec()
    }

    /// Whether all-zone-stereo was enabled at the last successful poll.
    #[must_use]
    pub fn stereo_group_enabled(&self) -> bool {
        self.state.read().stereo_group().enabled
    }

    /// Zones in the all-zone-stereo group at the last successful poll.
    #[must_use]
    pub fn stereo_group_member_zones(&self) -> BTreeSet<ZoneNumber> {
        self.state.read().stereo_group().member_zones.clone()
    }

    /// Consistent copy of all cached state.
    #[must_use]
    pub fn snapshot(&self) -> ReceiverSnapshot {
        self.state.read().snapshot()
    }
}

impl fmt::Debug for AvrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvrClient")
            .field("base_url", &self.base_url)
            .field("zone_count", &self.zone_count())
            .finish()
    }
}
