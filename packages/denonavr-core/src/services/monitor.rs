//! Receiver polling and command reconciliation.
//!
//! Responsibilities:
//! - Background poll loop with manual refresh
//! - Receiver health tracking
//! - Read-after-write reconciliation for power commands
//!
//! A power command accepted by the receiver does not mean the receiver has
//! switched yet. Each accepted command moves its zones to
//! [`ReconcilePhase::Commanded`]; an independent task then waits the settle
//! delay ([`ReconcilePhase::Settling`]), polls, and returns them to
//! [`ReconcilePhase::Stable`] whether or not that poll succeeded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::avr::{AvrClient, ReceiverSnapshot, ZoneNumber, ZoneState};
use crate::error::{AvrError, AvrResult, ErrorCode};
use crate::events::{CommandEvent, EventEmitter, PowerTarget, ReceiverEvent, ReceiverHealth};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::Config;
use crate::utils::now_millis;

/// Timing used by a [`ReceiverMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverMonitorConfig {
    /// Interval between background polls.
    pub poll_interval: Duration,
    /// Wait between an accepted command and its confirming poll.
    pub settle_delay: Duration,
}

impl From<&Config> for ReceiverMonitorConfig {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
        }
    }
}

impl ReceiverMonitorConfig {
    /// Rejects a zero poll interval.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("poll_interval must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for ReceiverMonitorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Where a zone is in the command/confirm cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReconcilePhase {
    /// Cached state reflects the last successful poll.
    #[default]
    Stable,
    /// A command was accepted; cached state is stale.
    Commanded,
    /// Waiting out the settle delay before re-polling.
    Settling,
}

/// Current receiver health with reason.
#[derive(Debug, Clone, Default)]
pub struct ReceiverHealthState {
    /// Current health status.
    pub health: ReceiverHealth,
    /// Error code of the last failed poll (if unreachable).
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct ZoneReconcile {
    phase: ReconcilePhase,
    /// Command that last moved this zone out of `Stable`.
    generation: u64,
}

/// Polls one receiver and reconciles its state after commands.
pub struct ReceiverMonitor<S: TaskSpawner = TokioSpawner> {
    /// Display name from configuration.
    name: String,
    client: Arc<AvrClient>,
    emitter: Arc<dyn EventEmitter>,
    config: ReceiverMonitorConfig,
    spawner: S,
    health: RwLock<ReceiverHealthState>,
    phases: DashMap<ZoneNumber, ZoneReconcile>,
    next_generation: AtomicU64,
    refresh_notify: Notify,
    /// Stops the poll loop and pending settle tasks.
    cancel_token: CancellationToken,
}

impl ReceiverMonitor<TokioSpawner> {
    /// Creates a monitor spawning onto the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    ///
    /// # Errors
    /// Returns [`AvrError::Configuration`] if `config` is invalid.
    pub fn new(
        name: impl Into<String>,
        client: Arc<AvrClient>,
        emitter: Arc<dyn EventEmitter>,
        config: ReceiverMonitorConfig,
    ) -> AvrResult<Self> {
        Self::with_spawner(name, client, emitter, config, TokioSpawner::current())
    }
}

impl<S: TaskSpawner + 'static> ReceiverMonitor<S> {
    /// Creates a monitor using the given spawner for background tasks.
    ///
    /// # Errors
    /// Returns [`AvrError::Configuration`] if `config` is invalid.
    pub fn with_spawner(
        name: impl Into<String>,
        client: Arc<AvrClient>,
        emitter: Arc<dyn EventEmitter>,
        config: ReceiverMonitorConfig,
        spawner: S,
    ) -> AvrResult<Self> {
        config.validate().map_err(AvrError::Configuration)?;
        Ok(Self {
            name: name.into(),
            client,
            emitter,
            config,
            spawner,
            health: RwLock::new(ReceiverHealthState::default()),
            phases: DashMap::new(),
            next_generation: AtomicU64::new(1),
            refresh_notify: Notify::new(),
            cancel_token: CancellationToken::new(),
        })
    }

    /// Receiver display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Monitored client.
    #[must_use]
    pub fn client(&self) -> &Arc<AvrClient> {
        &self.client
    }

    /// Returns the current health state.
    #[must_use]
    pub fn health(&self) -> ReceiverHealthState {
        self.health.read().clone()
    }

    /// Reconcile phase of a zone. Zones never commanded are `Stable`.
    #[must_use]
    pub fn zone_phase(&self, zone_number: ZoneNumber) -> ReconcilePhase {
        self.phases
            .get(&zone_number)
            .map(|entry| entry.phase)
            .unwrap_or_default()
    }

    /// Updates health and emits an event if it changed.
    fn set_health(&self, health: ReceiverHealth, reason: Option<String>) {
        let mut state = self.health.write();
        if state.health == health {
            return;
        }

        log::info!(
            "[Monitor] {} health changed: {:?} -> {:?}{}",
            self.name,
            state.health,
            health,
            reason
                .as_ref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );
        state.health = health;
        state.reason = reason.clone();

        self.emitter.emit_receiver(ReceiverEvent::HealthChanged {
            host: self.client.host().to_string(),
            port: self.client.port(),
            health,
            reason,
            timestamp: now_millis(),
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs one update and records the receiver's health.
    pub async fn poll(&self) -> AvrResult<()> {
        match self.client.update().await {
            Ok(()) => {
                self.set_health(ReceiverHealth::Reachable, None);
                Ok(())
            }
            Err(e) => {
                self.set_health(ReceiverHealth::Unreachable, Some(e.code().to_string()));
                Err(e)
            }
        }
    }

    /// Requests an immediate poll from the background loop.
    pub fn trigger_refresh(&self) {
        self.refresh_notify.notify_one();
    }

    /// Starts the background poll loop.
    ///
    /// The first automatic poll runs one `poll_interval` after start; call
    /// [`poll`](Self::poll) beforehand for an immediate reading. A manual
    /// refresh polls at once and pushes the next automatic poll back by a
    /// full interval. Runs until [`shutdown`](Self::shutdown).
    pub fn start_monitoring(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        let cancel_token = self.cancel_token.clone();

        self.spawner.spawn(async move {
            let period = monitor.config.poll_interval;
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            log::info!(
                "[Monitor] Polling {} every {:?}",
                monitor.name,
                monitor.config.poll_interval
            );

            loop {
                let is_manual_refresh = tokio::select! {
                    _ = cancel_token.cancelled() => {
                        log::info!("[Monitor] Stopping poll loop for {}", monitor.name);
                        break;
                    }
                    _ = interval.tick() => false,
                    _ = monitor.refresh_notify.notified() => {
                        log::debug!("[Monitor] Manual refresh of {}", monitor.name);
                        true
                    }
                };

                if is_manual_refresh {
                    interval.reset();
                }

                // Failures are logged by the client and tracked as health.
                let _ = monitor.poll().await;
            }
        });
    }

    /// Stops the poll loop and any pending settle refreshes.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Commands one zone and schedules the confirming poll.
    ///
    /// Returns as soon as the receiver has answered the command. Cached state
    /// is unchanged at that point; the settled poll runs in its own task.
    ///
    /// # Errors
    /// - [`AvrError::UnknownZone`] if the receiver has not reported the zone
    /// - any error from the command itself; the zone stays `Stable`
    pub async fn set_zone_power(self: &Arc<Self>, zone_number: ZoneNumber, on: bool) -> AvrResult<u16> {
        let (status, generation) = self.command_zone(zone_number, on).await?;
        self.spawn_settle(vec![zone_number], generation);
        Ok(status)
    }

    /// Commands one zone and waits for the settled poll.
    ///
    /// # Returns
    /// The zone's state as reported by the confirming poll.
    pub async fn set_zone_power_confirmed(
        &self,
        zone_number: ZoneNumber,
        on: bool,
    ) -> AvrResult<ZoneState> {
        let (_, generation) = self.command_zone(zone_number, on).await?;
        self.settle(&[zone_number], generation).await?;

        self.client
            .snapshot()
            .zone(zone_number)
            .copied()
            .ok_or(AvrError::UnknownZone(zone_number))
    }

    /// Switches the whole receiver and schedules the confirming poll.
    ///
    /// Every known zone goes through the reconcile cycle.
    pub async fn set_main_power(self: &Arc<Self>, on: bool) -> AvrResult<u16> {
        let (status, zones, generation) = self.command_main(on).await?;
        self.spawn_settle(zones, generation);
        Ok(status)
    }

    /// Switches the whole receiver and waits for the settled poll.
    pub async fn set_main_power_confirmed(&self, on: bool) -> AvrResult<ReceiverSnapshot> {
        let (_, zones, generation) = self.command_main(on).await?;
        self.settle(&zones, generation).await?;
        Ok(self.client.snapshot())
    }

    async fn command_zone(&self, zone_number: ZoneNumber, on: bool) -> AvrResult<(u16, u64)> {
        let target = PowerTarget::Zone(zone_number);
        let result = match self.client.zone(zone_number) {
            Some(zone) => zone.set_power_state(on).await,
            None => Err(AvrError::UnknownZone(zone_number)),
        };

        let status = self.record_command(target, on, result)?;
        Ok((status, self.mark_commanded(&[zone_number])))
    }

    async fn command_main(&self, on: bool) -> AvrResult<(u16, Vec<ZoneNumber>, u64)> {
        let result = self.client.set_main_power(on).await;
        let status = self.record_command(PowerTarget::Main, on, result)?;

        let zones: Vec<ZoneNumber> = self
            .client
            .zone_states()
            .iter()
            .map(|zone| zone.zone_number)
            .collect();
        let generation = self.mark_commanded(&zones);
        Ok((status, zones, generation))
    }

    /// Emits the command outcome and passes the result through.
    fn record_command(
        &self,
        target: PowerTarget,
        on: bool,
        result: AvrResult<u16>,
    ) -> AvrResult<u16> {
        let host = self.client.host().to_string();
        match result {
            Ok(status) => {
                log::info!(
                    "[Monitor] Power {} for {:?} on {} accepted",
                    if on { "on" } else { "standby" },
                    target,
                    self.name
                );
                self.emitter.emit_command(CommandEvent::PowerAccepted {
                    host,
                    target,
                    on,
                    timestamp: now_millis(),
                });
                Ok(status)
            }
            Err(e) => {
                log::warn!(
                    "[Monitor] Power {} for {:?} on {} failed: {}",
                    if on { "on" } else { "standby" },
                    target,
                    self.name,
                    e
                );
                self.emitter.emit_command(CommandEvent::PowerFailed {
                    host,
                    target,
                    on,
                    error: e.to_string(),
                    timestamp: now_millis(),
                });
                Err(e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    fn mark_commanded(&self, zones: &[ZoneNumber]) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        for &zone_number in zones {
            self.phases.insert(
                zone_number,
                ZoneReconcile {
                    phase: ReconcilePhase::Commanded,
                    generation,
                },
            );
        }
        generation
    }

    /// Moves zones still owned by `generation` to `phase`.
    ///
    /// A newer command on the same zone owns it from then on; its own settle
    /// cycle decides when the zone becomes `Stable` again.
    fn advance(&self, zones: &[ZoneNumber], generation: u64, phase: ReconcilePhase) {
        for zone_number in zones {
            if let Some(mut entry) = self.phases.get_mut(zone_number) {
                if entry.generation == generation {
                    entry.phase = phase;
                }
            }
        }
    }

    fn spawn_settle(self: &Arc<Self>, zones: Vec<ZoneNumber>, generation: u64) {
        let monitor = Arc::clone(self);
        self.spawner.spawn(async move {
            // Errors are reflected in health; the zones return to Stable anyway.
            let _ = monitor.settle(&zones, generation).await;
        });
    }

    /// Waits the settle delay, polls, and returns the zones to `Stable`.
    async fn settle(&self, zones: &[ZoneNumber], generation: u64) -> AvrResult<()> {
        self.advance(zones, generation, ReconcilePhase::Settling);

        let cancelled = tokio::select! {
            _ = self.cancel_token.cancelled() => true,
            _ = tokio::time::sleep(self.config.settle_delay) => false,
        };

        let result = if cancelled {
            log::debug!("[Monitor] Settle refresh for {} cancelled", self.name);
            Ok(())
        } else {
            log::debug!(
                "[Monitor] Settle delay elapsed for {} zones {:?}",
                self.name,
                zones
            );
            self.poll().await
        };

        self.advance(zones, generation, ReconcilePhase::Stable);
        result
    }
}

impl<S: TaskSpawner> std::fmt::Debug for ReceiverMonitor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverMonitor")
            .field("name", &self.name)
            .field("client", &self.client)
            .field("config", &self.config)
            .finish()
    }
}
