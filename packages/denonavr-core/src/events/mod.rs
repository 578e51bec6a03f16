//! Event system for state-change notification.
//!
//! This module provides:
//! - [`EventEmitter`] trait that the client and monitor emit through
//! - [`BroadcastEventBridge`] fanning events out over a broadcast channel
//! - Event types for receiver state and commands
//!
//! Emitters never know who is listening; consumers subscribe to the bridge
//! or supply their own [`EventEmitter`].

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::avr::{ReceiverSnapshot, ZoneNumber};

/// Events broadcast to consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Receiver state and reachability.
    Receiver(ReceiverEvent),

    /// Outcome of control commands.
    Command(CommandEvent),
}

/// Receiver reachability as seen by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReceiverHealth {
    /// Last poll succeeded.
    #[default]
    Reachable,
    /// Last poll failed; cached state is stale.
    Unreachable,
}

/// Events describing a receiver's cached state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReceiverEvent {
    /// A poll completed and its result was applied.
    StateUpdated {
        /// Receiver host.
        host: String,
        /// Receiver port.
        port: u16,
        /// State after the update.
        snapshot: ReceiverSnapshot,
        /// Whether anything differed from the previous state.
        changed: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Receiver reachability changed.
    HealthChanged {
        /// Receiver host.
        host: String,
        /// Receiver port.
        port: u16,
        /// Current health.
        health: ReceiverHealth,
        /// Error code of the failure (if unreachable).
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// What a power command addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "zone", rename_all = "camelCase")]
pub enum PowerTarget {
    /// A single zone.
    Zone(ZoneNumber),
    /// The whole receiver.
    Main,
}

/// Events describing command outcomes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CommandEvent {
    /// The receiver accepted a power command; a settled poll is pending.
    PowerAccepted {
        /// Receiver host.
        host: String,
        /// Command target.
        target: PowerTarget,
        /// Requested power state.
        on: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A power command failed or was rejected.
    PowerFailed {
        /// Receiver host.
        host: String,
        /// Command target.
        target: PowerTarget,
        /// Requested power state.
        on: bool,
        /// Error message describing the failure.
        error: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl From<ReceiverEvent> for BroadcastEvent {
    fn from(event: ReceiverEvent) -> Self {
        BroadcastEvent::Receiver(event)
    }
}

impl From<CommandEvent> for BroadcastEvent {
    fn from(event: CommandEvent) -> Self {
        BroadcastEvent::Command(event)
    }
}
