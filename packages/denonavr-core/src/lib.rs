//! Denon AVR Core - state client for Denon/Marantz receivers.
//!
//! This crate keeps a local model of a network-connected receiver in sync
//! over its AppCommand HTTP+XML protocol: per-zone power and the
//! all-zone-stereo group.
//!
//! # Architecture
//!
//! - [`avr`]: protocol client, zone handles and status parsing
//! - [`services`]: polling loop and read-after-write reconciliation
//! - [`events`]: state-change and command events
//! - [`runtime`]: task spawning abstraction
//! - [`state`]: client configuration
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`AvrTransport`](avr::AvrTransport): HTTP requests
//! - [`EventEmitter`](events::EventEmitter): emitting domain events
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks
//!
//! # Consistency
//!
//! A command never changes cached state. Power state changes become visible
//! only after a later successful poll, which [`ReceiverMonitor`] schedules
//! after the receiver's settle delay.

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod avr;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod utils;

pub use avr::{
    AvrClient, AvrTransport, AvrZone, ReceiverSnapshot, ReqwestTransport, StereoGroupState,
    ZoneNumber, ZoneState,
};
pub use error::{AvrError, AvrResult, ErrorCode};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, CommandEvent, EventEmitter, LoggingEventEmitter,
    NoopEventEmitter, PowerTarget, ReceiverEvent, ReceiverHealth,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use services::{ReceiverMonitor, ReceiverMonitorConfig, ReconcilePhase};
pub use state::Config;
pub use utils::now_millis;
