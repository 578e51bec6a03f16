//! Application services layer.
//!
//! Services orchestrate the [`avr`](crate::avr) client over time: periodic
//! polling and reconciliation after commands.

pub mod monitor;

pub use monitor::{ReceiverHealthState, ReceiverMonitor, ReceiverMonitorConfig, ReconcilePhase};
