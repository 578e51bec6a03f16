//! Event emitter abstraction for decoupling the client from delivery.
//!
//! The client and monitor depend on the [`EventEmitter`] trait rather than
//! on a concrete channel, so tests and embedding applications can observe
//! events however they like.

use super::{CommandEvent, ReceiverEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// # Example
///
/// ```ignore
/// let client = AvrClient::new("192.0.2.10", 8080, &Config::default())?
///     .with_emitter(Arc::new(LoggingEventEmitter));
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a receiver state or health event.
    fn emit_receiver(&self, event: ReceiverEvent);

    /// Emits a command outcome event.
    fn emit_command(&self, event: CommandEvent);
}

/// No-op emitter, the client's default.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_receiver(&self, _event: ReceiverEvent) {}

    fn emit_command(&self, _event: CommandEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_receiver(&self, event: ReceiverEvent) {
        tracing::debug!(?event, "receiver_event");
    }

    fn emit_command(&self, event: CommandEvent) {
        tracing::debug!(?event, "command_event");
    }
}
