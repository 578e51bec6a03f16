//! Fixed protocol constants for the receiver's AppCommand interface.
//!
//! Paths and request bodies are defined by the receiver firmware and must
//! match byte-for-byte. The timing and zone-offset defaults further down were
//! measured against real hardware and can be overridden through
//! [`Config`](crate::state::Config).

// ─────────────────────────────────────────────────────────────────────────────
// AppCommand Endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Endpoint accepting batched XML status commands (POST).
pub const URL_COMMAND: &str = "/goform/AppCommand.xml";

/// Zone power-on command. `{zone}` is replaced with the zone number.
pub const URL_ZONE_POWER_ON: &str = "/goform/formiPhoneAppPower.xml?{zone}+PowerOn";

/// Zone standby command. `{zone}` is replaced with the zone number.
pub const URL_ZONE_POWER_STANDBY: &str = "/goform/formiPhoneAppPower.xml?{zone}+PowerStandby";

/// Whole-receiver power-on command.
pub const URL_MAIN_POWER_ON: &str = "/goform/formiPhoneAppDirect.xml?PWON";

/// Whole-receiver standby command.
pub const URL_MAIN_POWER_STANDBY: &str = "/goform/formiPhoneAppDirect.xml?PWSTANDBY";

/// Status request asking for every zone's power and the all-zone-stereo state.
///
/// Sent as a single line; the order of the `cmd` elements determines the
/// order of the blocks in the response.
pub const STATUS_REQUEST: &str = r#"<?xml version="1.0" encoding="utf-8" ?><tx><cmd id="1">GetAllZonePowerStatus</cmd><cmd id="2">GetAllZoneStereo</cmd></tx>"#;

/// Content type for AppCommand POST bodies.
pub const CONTENT_TYPE_XML: &str = "application/xml";

/// Zone power text meaning "on". Anything else is standby.
pub const POWER_ON_TEXT: &str = "ON";

/// Stereo `value` text meaning "enabled".
pub const STEREO_ENABLED_TEXT: &str = "1";

/// Stereo member flag character.
pub const STEREO_MEMBER_FLAG: char = '1';

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Port the receiver's web interface listens on.
pub const DEFAULT_PORT: u16 = 8080;

/// Zone number mapped to the first character of the stereo `zones` string.
///
/// Zone 1 is the main zone and is never a stereo member.
pub const DEFAULT_STEREO_FIRST_ZONE: u32 = 2;

/// Delay between an accepted command and the poll that reconciles it (ms).
///
/// Measured on hardware: polling sooner often reads the pre-transition state.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1500;

/// Interval between background status polls (seconds).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Timeout for every HTTP request to the receiver (seconds).
///
/// Must stay well below the poll interval so an unreachable receiver fails
/// before the next tick.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Capacity of the event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
