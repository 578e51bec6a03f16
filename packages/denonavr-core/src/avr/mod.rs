//! Receiver control over the AppCommand HTTP+XML protocol.
//!
//! - [`AvrClient`]: status polling, cached state and raw commands
//! - [`AvrZone`]: per-zone handle (cached power, power commands)
//! - [`parse_status_xml`]: status document parser
//! - [`AvrTransport`]: HTTP seam, [`ReqwestTransport`] in production

mod client;
mod receiver;
mod status;
mod transport;
mod types;
mod zone;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use client::AvrClient;
pub use receiver::ReceiverState;
pub use status::{parse_status_xml, parse_stereo_members};
pub use transport::{AvrTransport, HttpReply, ReqwestTransport};
pub use types::{ReceiverSnapshot, StatusReport, StereoGroupState, ZoneNumber, ZoneState};
pub use zone::{power_command_path, AvrZone};
