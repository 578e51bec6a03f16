//! Parser for the AppCommand status document.
//!
//! The response to [`STATUS_REQUEST`](crate::protocol_constants::STATUS_REQUEST)
//! has one block per requested command, in request order:
//!
//! ```xml
//! <rx>
//!   <cmd><zone1>ON</zone1><zone2>OFF</zone2></cmd>
//!   <cmd><value>1</value><zones>10</zones></cmd>
//! </rx>
//! ```
//!
//! Block 0 lists zone power by position. Block 1 carries the all-zone-stereo
//! flag (`value`) and a fixed-width member string (`zones`) whose first
//! character maps to the configured first stereo zone.
//!
//! Parsing is all-or-nothing: a [`StatusReport`] is only returned for a
//! complete, well-formed document, so a bad response never reaches state.

use std::collections::BTreeSet;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::types::{StatusReport, StereoGroupState, ZoneNumber};
use crate::error::{AvrError, AvrResult};
use crate::protocol_constants::{POWER_ON_TEXT, STEREO_ENABLED_TEXT, STEREO_MEMBER_FLAG};

/// Index of the zone power block under the root element.
const POWER_BLOCK: usize = 0;

/// Index of the all-zone-stereo block under the root element.
const STEREO_BLOCK: usize = 1;

/// Element depth of the blocks' fields (root = 1, block = 2).
const FIELD_DEPTH: usize = 3;

/// Field of the stereo block currently being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StereoField {
    Value,
    Zones,
}

/// Accumulates field values while walking the document.
#[derive(Default)]
struct StatusCollector {
    depth: usize,
    saw_root: bool,
    blocks_seen: usize,
    current_block: Option<usize>,
    current_field: Option<StereoField>,
    text: String,
    zone_power: Vec<bool>,
    stereo_value: Option<String>,
    stereo_zones: Option<String>,
}

impl StatusCollector {
    fn open(&mut self, name: &[u8]) -> AvrResult<()> {
        self.depth += 1;
        match self.depth {
            1 => {
                if self.saw_root {
                    return Err(AvrError::Parse("multiple root elements".into()));
                }
                self.saw_root = true;
            }
            2 => {
                self.current_block = Some(self.blocks_seen);
                self.blocks_seen += 1;
            }
            FIELD_DEPTH => {
                self.text.clear();
                self.current_field = match name {
                    b"value" => Some(StereoField::Value),
                    b"zones" => Some(StereoField::Zones),
                    _ => None,
                };
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self) -> AvrResult<()> {
        if self.depth == FIELD_DEPTH {
            self.finish_field();
        }
        if self.depth == 2 {
            self.current_block = None;
        }
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| AvrError::Parse("unexpected closing tag".into()))?;
        Ok(())
    }

    fn text(&mut self, raw: &[u8]) -> AvrResult<()> {
        if self.depth != FIELD_DEPTH {
            return Ok(());
        }
        let text = std::str::from_utf8(raw).map_err(|e| AvrError::Parse(e.to_string()))?;
        self.text.push_str(text);
        Ok(())
    }

    fn finish_field(&mut self) {
        let text = self.text.trim().to_string();
        match (self.current_block, self.current_field) {
            (Some(POWER_BLOCK), _) => self.zone_power.push(text == POWER_ON_TEXT),
            (Some(STEREO_BLOCK), Some(StereoField::Value)) => self.stereo_value = Some(text),
            (Some(STEREO_BLOCK), Some(StereoField::Zones)) => self.stereo_zones = Some(text),
            _ => {}
        }
        self.current_field = None;
    }

    fn finish(self, stereo_first_zone: ZoneNumber) -> AvrResult<StatusReport> {
        if !self.saw_root {
            return Err(AvrError::Parse("document has no root element".into()));
        }
        if self.depth != 0 {
            return Err(AvrError::Parse("document ended inside an element".into()));
        }
        if self.blocks_seen <= STEREO_BLOCK {
            return Err(AvrError::Parse("missing all-zone-stereo block".into()));
        }
        let value = self
            .stereo_value
            .ok_or_else(|| AvrError::Parse("stereo block has no value field".into()))?;
        let zones = self
            .stereo_zones
            .ok_or_else(|| AvrError::Parse("stereo block has no zones field".into()))?;

        Ok(StatusReport {
            zone_power: self.zone_power,
            stereo_group: StereoGroupState {
                enabled: value == STEREO_ENABLED_TEXT,
                member_zones: parse_stereo_members(&zones, stereo_first_zone),
            },
        })
    }
}

/// Parses a status response body.
///
/// # Arguments
/// * `xml` - Response body of the status POST
/// * `stereo_first_zone` - Zone number mapped to the first member flag
///
/// # Errors
/// Returns [`AvrError::Parse`] if the document is malformed or is missing
/// the stereo block or one of its fields.
pub fn parse_status_xml(xml: &str, stereo_first_zone: ZoneNumber) -> AvrResult<StatusReport> {
    let mut reader = Reader::from_str(xml);
    let mut collector = StatusCollector::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => collector.open(e.local_name().as_ref())?,
            Ok(Event::Empty(e)) => {
                collector.open(e.local_name().as_ref())?;
                collector.close()?;
            }
            Ok(Event::End(_)) => collector.close()?,
            Ok(Event::Text(e)) => collector.text(&e)?,
            Ok(Event::Eof) => break,
            Err(e) => {
                log::debug!(
                    "[Avr] XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                );
                return Err(AvrError::Parse(e.to_string()));
            }
            _ => {}
        }
    }

    collector.finish(stereo_first_zone)
}

/// Maps the fixed-width member string to zone numbers.
///
/// Position `j` maps to zone `stereo_first_zone + j`. Only `'1'` marks a
/// member; any other character is treated as "not a member". Positions past
/// the largest zone number are dropped.
#[must_use]
pub fn parse_stereo_members(flags: &str, stereo_first_zone: ZoneNumber) -> BTreeSet<ZoneNumber> {
    flags
        .chars()
        .enumerate()
        .filter(|(_, flag)| *flag == STEREO_MEMBER_FLAG)
        .filter_map(|(offset, _)| {
            ZoneNumber::try_from(offset)
                .ok()
                .and_then(|offset| stereo_first_zone.checked_add(offset))
        })
        .collect()
}
