//! Socket packet codec.
//!
//! Every race state change leaves the race as a single text line:
//!
//! ```text
//! <code>,<value1>,<value2>,...
//! ```
//!
//! Values are written verbatim. Escaping is the transport's job, so a value
//! that itself contains [`PACKET_SEPARATOR`] will not survive
//! [`SocketPacket::parse`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the code and values of a packet are separated.
pub const PACKET_SEPARATOR: char = ',';

/// Known socket event codes and their fixed value layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EventCode {
    /// `[display_name]`
    Joined = 1,
    /// `[display_name]`
    Left = 2,
    /// `[display_name, points]`
    PointsSet = 3,
    /// `[display_name, position]`
    ItemDropped = 4,
    /// `[position, victim_name, attacker_name]`
    ItemHit = 5,
}

impl EventCode {
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Number of values a packet with this code carries.
    pub const fn value_count(self) -> usize {
        match self {
            EventCode::Joined | EventCode::Left => 1,
            EventCode::PointsSet | EventCode::ItemDropped => 2,
            EventCode::ItemHit => 3,
        }
    }
}

impl TryFrom<u16> for EventCode {
    type Error = PacketParseError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EventCode::Joined),
            2 => Ok(EventCode::Left),
            3 => Ok(EventCode::PointsSet),
            4 => Ok(EventCode::ItemDropped),
            5 => Ok(EventCode::ItemHit),
            other => Err(PacketParseError::UnknownCode(other)),
        }
    }
}

/// Errors produced when reading a packet line back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketParseError {
    #[error("empty packet")]
    Empty,

    #[error("invalid event code: {0:?}")]
    InvalidCode(String),

    #[error("unknown event code: {0}")]
    UnknownCode(u16),

    #[error("event code {code} expects {expected} values, got {actual}")]
    WrongValueCount {
        code: u16,
        expected: usize,
        actual: usize,
    },
}

/// A socket event in its wire shape.
///
/// Two packets are equal iff their code and values are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketPacket {
    pub code: u16,
    pub values: Vec<String>,
}

impl SocketPacket {
    pub fn new(code: EventCode, values: Vec<String>) -> Self {
        Self {
            code: code.code(),
            values,
        }
    }

    /// Render the packet as a single wire line, code first.
    pub fn to_line(&self) -> String {
        let mut line = self.code.to_string();
        for value in &self.values {
            line.push(PACKET_SEPARATOR);
            line.push_str(value);
        }
        line
    }

    /// Parse a wire line, checking the code is known and the value count
    /// matches its layout.
    pub fn parse(line: &str) -> Result<Self, PacketParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(PacketParseError::Empty);
        }

        let mut parts = line.split(PACKET_SEPARATOR);
        let raw_code = parts.next().unwrap_or_default();
        let code: u16 = raw_code
            .parse()
            .map_err(|_| PacketParseError::InvalidCode(raw_code.to_string()))?;
        let event_code = EventCode::try_from(code)?;

        let values: Vec<String> = parts.map(str::to_string).collect();
        if values.len() != event_code.value_count() {
            return Err(PacketParseError::WrongValueCount {
                code,
                expected: event_code.value_count(),
                actual: values.len(),
            });
        }

        Ok(Self { code, values })
    }

    /// The known code of this packet, if any.
    pub fn event_code(&self) -> Option<EventCode> {
        EventCode::try_from(self.code).ok()
    }
}

impl fmt::Display for SocketPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}
