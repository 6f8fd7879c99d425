//! System Exclusive envelope handling: start/end markers and the
//! manufacturer identifier, stripped on the way in and attached on the
//! way out. Routing an identifier to a schema is the caller's business.

use std::fmt;

use crate::Error;

/// Manufacturer specific SysEx message initiator.
pub const INITIATOR: u8 = 0xf0;

/// Manufacturer specific SysEx message terminator.
pub const TERMINATOR: u8 = 0xf7;

/// Marker byte announcing a three-byte extended manufacturer ID.
pub const EXTENDED_ID: u8 = 0x00;

/// MIDI manufacturer ID. A single byte for standard IDs, or three bytes
/// when the first byte is the extended-ID marker.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ManufacturerId {
    Standard(u8),
    Extended([u8; 3]),
}

impl ManufacturerId {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ManufacturerId::Standard(b) => vec![*b],
            ManufacturerId::Extended(bs) => bs.to_vec(),
        }
    }
}

impl fmt::Display for ManufacturerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ManufacturerId::Standard(b) => write!(f, "{:02X}H", b),
            ManufacturerId::Extended(bs) => write!(f, "{:02X}H {:02X}H {:02X}H", bs[0], bs[1], bs[2]),
        }
    }
}

/// Validates the envelope of a complete SysEx message and splits it into
/// the manufacturer ID and the payload between ID and terminator.
pub fn strip(message: &[u8]) -> Result<(ManufacturerId, &[u8]), Error> {
    if message.is_empty() || message[0] != INITIATOR {
        return Err(Error::Framing {
            offset: 0,
            expected: INITIATOR,
            actual: *message.first().unwrap_or(&0),
        });
    }
    if message.len() < 2 || message[message.len() - 1] != TERMINATOR {
        return Err(Error::Framing {
            offset: message.len().saturating_sub(1),
            expected: TERMINATOR,
            actual: *message.last().unwrap_or(&0),
        });
    }

    let body = &message[1..message.len() - 1];
    let (id, payload) = if body.first() == Some(&EXTENDED_ID) {
        if body.len() < 3 {
            return Err(Error::OutOfData {
                field: "manufacturer_id",
                needed: 24,
                available: body.len() * 8,
            });
        }
        (ManufacturerId::Extended([body[0], body[1], body[2]]), &body[3..])
    } else if let Some(first) = body.first() {
        (ManufacturerId::Standard(*first), &body[1..])
    } else {
        return Err(Error::OutOfData { field: "manufacturer_id", needed: 8, available: 0 });
    };

    Ok((id, payload))
}

/// Wraps a payload in a SysEx envelope with the given manufacturer ID.
pub fn wrap(id: ManufacturerId, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(payload.len() + 5);
    message.push(INITIATOR);
    message.extend(id.to_bytes());
    message.extend(payload);
    message.push(TERMINATOR);
    message
}
