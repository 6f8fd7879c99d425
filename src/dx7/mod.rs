//! Yamaha DX7 voice dump codec.
//!
//! [`decode`] turns a complete SysEx message into structured voices;
//! [`encode`] does the reverse. [`Dump`] carries the advisory details a
//! plain voice list drops: header fields and the stored-versus-computed
//! checksum, for callers that want strict validation.

use std::convert::TryFrom;
use std::fmt;

use log::{debug, warn};

use crate::checksum;
use crate::framing::{self, ManufacturerId};
use crate::layout::{BitReader, BitWriter};
use crate::Error;

pub mod schema;
pub mod voice;

mod raw;

use raw::{RawDump, RawVoice};

pub use voice::{Lfo, Operator, Voice};

/// Yamaha's standard manufacturer ID.
pub const MANUFACTURER_ID: ManufacturerId = ManufacturerId::Standard(0x43);

/// Dump format number: what the body of the message holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Format {
    Voice = 0,
    Bank = 9,
}

impl Format {
    /// The byte count the header declares for this format.
    pub fn declared_byte_count(&self) -> u16 {
        match self {
            Format::Voice => schema::VOICE_BYTE_COUNT,
            Format::Bank => schema::BANK_BYTE_COUNT,
        }
    }

    /// How many voices the body carries. No partial banks.
    pub fn voice_count(&self) -> usize {
        match self {
            Format::Voice => 1,
            Format::Bank => schema::BANK_VOICES,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Format::Voice => "voice",
            Format::Bank => "bank",
        })
    }
}

impl TryFrom<u8> for Format {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Format::Voice),
            9 => Ok(Format::Bank),
            _ => Err(Error::UnsupportedFormat(value.into())),
        }
    }
}

impl From<Format> for u8 {
    fn from(format: Format) -> u8 {
        format as u8
    }
}

/// The four header bytes of a dump payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub sub_status: u8, // 0 = voice/bank dump
    pub channel: u8,    // 1...16
    pub format: Format,
    pub byte_count: u16,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "format = {}, channel = {}, declared length = {} bytes",
            self.format, self.channel, self.byte_count)
    }
}

/// Stored and recomputed checksum of a decoded dump. A mismatch does not
/// fail the decode; strict callers check [`ChecksumReport::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumReport {
    pub stored: u8,
    pub computed: u8,
}

impl ChecksumReport {
    pub fn is_valid(&self) -> bool {
        self.stored == self.computed
    }
}

/// A decoded voice dump: header, one voice or a bank of 32, and the
/// checksum as found on the wire next to the one computed here.
#[derive(Debug, Clone)]
pub struct Dump {
    pub header: Header,
    pub voices: Vec<Voice>,
    pub checksum: ChecksumReport,
}

impl Dump {
    /// Makes a dump around a voice list, picking the format from the
    /// count: 1 voice or a full bank of 32, nothing else.
    pub fn new(voices: Vec<Voice>) -> Result<Self, Error> {
        let format = match voices.len() {
            1 => Format::Voice,
            schema::BANK_VOICES => Format::Bank,
            n => return Err(Error::BadVoiceCount(n)),
        };
        Ok(Self {
            header: Header {
                sub_status: 0,
                channel: 1,
                format,
                byte_count: format.declared_byte_count(),
            },
            voices,
            checksum: ChecksumReport { stored: 0, computed: 0 },
        })
    }

    /// Decodes a complete SysEx message, envelope included.
    pub fn from_bytes(message: &[u8]) -> Result<Self, Error> {
        let (id, payload) = framing::strip(message)?;
        if id != MANUFACTURER_ID {
            return Err(Error::UnsupportedManufacturer(id));
        }
        Self::from_payload(payload)
    }

    /// Decodes a dump payload (envelope and manufacturer ID already
    /// stripped by the dispatching caller).
    pub fn from_payload(payload: &[u8]) -> Result<Self, Error> {
        let mut raw = RawDump::default();
        let mut r = BitReader::new(payload);
        schema::DUMP.decode(&mut r, &mut raw)?;
        if r.remaining() != 0 {
            return Err(Error::TrailingData(r.remaining() / 8));
        }

        let format = Format::try_from(raw.format as u8)?;
        let header = Header {
            sub_status: raw.sub_status as u8,
            channel: raw.channel as u8,
            format,
            byte_count: raw.byte_count as u16,
        };
        if header.byte_count != format.declared_byte_count() {
            warn!("Declared byte count {:04X}H does not match {} format (expected {:04X}H)",
                header.byte_count, format, format.declared_byte_count());
        }

        let report = ChecksumReport {
            stored: raw.checksum as u8,
            computed: checksum::message_checksum(payload, schema::HEADER_SIZE),
        };
        if !report.is_valid() {
            warn!("Checksum mismatch: stored {:02X}H, computed {:02X}H",
                report.stored, report.computed);
        }

        debug!("Decoded {} dump with {} voice(s)", format, raw.voices.len());

        Ok(Self {
            header,
            voices: raw.voices.iter().map(RawVoice::to_structured).collect(),
            checksum: report,
        })
    }

    /// Serializes the dump payload. The checksum is computed over the
    /// finished body and written into the trailing byte last.
    pub fn to_payload(&self) -> Result<Vec<u8>, Error> {
        if self.voices.len() != self.header.format.voice_count() {
            return Err(Error::BadVoiceCount(self.voices.len()));
        }
        for voice in &self.voices {
            if voice.model != voice::MODEL {
                return Err(Error::BadModel(voice.model.clone()));
            }
        }

        let raw = RawDump {
            sub_status: self.header.sub_status.into(),
            channel: self.header.channel.into(),
            format: u8::from(self.header.format).into(),
            byte_count: self.header.format.declared_byte_count().into(),
            voices: self.voices.iter().map(RawVoice::from_structured).collect(),
            checksum: 0,
        };

        let mut w = BitWriter::new();
        schema::DUMP.encode(&mut w, &raw)?;
        let mut payload = w.into_bytes();

        let last = payload.len() - 1;
        payload[last] = checksum::message_checksum(&payload, schema::HEADER_SIZE);
        Ok(payload)
    }

    /// Serializes the complete SysEx message, envelope included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(framing::wrap(MANUFACTURER_ID, &self.to_payload()?))
    }
}

/// Decodes a complete DX7 SysEx message into structured voices:
/// one for a single-voice dump, exactly 32 for a bank.
pub fn decode(message: &[u8]) -> Result<Vec<Voice>, Error> {
    Ok(Dump::from_bytes(message)?.voices)
}

/// Encodes structured voices into a complete DX7 SysEx message.
/// One voice makes a single-voice dump, 32 make a bank.
pub fn encode(voices: &[Voice]) -> Result<Vec<u8>, Error> {
    Dump::new(voices.to_vec())?.to_bytes()
}
