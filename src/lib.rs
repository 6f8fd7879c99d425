//! Bidirectional codec between Yamaha DX7 System Exclusive dumps and a
//! structured, JSON-compatible voice representation.
//!
//! The wire format is described declaratively in [`dx7::schema`] and
//! interpreted by the generic bit-layout engine in [`layout`]. The usual
//! entry points are [`dx7::decode`] and [`dx7::encode`].

pub mod checksum;
pub mod dx7;
pub mod framing;
pub mod layout;

use std::fmt;

use crate::framing::ManufacturerId;

/// Error type for decoding and encoding System Exclusive data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A SysEx envelope marker byte was not where it should be.
    Framing { offset: usize, expected: u8, actual: u8 },
    /// The manufacturer identifier does not belong to a supported schema.
    UnsupportedManufacturer(ManufacturerId),
    /// The format discriminant matched no declared alternative layout.
    UnsupportedFormat(u64),
    /// The buffer ran out before the named field was fully read.
    OutOfData { field: &'static str, needed: u32, available: usize },
    /// Bytes were left over after the layout was exhausted.
    TrailingData(usize),
    /// A fixed-count sequence had the wrong number of elements on encode.
    SeqLength { field: &'static str, expected: usize, actual: usize },
    /// A fixed-length text field was given too many bytes on encode.
    TextLength { field: &'static str, max: usize, actual: usize },
    /// A value does not fit the field's declared width on encode.
    OutOfRange { field: &'static str, value: i64 },
    /// An enumerated field held a code with no declared label.
    UnmappedCode { field: &'static str, code: u64 },
    /// An enumerated field was given a label with no declared code.
    UnmappedLabel { field: &'static str, label: String },
    /// A record was asked for a field its layout does not declare.
    UnknownField(&'static str),
    /// A message must carry exactly 1 voice or a full bank of 32.
    BadVoiceCount(usize),
    /// The structured record names a model this codec does not handle.
    BadModel(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Error::Framing { offset, expected, actual } =>
                format!("Expected {:02X}H at offset {}, got {:02X}H.", expected, offset, actual),
            Error::UnsupportedManufacturer(id) =>
                format!("No schema for manufacturer ID {}.", id),
            Error::UnsupportedFormat(value) =>
                format!("Format number {} matches no known layout.", value),
            Error::OutOfData { field, needed, available } =>
                format!("Field '{}' needs {} more bits, only {} left.", field, needed, available),
            Error::TrailingData(count) =>
                format!("{} unexpected bytes after end of message.", count),
            Error::SeqLength { field, expected, actual } =>
                format!("Field '{}' expects {} elements, got {}.", field, expected, actual),
            Error::TextLength { field, max, actual } =>
                format!("Field '{}' holds at most {} bytes, got {}.", field, max, actual),
            Error::OutOfRange { field, value } =>
                format!("Value {} does not fit field '{}'.", value, field),
            Error::UnmappedCode { field, code } =>
                format!("Field '{}' has no label for code {}.", field, code),
            Error::UnmappedLabel { field, label } =>
                format!("Field '{}' has no code for label '{}'.", field, label),
            Error::UnknownField(name) =>
                format!("Record does not declare a field named '{}'.", name),
            Error::BadVoiceCount(count) =>
                format!("Expected 1 voice or a bank of 32, got {} voices.", count),
            Error::BadModel(model) =>
                format!("Cannot encode a voice for model '{}'.", model),
        })
    }
}

impl std::error::Error for Error {}
