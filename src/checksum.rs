//! Masked two's-complement checksum used by Yamaha bulk dumps.

/// Computes the checksum of a byte range: sum the bytes, mask the sum to
/// 7 bits, take the two's complement, mask to 7 bits again.
pub fn checksum(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u32, |acc, b| acc + u32::from(*b));
    let masked = (sum & 0x7f) as u8;
    masked.wrapping_neg() & 0x7f
}

/// Checksum over the default range of a dump payload: everything after the
/// header, up to but not including the trailing checksum byte itself.
pub fn message_checksum(payload: &[u8], header_len: usize) -> u8 {
    checksum(&payload[header_len..payload.len() - 1])
}
