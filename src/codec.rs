// MIT License - Copyright (c) 2026 Peter Wright

//! Stateless byte helpers shared by the decoders and the command encoder.

use crate::constants::INFO_PREFIX;

/// Interpret a byte slice as a little-endian unsigned integer.
pub fn bytes_to_int_le(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .enumerate()
        .fold(0u32, |acc, (i, b)| acc | (u32::from(*b) << (8 * i)))
}

/// Render a packet as lowercase hex for log output.
pub fn format_packet(packet: &[u8]) -> String {
    let mut out = String::with_capacity(packet.len() * 2);
    for b in packet {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Expand a byte slice into individual bits, least significant bit of the
/// overall little-endian value first. Bit `i` of the result is bit `i % 8`
/// of byte `i / 8`, which is how the aggregate devices-states bitmap indexes
/// device numbers.
pub fn expand_bitfield_lsb_first(bytes: &[u8]) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for byte in bytes {
        for shift in 0..8 {
            bits.push((byte >> shift) & 1 == 1);
        }
    }
    bits
}

/// Decode the text portion of an info reply: bytes up to the first `0x00`
/// terminator or the next info prefix. Returns `None` for non-UTF-8 content,
/// which callers treat as a transient miss and keep reading.
pub fn decode_info_text(value: &[u8]) -> Option<String> {
    let end = value
        .iter()
        .position(|b| *b == 0x00 || *b == INFO_PREFIX)
        .unwrap_or(value.len());

    std::str::from_utf8(&value[..end]).ok().map(str::to_owned)
}
