//! The container's variable-length nonnegative integers.
//!
//! The first byte selects the form, and multi-byte forms are always most-significant byte first
//! regardless of the zone's endianness:
//!
//! | first byte      | width | value                                  |
//! |-----------------|-------|----------------------------------------|
//! | `0x00..=0x7F`   | 1     | the byte                               |
//! | `0x80..=0xBF`   | 2     | `(b0 & 0x7F) << 8 \| b1`                |
//! | `0xC0..=0xCF`   | 4     | the four bytes, masked to 28 bits      |
//! | `0xD0..=0xFF`   | -     | invalid                                |

use crate::err::{DecodeError, DecodeResult};
use crate::utils::ZoneCursor;

pub const MAX_ONE_BYTE: u32 = 0x7F;
pub const MAX_TWO_BYTES: u32 = 0x3FFF;
pub const MAX_FOUR_BYTES: u32 = 0x0FFF_FFFF;

/// Width in bytes of the VarInt whose first byte is `first`, or `None` if it is invalid.
#[inline]
pub fn encoded_width(first: u8) -> Option<usize> {
    match first >> 4 {
        0x0..=0x7 => Some(1),
        0x8..=0xB => Some(2),
        0xC => Some(4),
        _ => None,
    }
}

/// Reads one VarInt, refusing to read at or past `bound`.
///
/// The cursor is left untouched on failure.
pub fn read_varint(cursor: &mut ZoneCursor<'_>, bound: usize) -> DecodeResult<u32> {
    let start = cursor.pos();
    let first = cursor.peek_u8("varint")?;
    let width = encoded_width(first).ok_or(DecodeError::InvalidVarInt {
        offset: start as u64,
        byte: first,
    })?;

    let end = start + width;
    if end > bound || end > cursor.len() {
        return Err(DecodeError::truncated("varint", start, width, bound.min(cursor.len())));
    }

    let bytes = cursor.take_bytes(width, "varint")?;
    let value = match width {
        1 => u32::from(first),
        2 => (u32::from(first & 0x7F) << 8) | u32::from(bytes[1]),
        _ => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) & MAX_FOUR_BYTES,
    };
    Ok(value)
}

/// Encodes `value` in the shortest form that can hold it.
///
/// Returns `None` for values wider than 28 bits.
pub fn encode_varint(value: u32) -> Option<Vec<u8>> {
    if value <= MAX_ONE_BYTE {
        Some(vec![value as u8])
    } else if value <= MAX_TWO_BYTES {
        Some(vec![0x80 | (value >> 8) as u8, value as u8])
    } else if value <= MAX_FOUR_BYTES {
        Some(encode_varint_long(value))
    } else {
        None
    }
}

/// Encodes `value` in the four-byte form, whatever its magnitude. This is the form whose first
/// byte carries the field "complex" marker.
pub fn encode_varint_long(value: u32) -> Vec<u8> {
    let v = (value & MAX_FOUR_BYTES) | 0xC000_0000;
    v.to_be_bytes().to_vec()
}
