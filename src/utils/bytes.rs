//! Byte-slice utilities for bounds-oriented parsing.
//!
//! Zones carry their own byte order, so unlike a fixed-endian format every numeric read takes an
//! [`Endianness`]. There are two layers:
//! - **Option layer** (`read_*`): helpers that return `Option<T>`.
//! - **Result layer** (`*_r`): wrappers that map `None` to [`DecodeError::Truncated`].
//!
//! Offsets are `usize` and are interpreted relative to the slice you pass in.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::err::DecodeError;
use crate::zone::Endianness;

/// Read `N` raw bytes at `offset`.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    let bytes: [u8; N] = buf.get(offset..end)?.try_into().ok()?;
    Some(bytes)
}

pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

pub(crate) fn read_u16(buf: &[u8], offset: usize, endian: Endianness) -> Option<u16> {
    let bytes = read_array::<2>(buf, offset)?;
    Some(match endian {
        Endianness::Big => BigEndian::read_u16(&bytes),
        Endianness::Little => LittleEndian::read_u16(&bytes),
    })
}

pub(crate) fn read_u32(buf: &[u8], offset: usize, endian: Endianness) -> Option<u32> {
    let bytes = read_array::<4>(buf, offset)?;
    Some(match endian {
        Endianness::Big => BigEndian::read_u32(&bytes),
        Endianness::Little => LittleEndian::read_u32(&bytes),
    })
}

pub(crate) fn read_f64(buf: &[u8], offset: usize, endian: Endianness) -> Option<f64> {
    let bytes = read_array::<8>(buf, offset)?;
    Some(match endian {
        Endianness::Big => BigEndian::read_f64(&bytes),
        Endianness::Little => LittleEndian::read_f64(&bytes),
    })
}

pub(crate) fn slice_r<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], DecodeError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| DecodeError::truncated(what, offset, len, buf.len()))?;
    buf.get(offset..end)
        .ok_or_else(|| DecodeError::truncated(what, offset, len, buf.len()))
}

pub(crate) fn read_u16_r(
    buf: &[u8],
    offset: usize,
    endian: Endianness,
    what: &'static str,
) -> Result<u16, DecodeError> {
    read_u16(buf, offset, endian).ok_or_else(|| DecodeError::truncated(what, offset, 2, buf.len()))
}

pub(crate) fn read_u32_r(
    buf: &[u8],
    offset: usize,
    endian: Endianness,
    what: &'static str,
) -> Result<u32, DecodeError> {
    read_u32(buf, offset, endian).ok_or_else(|| DecodeError::truncated(what, offset, 4, buf.len()))
}

/// Read a table of `u32` values spanning the whole of `buf`.
///
/// The table must be 4-byte aligned; the caller decides how a misaligned table is reported.
pub(crate) fn read_u32_table(buf: &[u8], endian: Endianness) -> Option<Vec<u32>> {
    if !buf.len().is_multiple_of(4) {
        return None;
    }
    Some(
        buf.chunks_exact(4)
            .map(|chunk| match endian {
                Endianness::Big => BigEndian::read_u32(chunk),
                Endianness::Little => LittleEndian::read_u32(chunk),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_respect_endianness() {
        let buf = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(read_u16(&buf, 0, Endianness::Big), Some(0x1234));
        assert_eq!(read_u16(&buf, 0, Endianness::Little), Some(0x3412));
        assert_eq!(read_u32(&buf, 0, Endianness::Big), Some(0x1234_5678));
        assert_eq!(read_u32(&buf, 0, Endianness::Little), Some(0x7856_3412));
        assert_eq!(read_u32(&buf, 1, Endianness::Big), None);
    }

    #[test]
    fn test_u32_table_requires_alignment() {
        let buf = [0, 0, 0, 1, 0, 0, 0, 2];
        assert_eq!(read_u32_table(&buf, Endianness::Big), Some(vec![1, 2]));
        assert_eq!(read_u32_table(&buf[..7], Endianness::Big), None);
    }
}
