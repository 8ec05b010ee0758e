use crate::err::{DecodeError, DecodeResult};
use crate::utils::bytes;
use crate::zone::{Endianness, Zone};

/// A lightweight cursor over the bytes of one zone.
///
/// This is the slice/offset equivalent of `Cursor<&[u8]>` with the zone's byte order attached.
/// Positions are always absolute within the zone, including for cursors narrowed with
/// [`ZoneCursor::limited`], so diagnostics can point at the same offsets a hexdump of the zone
/// would show.
///
/// All reads advance the cursor on success and leave it untouched on failure.
#[derive(Clone, Copy, Debug)]
pub struct ZoneCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endianness,
}

impl<'a> ZoneCursor<'a> {
    pub fn new(buf: &'a [u8], endian: Endianness) -> Self {
        Self {
            buf,
            pos: 0,
            endian,
        }
    }

    pub fn for_zone(zone: &Zone<'a>) -> Self {
        Self::new(zone.data, zone.endianness)
    }

    /// A copy of this cursor that cannot read at or past `end`.
    pub fn limited(&self, end: usize) -> DecodeResult<Self> {
        if end > self.buf.len() || self.pos > end {
            return Err(DecodeError::truncated(
                "bounded region",
                self.pos,
                end.saturating_sub(self.pos),
                self.buf.len(),
            ));
        }
        Ok(Self {
            buf: &self.buf[..end],
            pos: self.pos,
            endian: self.endian,
        })
    }

    #[inline]
    pub(crate) fn buf(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    pub fn endian(&self) -> Endianness {
        self.endian
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize, what: &'static str) -> DecodeResult<()> {
        let _ = bytes::slice_r(self.buf, pos, 0, what)?;
        self.pos = pos;
        Ok(())
    }

    /// Moves back to a position previously observed on this cursor.
    #[inline]
    pub(crate) fn rewind(&mut self, checkpoint: usize) {
        debug_assert!(checkpoint <= self.buf.len());
        self.pos = checkpoint.min(self.buf.len());
    }

    #[inline]
    pub(crate) fn advance(&mut self, n: usize, what: &'static str) -> DecodeResult<()> {
        let new_pos = self
            .pos
            .checked_add(n)
            .ok_or_else(|| DecodeError::truncated(what, self.pos, n, self.buf.len()))?;
        self.set_pos(new_pos, what)
    }

    #[inline]
    pub(crate) fn take_bytes(&mut self, len: usize, what: &'static str) -> DecodeResult<&'a [u8]> {
        let out = bytes::slice_r(self.buf, self.pos, len, what)?;
        self.pos += len;
        Ok(out)
    }

    #[inline]
    pub(crate) fn peek_u8(&self, what: &'static str) -> DecodeResult<u8> {
        bytes::read_u8(self.buf, self.pos)
            .ok_or_else(|| DecodeError::truncated(what, self.pos, 1, self.buf.len()))
    }

    #[inline]
    pub(crate) fn u16_named(&mut self, what: &'static str) -> DecodeResult<u16> {
        let v = bytes::read_u16_r(self.buf, self.pos, self.endian, what)?;
        self.pos += 2;
        Ok(v)
    }

    #[inline]
    pub(crate) fn i16_named(&mut self, what: &'static str) -> DecodeResult<i16> {
        Ok(self.u16_named(what)? as i16)
    }

    #[inline]
    pub(crate) fn u32_named(&mut self, what: &'static str) -> DecodeResult<u32> {
        let v = bytes::read_u32_r(self.buf, self.pos, self.endian, what)?;
        self.pos += 4;
        Ok(v)
    }

    #[inline]
    pub(crate) fn i32_named(&mut self, what: &'static str) -> DecodeResult<i32> {
        Ok(self.u32_named(what)? as i32)
    }

    #[inline]
    pub(crate) fn f64_named(&mut self, what: &'static str) -> DecodeResult<f64> {
        let v = bytes::read_f64(self.buf, self.pos, self.endian)
            .ok_or_else(|| DecodeError::truncated(what, self.pos, 8, self.buf.len()))?;
        self.pos += 8;
        Ok(v)
    }

    /// Read `count` consecutive `u16` values.
    pub(crate) fn u16_vec(&mut self, count: usize, what: &'static str) -> DecodeResult<Vec<u16>> {
        let byte_len = count
            .checked_mul(2)
            .ok_or_else(|| DecodeError::truncated(what, self.pos, usize::MAX, self.buf.len()))?;
        let _ = bytes::slice_r(self.buf, self.pos, byte_len, what)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.u16_named(what)?);
        }
        Ok(out)
    }

    /// Read `count` consecutive `u32` values.
    pub(crate) fn u32_vec(&mut self, count: usize, what: &'static str) -> DecodeResult<Vec<u32>> {
        let byte_len = count
            .checked_mul(4)
            .ok_or_else(|| DecodeError::truncated(what, self.pos, usize::MAX, self.buf.len()))?;
        let _ = bytes::slice_r(self.buf, self.pos, byte_len, what)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.u32_named(what)?);
        }
        Ok(out)
    }
}
