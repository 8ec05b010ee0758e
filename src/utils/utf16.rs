use crate::zone::Endianness;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Utf16DecodeError {
    OddLength,
}

/// Collect the UTF-16 code units of `bytes` in the given byte order.
///
/// A trailing odd byte is dropped; callers that care report it themselves.
pub(crate) fn utf16_units(bytes: &[u8], endian: Endianness) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| match endian {
            Endianness::Big => u16::from_be_bytes([chunk[0], chunk[1]]),
            Endianness::Little => u16::from_le_bytes([chunk[0], chunk[1]]),
        })
        .collect()
}

/// Decode UTF-16 code units until the first NUL (0x0000), if present.
///
/// Unpaired surrogates become U+FFFD: text in these containers is routinely cut at arbitrary
/// code unit boundaries, so a lossy decode recovers more than a strict one.
pub(crate) fn decode_utf16_units_z(units: &[u16]) -> String {
    let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
    let slice = &units[..end];

    // Fast path: pure ASCII converts directly.
    if slice.iter().all(|&c| c <= 0x7F) {
        return slice.iter().map(|&c| c as u8 as char).collect();
    }

    String::from_utf16_lossy(slice)
}

/// Decode a UTF-16 byte slice in the given byte order, stopping at the first NUL.
pub(crate) fn decode_utf16_bytes_z(
    bytes: &[u8],
    endian: Endianness,
) -> Result<String, Utf16DecodeError> {
    if !bytes.len().is_multiple_of(2) {
        return Err(Utf16DecodeError::OddLength);
    }
    Ok(decode_utf16_units_z(&utf16_units(bytes, endian)))
}

/// Like [`decode_utf16_bytes_z`], but drops a trailing odd byte instead of failing.
pub(crate) fn decode_utf16_bytes_lossy(bytes: &[u8], endian: Endianness) -> String {
    decode_utf16_units_z(&utf16_units(bytes, endian))
}
