pub(crate) mod bytes;
mod hexdump;
mod utf16;
mod zone_cursor;

pub(crate) use self::hexdump::hexdump_around;
pub(crate) use self::utf16::{
    Utf16DecodeError, decode_utf16_bytes_lossy, decode_utf16_bytes_z, decode_utf16_units_z,
};
pub use self::zone_cursor::ZoneCursor;
