use thiserror::Error;

use crate::diagnostics::AnomalyKind;
use crate::zone::ZoneId;

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Errors raised while decoding a single unit (a VarInt, a Field, a Link, a sub-record or a
/// referenced zone).
///
/// None of these are fatal to a document: every caller owns a statically declared boundary and
/// reseeks to it after a failure. The only error that aborts a whole cluster is
/// [`DecodeError::ZoneTooShort`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("buffer too small for {what} at offset {offset} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("offset {offset}: byte `{byte:#04x}` does not start a valid variable-length integer")]
    InvalidVarInt { offset: u64, byte: u8 },

    #[error("offset {offset}: field declares invalid size {size}")]
    InvalidFieldSize { offset: u64, size: u32 },

    #[error("offset {offset}: optional id flag must be 0 or 1, found `{flag:#06x}`")]
    InvalidIdFlag { offset: u64, flag: u16 },

    #[error(
        "offset {offset}: link id `{first_id}` disagrees with secondary type tag `{secondary_tag:#06x}`"
    )]
    LinkConsistency {
        offset: u64,
        first_id: ZoneId,
        secondary_tag: u16,
    },

    #[error("offset {offset}: invalid sub-record element count {n}")]
    InvalidSentinel { offset: u64, n: i32 },

    #[error("zone {id} is too short to hold a cluster ({len} bytes)")]
    ZoneTooShort { id: ZoneId, len: usize },

    #[error("zone {id} is not present in the zone store")]
    MissingZone { id: ZoneId },

    #[error("zone {id} has kind `{kind}`, expected `{expected}`")]
    WrongZoneKind {
        id: ZoneId,
        kind: String,
        expected: &'static str,
    },

    #[error("zone {id}: {n} elements of {element_size} bytes do not match zone length {len}")]
    ShapeMismatch {
        id: ZoneId,
        n: u32,
        element_size: u32,
        len: usize,
    },

    #[error("zone {id}: {what} of {len} bytes is not a multiple of {unit}")]
    MisalignedTable {
        what: &'static str,
        id: ZoneId,
        len: usize,
        unit: usize,
    },

    #[error("link references no zone")]
    EmptyLink,
}

impl DecodeError {
    /// Maps this error onto the anomaly taxonomy used by [`crate::Diagnostics`].
    pub fn class(&self) -> AnomalyKind {
        match self {
            DecodeError::Truncated { .. }
            | DecodeError::InvalidVarInt { .. }
            | DecodeError::InvalidFieldSize { .. }
            | DecodeError::ZoneTooShort { .. } => AnomalyKind::Bounds,
            DecodeError::InvalidIdFlag { .. }
            | DecodeError::LinkConsistency { .. }
            | DecodeError::InvalidSentinel { .. }
            | DecodeError::MissingZone { .. }
            | DecodeError::WrongZoneKind { .. }
            | DecodeError::ShapeMismatch { .. }
            | DecodeError::MisalignedTable { .. }
            | DecodeError::EmptyLink => AnomalyKind::StructuralMismatch,
        }
    }

    pub(crate) fn truncated(what: &'static str, offset: usize, need: usize, len: usize) -> Self {
        DecodeError::Truncated {
            what,
            offset: offset as u64,
            need,
            have: len.saturating_sub(offset),
        }
    }
}
