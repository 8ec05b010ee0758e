//! Cluster families and the ClusterInfo side-table.
//!
//! The "main list" zone declares, for every cluster zone, its family and display name:
//!
//! ```text
//! repeated { u32 zone id | u16 family code | u16 name length (UTF-16 units) | name }
//! ```

use std::fmt;

use hashbrown::HashMap;
use log::{debug, trace};
use serde::Serialize;

use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::err::DecodeResult;
use crate::utils::{ZoneCursor, decode_utf16_units_z};
use crate::zone::{Zone, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FamilyType {
    Root,
    Script,
    Pipeline,
    Style,
    Layout,
    ColorPattern,
    Graphic,
    Picture,
    Text,
    Spreadsheet,
    UnknownA,
    UnknownB,
    UnknownC,
    /// Not identified; decoded by the pass-through strategy.
    Opaque,
}

impl FamilyType {
    /// Families in main-list code order (code 1 is `Root`).
    pub const DECLARED: [FamilyType; 13] = [
        FamilyType::Root,
        FamilyType::Script,
        FamilyType::Pipeline,
        FamilyType::Style,
        FamilyType::Layout,
        FamilyType::ColorPattern,
        FamilyType::Graphic,
        FamilyType::Picture,
        FamilyType::Text,
        FamilyType::Spreadsheet,
        FamilyType::UnknownA,
        FamilyType::UnknownB,
        FamilyType::UnknownC,
    ];

    pub fn from_code(code: u16) -> Option<FamilyType> {
        let index = usize::from(code).checked_sub(1)?;
        Self::DECLARED.get(index).copied()
    }

    pub fn code(&self) -> Option<u16> {
        Self::DECLARED
            .iter()
            .position(|f| f == self)
            .map(|i| i as u16 + 1)
    }

    /// Family whose header sub-record (`N = -5`) has this inner size.
    pub fn from_header_fingerprint(f_sz: u32) -> Option<FamilyType> {
        Some(match f_sz {
            0x34 => FamilyType::Root,
            0x2c => FamilyType::Script,
            0x3e => FamilyType::Pipeline,
            0x20 => FamilyType::Style,
            0x4a => FamilyType::Layout,
            0x22 => FamilyType::ColorPattern,
            0x38 => FamilyType::Graphic,
            0x30 => FamilyType::Picture,
            0x40 => FamilyType::Text,
            0x46 => FamilyType::Spreadsheet,
            0x24 => FamilyType::UnknownA,
            0x28 => FamilyType::UnknownB,
            0x1c => FamilyType::UnknownC,
            _ => return None,
        })
    }

    /// Family whose extended header sub-record (`N = -2`) has this inner size.
    pub fn from_extended_fingerprint(f_sz: u32) -> Option<FamilyType> {
        Some(match f_sz {
            0x1a => FamilyType::Text,
            0x16 => FamilyType::Spreadsheet,
            0x12 => FamilyType::Graphic,
            _ => return None,
        })
    }
}

impl fmt::Display for FamilyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn read_entry(cursor: &mut ZoneCursor<'_>) -> DecodeResult<(ZoneId, u16, String)> {
    let id = cursor.u32_named("info zone id")?;
    let code = cursor.u16_named("info family code")?;
    let name_len = cursor.u16_named("info name length")?;
    let units = cursor.u16_vec(usize::from(name_len), "info name")?;
    Ok((id, code, decode_utf16_units_z(&units)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterInfo {
    pub family: FamilyType,
    pub name: String,
}

/// Declared family and name of each cluster zone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterInfoTable {
    entries: HashMap<ZoneId, ClusterInfo>,
}

impl ClusterInfoTable {
    pub fn new() -> Self {
        ClusterInfoTable::default()
    }

    /// Parses a main-list zone. Unknown family codes are skipped; a truncated entry ends the
    /// table.
    pub fn from_zone(zone: &Zone<'_>, diag: &mut Diagnostics) -> Self {
        let mut table = ClusterInfoTable::new();
        let mut cursor = ZoneCursor::for_zone(zone);

        while cursor.remaining() > 0 {
            let entry_start = cursor.pos();
            match read_entry(&mut cursor) {
                Ok((id, code, name)) => match FamilyType::from_code(code) {
                    Some(family) => {
                        trace!("zone {id}: declared {family} `{name}`");
                        table.insert(id, family, name);
                    }
                    None => diag.anomaly(
                        AnomalyKind::UnknownTag,
                        entry_start as u64,
                        "cluster info",
                        format_args!("zone {id}: unknown family code {code}"),
                    ),
                },
                Err(e) => {
                    debug!("cluster info truncated at {entry_start:#x}: {e}");
                    diag.anomaly_in(e.class(), zone.data, entry_start, "cluster info", &e);
                    break;
                }
            }
        }

        table
    }

    pub fn insert(&mut self, id: ZoneId, family: FamilyType, name: impl Into<String>) {
        self.entries.insert(
            id,
            ClusterInfo {
                family,
                name: name.into(),
            },
        );
    }

    pub fn get(&self, id: ZoneId) -> Option<&ClusterInfo> {
        self.entries.get(&id)
    }

    pub fn family(&self, id: ZoneId) -> Option<FamilyType> {
        self.get(id).map(|info| info.family)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
