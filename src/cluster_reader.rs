//! The generic sub-record loop shared by every cluster family.
//!
//! A cluster zone starts with an 8-byte prologue followed by sub-records:
//!
//! ```text
//! VarInt tag | VarInt sz | VarInt fSz | u16 flag | i32 N | header bytes ... | fields ...
//!                        |<------------------- sz bytes ------------------------------>|
//!                                    |<-------- fSz bytes -------->|
//! ```
//!
//! Every sub-record is read inside its declared boundary and the loop reseeks to that boundary
//! afterwards, so a damaged sub-record never desynchronizes the next one.

use log::{debug, trace};

use crate::cluster::Cluster;
use crate::cluster_info::FamilyType;
use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::err::{DecodeError, DecodeResult};
use crate::field::read_field;
use crate::strategy::{FamilyParser, RecordKind, RecordState, SubRecord};
use crate::utils::ZoneCursor;
use crate::varint::read_varint;
use crate::zone::Zone;

/// Smallest zone that can hold the prologue and one sub-record frame.
pub const MIN_CLUSTER_LEN: usize = 13;

const PROLOGUE: [u16; 4] = [0x5a61, 0x0601, 0, 0];
const PROLOGUE_LEN: usize = 8;

const HEADER_SENTINEL: i32 = -5;
const EXTENDED_HEADER_SENTINEL: i32 = -2;
const MIN_INNER_SIZE: u32 = 6;

/// How many sub-records the classifier looks at before giving up.
const CLASSIFY_RECORDS: usize = 4;

/// Reads `tag | sz`. `Ok(None)` is the normal end of the record list.
fn read_record_end(cursor: &mut ZoneCursor<'_>, zone_end: usize) -> DecodeResult<Option<usize>> {
    let start = cursor.pos();
    let _tag = read_varint(cursor, zone_end)?;
    let sz = match read_varint(cursor, zone_end) {
        Ok(sz) => sz,
        Err(e) => {
            cursor.rewind(start);
            return Err(e);
        }
    };

    let end = cursor.pos().saturating_add(sz as usize);
    if sz <= 7 || end > zone_end {
        trace!("{start:#x}: end of sub-records (sz={sz})");
        return Ok(None);
    }
    Ok(Some(end))
}

/// Reads `fSz | flag | N` of a sub-record ending at `end`.
fn read_sub_record(
    cursor: &mut ZoneCursor<'_>,
    index: usize,
    start: usize,
    end: usize,
) -> DecodeResult<SubRecord> {
    let f_sz_pos = cursor.pos();
    let f_sz = read_varint(cursor, end)?;
    let header_end = cursor.pos().saturating_add(f_sz as usize);
    if f_sz < MIN_INNER_SIZE || header_end > end {
        return Err(DecodeError::InvalidFieldSize {
            offset: f_sz_pos as u64,
            size: f_sz,
        });
    }

    let mut c = cursor.limited(header_end)?;
    let flag = c.u16_named("sub-record flag")?;
    let n_pos = c.position();
    let n = c.i32_named("sub-record count")?;
    let kind = match n {
        HEADER_SENTINEL => RecordKind::Header,
        EXTENDED_HEADER_SENTINEL => RecordKind::ExtendedHeader,
        n if n >= 0 => RecordKind::Data(n as u32),
        n => return Err(DecodeError::InvalidSentinel { offset: n_pos, n }),
    };

    Ok(SubRecord {
        index,
        kind,
        flag,
        f_sz,
        start,
        payload_start: c.pos(),
        header_end,
        end,
    })
}

/// Guesses a cluster's family from the inner size of its header sub-records.
pub fn classify_zone(zone: &Zone<'_>) -> Option<FamilyType> {
    if zone.len() < MIN_CLUSTER_LEN {
        return None;
    }
    let mut cursor = ZoneCursor::for_zone(zone);
    cursor.advance(PROLOGUE_LEN, "prologue").ok()?;

    for index in 0..CLASSIFY_RECORDS {
        let start = cursor.pos();
        let end = read_record_end(&mut cursor, zone.len()).ok()??;
        if let Ok(record) = read_sub_record(&mut cursor, index, start, end) {
            let family = match record.kind {
                RecordKind::Header => FamilyType::from_header_fingerprint(record.f_sz),
                RecordKind::ExtendedHeader => FamilyType::from_extended_fingerprint(record.f_sz),
                RecordKind::Data(_) => None,
            };
            if family.is_some() {
                return family;
            }
        }
        cursor.set_pos(end, "sub-record end").ok()?;
    }
    None
}

fn check_prologue(cursor: &mut ZoneCursor<'_>, diag: &mut Diagnostics) -> DecodeResult<()> {
    let mut values = [0u16; 4];
    for v in values.iter_mut() {
        *v = cursor.u16_named("prologue")?;
    }
    if values != PROLOGUE {
        diag.anomaly(
            AnomalyKind::Plausibility,
            0,
            "cluster",
            format_args!("unexpected prologue {values:04x?}"),
        );
    }
    Ok(())
}

fn read_header_payload(cluster: &mut Cluster, cursor: &mut ZoneCursor<'_>) -> DecodeResult<()> {
    let declared_id = cursor.u32_named("cluster declared id")?;
    let type_word = cursor.u16_named("cluster type word")?;
    trace!(
        "zone {}: header declares id {declared_id}, type {type_word:#x}",
        cluster.id
    );
    cluster.declared_id = Some(declared_id);
    cluster.type_word = Some(type_word);
    Ok(())
}

fn read_record(
    cluster: &mut Cluster,
    parser: &FamilyParser,
    record: &SubRecord,
    cursor: &mut ZoneCursor<'_>,
    max_field_depth: usize,
    diag: &mut Diagnostics,
) -> DecodeResult<()> {
    let parser = parser.as_parser();
    trace!(
        "{:#x}: sub-record {} {:?} flag={:#x} fSz={:#x} end={:#x}",
        record.start, record.index, record.kind, record.flag, record.f_sz, record.end
    );

    let mut header = cursor.limited(record.header_end)?;
    header.set_pos(record.payload_start, "sub-record payload")?;

    if record.kind == RecordKind::Header {
        if let Err(e) = read_header_payload(cluster, &mut header) {
            diag.anomaly_in(e.class(), cursor.buf(), record.start, "cluster", &e);
        }
    }

    let mut state = parser.parse_zone(cluster, record, &mut header, RecordState::default(), diag);
    if !state.recognized {
        debug!(
            "zone {}: sub-record {} not understood by the {} strategy",
            cluster.id, record.index, cluster.family
        );
    }

    cursor.set_pos(record.header_end, "sub-record header end")?;
    let mut index = 0;
    while cursor.pos() < record.end {
        match read_field(cursor, record.end, max_field_depth, diag) {
            Ok(Some(field)) => {
                state = parser.parse_field(cluster, field, index, state, diag);
                index += 1;
            }
            Ok(None) => break,
            Err(e) => {
                diag.anomaly_in(e.class(), cursor.buf(), cursor.pos(), "cluster", &e);
                break;
            }
        }
    }

    parser.end_zone(cluster, state, diag);

    let left = record.end - cursor.pos().min(record.end);
    if left > 0 {
        diag.anomaly(
            AnomalyKind::Plausibility,
            cursor.position(),
            "cluster",
            format_args!("{left} unconsumed byte(s) at the end of sub-record {}", record.index),
        );
    }
    Ok(())
}

/// Decodes one cluster zone.
///
/// `family` comes from the ClusterInfo table when available; otherwise the family is guessed
/// from the header fingerprint, falling back to the pass-through strategy. The only error is a
/// zone too short to hold a cluster; every other problem is recorded in `diag`.
pub fn read_cluster(
    zone: &Zone<'_>,
    family: Option<FamilyType>,
    max_field_depth: usize,
    diag: &mut Diagnostics,
) -> DecodeResult<Cluster> {
    if zone.len() < MIN_CLUSTER_LEN {
        return Err(DecodeError::ZoneTooShort {
            id: zone.id,
            len: zone.len(),
        });
    }

    let family = match family.or_else(|| classify_zone(zone)) {
        Some(family) => family,
        None => {
            diag.anomaly(
                AnomalyKind::UnknownTag,
                0,
                "cluster",
                format_args!("zone {}: no family fingerprint matched", zone.id),
            );
            FamilyType::Opaque
        }
    };
    debug!("zone {}: reading {family} cluster ({} bytes)", zone.id, zone.len());

    let mut cluster = Cluster::new(zone.id, family, zone.endianness);
    let parser = FamilyParser::for_family(family);
    let zone_end = zone.len();

    let mut cursor = ZoneCursor::for_zone(zone);
    check_prologue(&mut cursor, diag)?;

    let mut index = 0;
    while cursor.pos() < zone_end {
        let start = cursor.pos();
        let end = match read_record_end(&mut cursor, zone_end) {
            Ok(Some(end)) => end,
            Ok(None) => break,
            Err(e) => {
                diag.anomaly_in(e.class(), zone.data, start, "cluster", &e);
                break;
            }
        };

        let outcome = read_sub_record(&mut cursor, index, start, end).and_then(|record| {
            read_record(&mut cluster, &parser, &record, &mut cursor, max_field_depth, diag)
        });
        if let Err(e) = outcome {
            diag.anomaly_in(e.class(), zone.data, start, "cluster", &e);
        }

        cursor.set_pos(end, "sub-record end")?;
        index += 1;
    }

    cluster.record_count = index;
    Ok(cluster)
}
