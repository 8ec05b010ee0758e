//! Per-family sub-record strategies.
//!
//! The cluster reader owns the record loop and calls three operations on the family's
//! strategy: [`ClusterParser::parse_zone`] on the sub-record's header bytes,
//! [`ClusterParser::parse_field`] on every field after them and [`ClusterParser::end_zone`] once
//! the record is done. The decode state of the current sub-record ([`RecordState`]) is passed in
//! and handed back by each call; strategies keep nothing between calls.
//!
//! Each family recognizes its sub-records by their inner size (`fSz`). The tables are
//! corpus-derived; unmatched sizes fall back to a generic link attempt.

mod generic;
mod graphic;
mod layout;
mod root;
mod sheet;
mod style;
mod text;

use log::trace;

use crate::cluster::{Cluster, LinkRole};
use crate::cluster_info::FamilyType;
use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::err::DecodeResult;
use crate::field::{Field, tags};
use crate::link::{Link, LinkType, read_link_header};
use crate::utils::ZoneCursor;

pub(crate) use self::generic::{GenericParser, OpaqueParser};
pub(crate) use self::graphic::{GraphicParser, PictureParser};
pub(crate) use self::layout::{ColorPatternParser, LayoutParser};
pub(crate) use self::root::RootParser;
pub(crate) use self::sheet::SpreadsheetParser;
pub(crate) use self::style::StyleParser;
pub(crate) use self::text::TextParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordKind {
    /// `N = -5`: declares the cluster id and type word.
    Header,
    /// `N = -2`.
    ExtendedHeader,
    /// `N >= 0` logical elements.
    Data(u32),
}

/// Framing of one sub-record. All positions are absolute within the zone.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SubRecord {
    pub(crate) index: usize,
    pub(crate) kind: RecordKind,
    pub(crate) flag: u16,
    pub(crate) f_sz: u32,
    pub(crate) start: usize,
    /// First byte after the flag and element count.
    pub(crate) payload_start: usize,
    pub(crate) header_end: usize,
    pub(crate) end: usize,
}

impl SubRecord {
    pub(crate) fn header_room(&self, cursor: &ZoneCursor<'_>) -> usize {
        self.header_end.saturating_sub(cursor.pos())
    }
}

/// Decode state of the sub-record being read.
#[derive(Debug, Default)]
pub(crate) struct RecordState {
    /// Scratch link, committed by `end_zone`.
    pub(crate) link: Option<Link>,
    pub(crate) role: LinkRole,
    pub(crate) recognized: bool,
}

impl RecordState {
    pub(crate) fn with_link(mut self, link: Link, role: LinkRole) -> Self {
        self.link = Some(link);
        self.role = role;
        self.recognized = true;
        self
    }

    pub(crate) fn recognized(mut self) -> Self {
        self.recognized = true;
        self
    }
}

pub(crate) trait ClusterParser {
    /// Interprets the sub-record's header bytes. `cursor` cannot read past `record.header_end`.
    fn parse_zone(
        &self,
        cluster: &mut Cluster,
        record: &SubRecord,
        cursor: &mut ZoneCursor<'_>,
        state: RecordState,
        diag: &mut Diagnostics,
    ) -> RecordState;

    fn parse_field(
        &self,
        cluster: &mut Cluster,
        field: Field,
        _index: usize,
        state: RecordState,
        diag: &mut Diagnostics,
    ) -> RecordState {
        claim_common_field(cluster, field, state, diag)
    }

    fn end_zone(&self, cluster: &mut Cluster, state: RecordState, _diag: &mut Diagnostics) {
        if let Some(link) = state.link {
            cluster.commit(link, state.role);
        }
    }
}

/// Handles the fields every family understands. Everything else is kept on the cluster.
pub(crate) fn claim_common_field(
    cluster: &mut Cluster,
    field: Field,
    mut state: RecordState,
    diag: &mut Diagnostics,
) -> RecordState {
    match (field.tag, field.as_long_list()) {
        (tags::CLUSTER_ID_LIST, Some(ids)) => {
            cluster
                .child_ids
                .extend(ids.iter().copied().filter(|&id| id != 0));
        }
        (tags::POSITION_TABLE, Some(positions)) => match state.link.as_mut() {
            Some(link) => link.long_list.extend_from_slice(positions),
            None => {
                diag.anomaly(
                    AnomalyKind::StructuralMismatch,
                    field.position,
                    "cluster",
                    "position table without a link in the same sub-record",
                );
                cluster.fields.push(field);
            }
        },
        _ => {
            trace!("{:#x}: keeping field {:#x}", field.position, field.tag);
            diag.note(field.position, "cluster", format_args!("field {:#x}", field.tag));
            cluster.fields.push(field);
        }
    }
    state
}

/// Reads a link header filling the rest of the sub-record header.
pub(crate) fn read_record_link(
    cursor: &mut ZoneCursor<'_>,
    record: &SubRecord,
    n: u32,
) -> DecodeResult<Link> {
    let room = record.header_room(cursor);
    read_link_header(cursor, room, n)
}

/// Fallback for sub-records a family does not know: take whatever link header is there.
pub(crate) fn generic_layout(
    family: FamilyType,
    record: &SubRecord,
    n: u32,
    cursor: &mut ZoneCursor<'_>,
    state: RecordState,
    diag: &mut Diagnostics,
) -> RecordState {
    match read_record_link(cursor, record, n) {
        Ok(link) => state.with_link(link, LinkRole::Generic),
        Err(e) => {
            diag.anomaly_in(
                AnomalyKind::UnknownTag,
                cursor.buf(),
                record.start,
                "cluster",
                format_args!(
                    "{family}: unknown layout (N={n}, fSz={:#x}): {e}",
                    record.f_sz
                ),
            );
            state
        }
    }
}

/// Reports a failed read of a layout the family does recognize.
pub(crate) fn layout_failed(
    family: FamilyType,
    record: &SubRecord,
    cursor: &ZoneCursor<'_>,
    diag: &mut Diagnostics,
    e: &crate::err::DecodeError,
) {
    diag.anomaly_in(
        e.class(),
        cursor.buf(),
        record.start,
        "cluster",
        format_args!("{family}: sub-record {} (fSz={:#x}): {e}", record.index, record.f_sz),
    );
}

/// Retypes links that point at a whole zone without an element layout.
pub(crate) fn as_cluster_link(link: Link) -> Link {
    if link.link_type == LinkType::Unknown {
        link.retyped(LinkType::ClusterLink)
    } else {
        link
    }
}

/// The strategies, selected by family.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FamilyParser {
    Root(RootParser),
    Text(TextParser),
    Graphic(GraphicParser),
    Picture(PictureParser),
    Spreadsheet(SpreadsheetParser),
    Style(StyleParser),
    Layout(LayoutParser),
    ColorPattern(ColorPatternParser),
    Generic(GenericParser),
    Opaque(OpaqueParser),
}

impl FamilyParser {
    pub(crate) fn for_family(family: FamilyType) -> FamilyParser {
        match family {
            FamilyType::Root => FamilyParser::Root(RootParser),
            FamilyType::Text => FamilyParser::Text(TextParser),
            FamilyType::Graphic => FamilyParser::Graphic(GraphicParser),
            FamilyType::Picture => FamilyParser::Picture(PictureParser),
            FamilyType::Spreadsheet => FamilyParser::Spreadsheet(SpreadsheetParser),
            FamilyType::Style => FamilyParser::Style(StyleParser),
            FamilyType::Layout => FamilyParser::Layout(LayoutParser),
            FamilyType::ColorPattern => FamilyParser::ColorPattern(ColorPatternParser),
            FamilyType::Script
            | FamilyType::Pipeline
            | FamilyType::UnknownA
            | FamilyType::UnknownB
            | FamilyType::UnknownC => FamilyParser::Generic(GenericParser { family }),
            FamilyType::Opaque => FamilyParser::Opaque(OpaqueParser),
        }
    }

    pub(crate) fn as_parser(&self) -> &dyn ClusterParser {
        match self {
            FamilyParser::Root(p) => p,
            FamilyParser::Text(p) => p,
            FamilyParser::Graphic(p) => p,
            FamilyParser::Picture(p) => p,
            FamilyParser::Spreadsheet(p) => p,
            FamilyParser::Style(p) => p,
            FamilyParser::Layout(p) => p,
            FamilyParser::ColorPattern(p) => p,
            FamilyParser::Generic(p) => p,
            FamilyParser::Opaque(p) => p,
        }
    }
}
