use crate::cluster::{Cluster, LinkRole, NamedLink};
use crate::cluster_info::FamilyType;
use crate::diagnostics::Diagnostics;
use crate::link::LinkType;
use crate::utils::ZoneCursor;

use super::{
    ClusterParser, RecordKind, RecordState, SubRecord, generic_layout, layout_failed,
    read_record_link,
};

/// Page layouts. The page link always points at page clusters.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LayoutParser;

impl ClusterParser for LayoutParser {
    fn parse_zone(
        &self,
        _cluster: &mut Cluster,
        record: &SubRecord,
        cursor: &mut ZoneCursor<'_>,
        state: RecordState,
        diag: &mut Diagnostics,
    ) -> RecordState {
        let RecordKind::Data(n) = record.kind else {
            return state.recognized();
        };
        if record.f_sz != 0x1e {
            return generic_layout(FamilyType::Layout, record, n, cursor, state, diag);
        }

        match read_record_link(cursor, record, n) {
            Ok(link) => state.with_link(
                link.retyped(LinkType::ClusterLink),
                LinkRole::Named(NamedLink::Pages),
            ),
            Err(e) => {
                layout_failed(FamilyType::Layout, record, cursor, diag, &e);
                state
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ColorPatternParser;

impl ClusterParser for ColorPatternParser {
    fn parse_zone(
        &self,
        _cluster: &mut Cluster,
        record: &SubRecord,
        cursor: &mut ZoneCursor<'_>,
        state: RecordState,
        diag: &mut Diagnostics,
    ) -> RecordState {
        let RecordKind::Data(n) = record.kind else {
            return state.recognized();
        };

        let named = match record.f_sz {
            0x1e => NamedLink::Colors,
            0x1c => NamedLink::Patterns,
            _ => return generic_layout(FamilyType::ColorPattern, record, n, cursor, state, diag),
        };

        match read_record_link(cursor, record, n) {
            Ok(link) => state.with_link(link, LinkRole::Named(named)),
            Err(e) => {
                layout_failed(FamilyType::ColorPattern, record, cursor, diag, &e);
                state
            }
        }
    }
}
