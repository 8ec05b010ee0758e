use crate::cluster::{Cluster, LinkRole};
use crate::cluster_info::FamilyType;
use crate::diagnostics::Diagnostics;
use crate::utils::ZoneCursor;

use super::{ClusterParser, RecordKind, RecordState, SubRecord, generic_layout, read_record_link};

/// Families without a dedicated layout table (scripts, pipelines and the unnamed ones).
#[derive(Debug, Clone, Copy)]
pub(crate) struct GenericParser {
    pub(crate) family: FamilyType,
}

impl ClusterParser for GenericParser {
    fn parse_zone(
        &self,
        _cluster: &mut Cluster,
        record: &SubRecord,
        cursor: &mut ZoneCursor<'_>,
        state: RecordState,
        diag: &mut Diagnostics,
    ) -> RecordState {
        match record.kind {
            RecordKind::Data(n) => generic_layout(self.family, record, n, cursor, state, diag),
            _ => state.recognized(),
        }
    }
}

/// Pass-through for unidentified clusters. Accepts any layout.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OpaqueParser;

impl ClusterParser for OpaqueParser {
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
        match read_record_link(cursor, record, n) {
            Ok(link) => state.with_link(link, LinkRole::Generic),
            Err(e) => {
                diag.note(
                    record.start as u64,
                    "cluster",
                    format_args!("opaque sub-record {} without a link: {e}", record.index),
                );
                state.recognized()
            }
        }
    }
}
