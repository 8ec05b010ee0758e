use crate::cluster::{Cluster, LinkRole, NamedLink};
use crate::cluster_info::FamilyType;
use crate::diagnostics::Diagnostics;
use crate::utils::ZoneCursor;

use super::{
    ClusterParser, RecordKind, RecordState, SubRecord, generic_layout, layout_failed,
    read_record_link,
};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SpreadsheetParser;

impl ClusterParser for SpreadsheetParser {
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
            0x1e => NamedLink::Cells,
            0x20 => NamedLink::Rows,
            _ => return generic_layout(FamilyType::Spreadsheet, record, n, cursor, state, diag),
        };

        match read_record_link(cursor, record, n) {
            Ok(link) => state.with_link(link, LinkRole::Named(named)),
            Err(e) => {
                layout_failed(FamilyType::Spreadsheet, record, cursor, diag, &e);
                state
            }
        }
    }
}
