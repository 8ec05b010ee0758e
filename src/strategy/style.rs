use crate::cluster::{Cluster, FamilyData, LinkRole, StyleKind};
use crate::cluster_info::FamilyType;
use crate::diagnostics::Diagnostics;
use crate::link::LinkType;
use crate::utils::ZoneCursor;

use super::{
    ClusterParser, RecordKind, RecordState, SubRecord, generic_layout, layout_failed,
    read_record_link,
};

/// Style sheets. The data link is a two-id list of style entries, the name link a unicode list.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StyleParser;

impl ClusterParser for StyleParser {
    fn parse_zone(
        &self,
        cluster: &mut Cluster,
        record: &SubRecord,
        cursor: &mut ZoneCursor<'_>,
        state: RecordState,
        diag: &mut Diagnostics,
    ) -> RecordState {
        let n = match record.kind {
            RecordKind::Header => {
                if let (Some(word), FamilyData::Style(style)) =
                    (cluster.type_word, &mut cluster.family_data)
                {
                    style.kind = Some(StyleKind::from_type_word(word));
                }
                return state.recognized();
            }
            RecordKind::ExtendedHeader => return state.recognized(),
            RecordKind::Data(n) => n,
        };

        if record.f_sz != 0x1e {
            return generic_layout(FamilyType::Style, record, n, cursor, state, diag);
        }

        match read_record_link(cursor, record, n) {
            Ok(link) if link.link_type == LinkType::UnicodeList => {
                state.with_link(link, LinkRole::Name)
            }
            Ok(link) => state.with_link(link, LinkRole::Generic),
            Err(e) => {
                layout_failed(FamilyType::Style, record, cursor, diag, &e);
                state
            }
        }
    }
}
