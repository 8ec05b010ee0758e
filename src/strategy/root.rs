use crate::cluster::{Cluster, FamilyData, LinkRole, NamedLink};
use crate::cluster_info::FamilyType;
use crate::diagnostics::Diagnostics;
use crate::link::LinkType;
use crate::utils::ZoneCursor;

use super::{
    ClusterParser, RecordKind, RecordState, SubRecord, as_cluster_link, generic_layout,
    layout_failed, read_record_link,
};

const NAME_OR_DATA: u32 = 0x1e;
const CLUSTER_LIST: u32 = 0x1c;
const DOC_INFO: u32 = 0x24;

/// The document root: names, the document info link and lists of top-level clusters.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RootParser;

impl ClusterParser for RootParser {
    fn parse_zone(
        &self,
        cluster: &mut Cluster,
        record: &SubRecord,
        cursor: &mut ZoneCursor<'_>,
        state: RecordState,
        diag: &mut Diagnostics,
    ) -> RecordState {
        let RecordKind::Data(n) = record.kind else {
            return state.recognized();
        };

        match record.f_sz {
            NAME_OR_DATA => match read_record_link(cursor, record, n) {
                Ok(link) if link.link_type == LinkType::UnicodeList => {
                    state.with_link(link, LinkRole::Name)
                }
                Ok(link) => state.with_link(as_cluster_link(link), LinkRole::Generic),
                Err(e) => {
                    layout_failed(FamilyType::Root, record, cursor, diag, &e);
                    state
                }
            },
            CLUSTER_LIST => match read_record_link(cursor, record, n) {
                Ok(link) => state.with_link(link, LinkRole::Named(NamedLink::ClusterList)),
                Err(e) => {
                    layout_failed(FamilyType::Root, record, cursor, diag, &e);
                    state
                }
            },
            DOC_INFO => {
                let link = match read_record_link(cursor, record, n) {
                    Ok(link) => link,
                    Err(e) => {
                        layout_failed(FamilyType::Root, record, cursor, diag, &e);
                        return state;
                    }
                };
                match cursor.u32_named("root version") {
                    Ok(version) => {
                        if let FamilyData::Root(root) = &mut cluster.family_data {
                            root.version = Some(version);
                        }
                    }
                    Err(e) => layout_failed(FamilyType::Root, record, cursor, diag, &e),
                }
                state.with_link(link, LinkRole::Named(NamedLink::DocInfo))
            }
            _ => generic_layout(FamilyType::Root, record, n, cursor, state, diag),
        }
    }
}
