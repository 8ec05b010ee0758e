use crate::cluster::{Cluster, FamilyData, LinkRole, NamedLink};
use crate::cluster_info::FamilyType;
use crate::diagnostics::Diagnostics;
use crate::link::LinkType;
use crate::utils::ZoneCursor;

use super::{
    ClusterParser, RecordKind, RecordState, SubRecord, generic_layout, layout_failed,
    read_record_link,
};

/// Shapes and their transforms.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GraphicParser;

impl ClusterParser for GraphicParser {
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
            0x1e => NamedLink::Shapes,
            0x1c => NamedLink::Transforms,
            _ => return generic_layout(FamilyType::Graphic, record, n, cursor, state, diag),
        };

        match read_record_link(cursor, record, n) {
            Ok(link) => {
                // Shape data without a fixed stride is kept whole.
                let link = if named == NamedLink::Shapes && link.link_type == LinkType::Unknown {
                    link.retyped(LinkType::Graphic)
                } else {
                    link
                };
                state.with_link(link, LinkRole::Named(named))
            }
            Err(e) => {
                layout_failed(FamilyType::Graphic, record, cursor, diag, &e);
                state
            }
        }
    }
}

const PICTURE: u32 = 0x22;

/// Embedded pictures: one data link plus the picture dimensions.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PictureParser;

impl ClusterParser for PictureParser {
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
        if record.f_sz != PICTURE {
            return generic_layout(FamilyType::Picture, record, n, cursor, state, diag);
        }

        let link = match read_record_link(cursor, record, n) {
            Ok(link) => link.retyped(LinkType::Picture),
            Err(e) => {
                layout_failed(FamilyType::Picture, record, cursor, diag, &e);
                return state;
            }
        };

        let dims = cursor
            .u16_named("picture width")
            .and_then(|w| Ok((w, cursor.u16_named("picture height")?)));
        match dims {
            Ok((width, height)) => {
                if let FamilyData::Picture(picture) = &mut cluster.family_data {
                    picture.width = Some(width);
                    picture.height = Some(height);
                }
            }
            Err(e) => layout_failed(FamilyType::Picture, record, cursor, diag, &e),
        }

        state.with_link(link, LinkRole::Named(NamedLink::Picture))
    }
}
