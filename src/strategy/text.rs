use crate::cluster::{Cluster, FamilyData, LinkRole, NamedLink};
use crate::cluster_info::FamilyType;
use crate::diagnostics::Diagnostics;
use crate::err::DecodeResult;
use crate::link::{Link, LinkType};
use crate::utils::ZoneCursor;

use super::{
    ClusterParser, RecordKind, RecordState, SubRecord, generic_layout, layout_failed,
    read_record_link,
};

const CONTENT: u32 = 0x26;
const POSITIONS: u32 = 0x1c;
const BLOCKS: u32 = 0x20;
const FIXED_POSITIONS: u32 = 0x10;

/// A text flow: the UTF-16 content, its position list and its block list.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TextParser;

/// `u32 id | u32 n | u16 element size`, written by older files in place of a link header.
fn read_fixed_positions(cursor: &mut ZoneCursor<'_>) -> DecodeResult<Link> {
    let mut c = *cursor;
    let id = c.u32_named("text positions id")?;
    let n = c.u32_named("text positions count")?;
    let size = c.u16_named("text positions size")?;
    *cursor = c;
    let link_type = if size > 0 {
        LinkType::FixedSizeList
    } else {
        LinkType::Unknown
    };
    Ok(Link::new(link_type, vec![id], n, u32::from(size)))
}

impl ClusterParser for TextParser {
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

        let named = match record.f_sz {
            CONTENT => {
                let link = match read_record_link(cursor, record, n) {
                    Ok(link) => link.retyped(LinkType::Text),
                    Err(e) => {
                        layout_failed(FamilyType::Text, record, cursor, diag, &e);
                        return state;
                    }
                };
                match cursor.u32_named("text char count") {
                    Ok(count) => {
                        if let FamilyData::Text(text) = &mut cluster.family_data {
                            text.char_count = Some(count);
                        }
                    }
                    Err(e) => layout_failed(FamilyType::Text, record, cursor, diag, &e),
                }
                return state.with_link(link, LinkRole::Named(NamedLink::Content));
            }
            POSITIONS => NamedLink::Positions,
            BLOCKS => NamedLink::Blocks,
            FIXED_POSITIONS => {
                return match read_record_link(cursor, record, n)
                    .or_else(|_| read_fixed_positions(cursor))
                {
                    Ok(link) => state.with_link(link, LinkRole::Named(NamedLink::Positions)),
                    Err(e) => {
                        layout_failed(FamilyType::Text, record, cursor, diag, &e);
                        state
                    }
                };
            }
            _ => return generic_layout(FamilyType::Text, record, n, cursor, state, diag),
        };

        match read_record_link(cursor, record, n) {
            Ok(link) => state.with_link(link, LinkRole::Named(named)),
            Err(e) => {
                layout_failed(FamilyType::Text, record, cursor, diag, &e);
                state
            }
        }
    }
}
