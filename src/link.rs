//! Link headers: typed references from a cluster to other zones.
//!
//! The header layout, in zone byte order:
//!
//! ```text
//! u32 tag | u32 reserved | 4 x u16 reserved | u16 secondary tag | [u16 element size] | ids
//! ```
//!
//! The element size is absent for the short fixed-layout tags (the size is then 4). Each id is an
//! "optional id": a u16 presence flag followed by a u16 id when the flag is set.
//!
//! The format is probabilistic: the same bytes in another family may not be a link at all, so a
//! failed read leaves the cursor where it was and callers are free to try another layout.

use serde::Serialize;

use crate::err::{DecodeError, DecodeResult};
use crate::utils::ZoneCursor;
use crate::zone::ZoneId;

/// Tags of links whose element size is implicitly 4.
pub const SHORT_FIXED_TAGS: [u32; 3] = [0x0003_5800, 0x0003_5c00, 0x0003_6000];
/// Tags of links to a list of UTF-16 strings.
pub const UNICODE_LIST_TAGS: [u32; 2] = [0x0017_5000, 0x0017_5800];
/// Set in the secondary tag of a link declared without data.
pub const NO_DATA_BIT: u16 = 0x0020;

/// Element sizes that really are the first id flag of a two-id link.
const TWO_ID_SENTINELS: [u16; 3] = [0, 1, 0x100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkType {
    List,
    UnicodeList,
    FixedSizeList,
    ClusterLink,
    Text,
    Graphic,
    Picture,
    Unknown,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::List => "list",
            LinkType::UnicodeList => "unicode list",
            LinkType::FixedSizeList => "fixed-size list",
            LinkType::ClusterLink => "cluster link",
            LinkType::Text => "text",
            LinkType::Graphic => "graphic",
            LinkType::Picture => "picture",
            LinkType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub link_type: LinkType,
    /// Referenced zones, in header order. Absent ids are stored as 0.
    pub ids: Vec<ZoneId>,
    /// Declared element count.
    pub n: u32,
    pub element_size: u32,
    /// The raw tag and secondary tag.
    pub type_tags: [u32; 2],
    /// Offsets carried by a position-table field of the same sub-record.
    pub long_list: Vec<u32>,
}

impl Link {
    pub fn new(link_type: LinkType, ids: Vec<ZoneId>, n: u32, element_size: u32) -> Self {
        Link {
            link_type,
            ids,
            n,
            element_size,
            type_tags: [0, 0],
            long_list: Vec::new(),
        }
    }

    /// A link is empty when it does not reference any zone.
    pub fn is_empty(&self) -> bool {
        self.ids.iter().all(|&id| id == 0)
    }

    pub fn nonzero_ids(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.ids.iter().copied().filter(|&id| id != 0)
    }

    pub fn retyped(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn tag(&self) -> u32 {
        self.type_tags[0]
    }

    pub fn secondary_tag(&self) -> u16 {
        self.type_tags[1] as u16
    }
}

fn classify(tag: u32, id_count: usize, element_size: u32) -> LinkType {
    if UNICODE_LIST_TAGS.contains(&tag) {
        LinkType::UnicodeList
    } else if id_count == 2 {
        LinkType::List
    } else if element_size > 0 {
        LinkType::FixedSizeList
    } else {
        LinkType::Unknown
    }
}

/// Reads a u16 presence flag and, when set, a u16 id. A flag of `0x100` is a byte-swapped `1`
/// and is accepted as such.
fn read_optional_id(cursor: &mut ZoneCursor<'_>) -> DecodeResult<ZoneId> {
    let offset = cursor.position();
    match cursor.u16_named("link id flag")? {
        0 => Ok(0),
        1 | 0x100 => Ok(ZoneId::from(cursor.u16_named("link id")?)),
        flag => Err(DecodeError::InvalidIdFlag { offset, flag }),
    }
}

fn read_link_header_inner(cursor: &mut ZoneCursor<'_>, n: u32) -> DecodeResult<Link> {
    let start = cursor.position();

    let tag = cursor.u32_named("link tag")?;
    cursor.advance(4 + 4 * 2, "link reserved")?;
    let secondary = cursor.u16_named("link secondary tag")?;

    let (ids, element_size) = if SHORT_FIXED_TAGS.contains(&tag) {
        (vec![read_optional_id(cursor)?], 4)
    } else {
        let size_pos = cursor.pos();
        let size = cursor.u16_named("link element size")?;
        if TWO_ID_SENTINELS.contains(&size) {
            cursor.rewind(size_pos);
            let first = read_optional_id(cursor)?;
            let second = read_optional_id(cursor)?;
            (vec![first, second], 0)
        } else {
            (vec![read_optional_id(cursor)?], u32::from(size))
        }
    };

    let first_id = ids.first().copied().unwrap_or(0);
    if n != 0 && (first_id == 0) != (secondary & NO_DATA_BIT != 0) {
        return Err(DecodeError::LinkConsistency {
            offset: start,
            first_id,
            secondary_tag: secondary,
        });
    }

    Ok(Link {
        link_type: classify(tag, ids.len(), element_size),
        ids,
        n,
        element_size,
        type_tags: [tag, u32::from(secondary)],
        long_list: Vec::new(),
    })
}

/// Reads a link header of at most `declared_size` bytes for a sub-record declaring `n` elements.
///
/// On failure the cursor is not moved.
pub fn read_link_header(
    cursor: &mut ZoneCursor<'_>,
    declared_size: usize,
    n: u32,
) -> DecodeResult<Link> {
    let end = cursor
        .pos()
        .saturating_add(declared_size)
        .min(cursor.len());
    let mut scratch = cursor.limited(end)?;
    let link = read_link_header_inner(&mut scratch, n)?;
    cursor.set_pos(scratch.pos(), "link end")?;
    Ok(link)
}
