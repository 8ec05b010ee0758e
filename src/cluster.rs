use serde::Serialize;

use crate::cluster_info::FamilyType;
use crate::field::Field;
use crate::link::Link;
use crate::zone::{Endianness, ZoneId};

/// The kind of style sheet a Style cluster holds, from its header type word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StyleKind {
    Graphic,
    Text,
    Format,
    Unit,
    Other(u16),
}

impl StyleKind {
    pub fn from_type_word(word: u16) -> StyleKind {
        match word {
            1 => StyleKind::Graphic,
            2 => StyleKind::Text,
            3 => StyleKind::Format,
            4 => StyleKind::Unit,
            other => StyleKind::Other(other),
        }
    }
}

/// Family-specific link slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NamedLink {
    DocInfo,
    ClusterList,
    Content,
    Positions,
    Blocks,
    Shapes,
    Transforms,
    Picture,
    Cells,
    Rows,
    Pages,
    Colors,
    Patterns,
}

/// Where a strategy wants the link of the current sub-record to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkRole {
    /// Main data link, or overflow once that is taken.
    #[default]
    Generic,
    /// Name link, or overflow once that is taken.
    Name,
    Named(NamedLink),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RootData {
    pub doc_info: Option<Link>,
    pub version: Option<u32>,
    /// Links to zones holding fixed-size lists of cluster ids.
    pub cluster_lists: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextData {
    pub content: Option<Link>,
    pub char_count: Option<u32>,
    pub positions: Option<Link>,
    pub blocks: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphicData {
    pub shapes: Option<Link>,
    pub transforms: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PictureData {
    pub picture: Option<Link>,
    pub width: Option<u16>,
    pub height: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpreadsheetData {
    pub cells: Option<Link>,
    pub rows: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleData {
    pub kind: Option<StyleKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutData {
    pub pages: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColorPatternData {
    pub colors: Option<Link>,
    pub patterns: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub enum FamilyData {
    #[default]
    None,
    Root(RootData),
    Text(TextData),
    Graphic(GraphicData),
    Picture(PictureData),
    Spreadsheet(SpreadsheetData),
    Style(StyleData),
    Layout(LayoutData),
    ColorPattern(ColorPatternData),
}

impl FamilyData {
    pub fn for_family(family: FamilyType) -> FamilyData {
        match family {
            FamilyType::Root => FamilyData::Root(RootData::default()),
            FamilyType::Text => FamilyData::Text(TextData::default()),
            FamilyType::Graphic => FamilyData::Graphic(GraphicData::default()),
            FamilyType::Picture => FamilyData::Picture(PictureData::default()),
            FamilyType::Spreadsheet => FamilyData::Spreadsheet(SpreadsheetData::default()),
            FamilyType::Style => FamilyData::Style(StyleData::default()),
            FamilyType::Layout => FamilyData::Layout(LayoutData::default()),
            FamilyType::ColorPattern => FamilyData::ColorPattern(ColorPatternData::default()),
            _ => FamilyData::None,
        }
    }

    fn slot_mut(&mut self, named: NamedLink) -> Option<&mut Option<Link>> {
        Some(match (self, named) {
            (FamilyData::Root(d), NamedLink::DocInfo) => &mut d.doc_info,
            (FamilyData::Text(d), NamedLink::Content) => &mut d.content,
            (FamilyData::Text(d), NamedLink::Positions) => &mut d.positions,
            (FamilyData::Text(d), NamedLink::Blocks) => &mut d.blocks,
            (FamilyData::Graphic(d), NamedLink::Shapes) => &mut d.shapes,
            (FamilyData::Graphic(d), NamedLink::Transforms) => &mut d.transforms,
            (FamilyData::Picture(d), NamedLink::Picture) => &mut d.picture,
            (FamilyData::Spreadsheet(d), NamedLink::Cells) => &mut d.cells,
            (FamilyData::Spreadsheet(d), NamedLink::Rows) => &mut d.rows,
            (FamilyData::Layout(d), NamedLink::Pages) => &mut d.pages,
            (FamilyData::ColorPattern(d), NamedLink::Colors) => &mut d.colors,
            (FamilyData::ColorPattern(d), NamedLink::Patterns) => &mut d.patterns,
            _ => return None,
        })
    }

    /// Every link held in a family slot.
    pub fn named_links(&self) -> Vec<(NamedLink, &Link)> {
        let slots: Vec<(NamedLink, Option<&Link>)> = match self {
            FamilyData::Root(d) => {
                let mut slots = vec![(NamedLink::DocInfo, d.doc_info.as_ref())];
                slots.extend(d.cluster_lists.iter().map(|l| (NamedLink::ClusterList, Some(l))));
                slots
            }
            FamilyData::Text(d) => vec![
                (NamedLink::Content, d.content.as_ref()),
                (NamedLink::Positions, d.positions.as_ref()),
                (NamedLink::Blocks, d.blocks.as_ref()),
            ],
            FamilyData::Graphic(d) => vec![
                (NamedLink::Shapes, d.shapes.as_ref()),
                (NamedLink::Transforms, d.transforms.as_ref()),
            ],
            FamilyData::Picture(d) => vec![(NamedLink::Picture, d.picture.as_ref())],
            FamilyData::Spreadsheet(d) => vec![
                (NamedLink::Cells, d.cells.as_ref()),
                (NamedLink::Rows, d.rows.as_ref()),
            ],
            FamilyData::Layout(d) => vec![(NamedLink::Pages, d.pages.as_ref())],
            FamilyData::ColorPattern(d) => vec![
                (NamedLink::Colors, d.colors.as_ref()),
                (NamedLink::Patterns, d.patterns.as_ref()),
            ],
            FamilyData::Style(_) | FamilyData::None => Vec::new(),
        };
        slots
            .into_iter()
            .filter_map(|(named, link)| link.map(|l| (named, l)))
            .collect()
    }
}

/// Where a link sits inside its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LinkOrigin {
    Data,
    Name,
    Overflow(usize),
    Named(NamedLink),
}

/// A decoded cluster zone. Other clusters are referenced by id only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: ZoneId,
    pub family: FamilyType,
    pub endianness: Endianness,
    /// Id written in the header sub-record.
    pub declared_id: Option<u32>,
    pub type_word: Option<u16>,
    pub data_link: Option<Link>,
    pub name_link: Option<Link>,
    /// Links committed once the main and name slots were taken.
    pub links: Vec<Link>,
    pub child_ids: Vec<ZoneId>,
    /// Fields no strategy claimed.
    pub fields: Vec<Field>,
    pub family_data: FamilyData,
    pub record_count: usize,
}

impl Cluster {
    pub fn new(id: ZoneId, family: FamilyType, endianness: Endianness) -> Self {
        Cluster {
            id,
            family,
            endianness,
            declared_id: None,
            type_word: None,
            data_link: None,
            name_link: None,
            links: Vec::new(),
            child_ids: Vec::new(),
            fields: Vec::new(),
            family_data: FamilyData::for_family(family),
            record_count: 0,
        }
    }

    /// Stores a finished sub-record link according to `role`.
    pub(crate) fn commit(&mut self, link: Link, role: LinkRole) {
        let slot = match role {
            LinkRole::Generic => Some(&mut self.data_link),
            LinkRole::Name => Some(&mut self.name_link),
            LinkRole::Named(NamedLink::ClusterList) => {
                if let FamilyData::Root(root) = &mut self.family_data {
                    root.cluster_lists.push(link);
                    return;
                }
                None
            }
            LinkRole::Named(named) => self.family_data.slot_mut(named),
        };

        match slot {
            Some(slot) if slot.is_none() => *slot = Some(link),
            _ => self.links.push(link),
        }
    }

    /// Every link of this cluster with its origin, in a stable order.
    pub fn all_links(&self) -> Vec<(LinkOrigin, &Link)> {
        let mut out = Vec::new();
        if let Some(l) = &self.data_link {
            out.push((LinkOrigin::Data, l));
        }
        if let Some(l) = &self.name_link {
            out.push((LinkOrigin::Name, l));
        }
        out.extend(
            self.family_data
                .named_links()
                .into_iter()
                .map(|(named, l)| (LinkOrigin::Named(named), l)),
        );
        out.extend(
            self.links
                .iter()
                .enumerate()
                .map(|(i, l)| (LinkOrigin::Overflow(i), l)),
        );
        out
    }

    pub fn style_kind(&self) -> Option<StyleKind> {
        match &self.family_data {
            FamilyData::Style(d) => d.kind,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkType;
    use pretty_assertions::assert_eq;

    fn link(id: ZoneId) -> Link {
        Link::new(LinkType::List, vec![id], 1, 0)
    }

    #[test]
    fn test_commit_fills_slots_then_overflow() {
        let mut c = Cluster::new(1, FamilyType::Text, Endianness::Big);
        c.commit(link(2), LinkRole::Generic);
        c.commit(link(3), LinkRole::Name);
        c.commit(link(4), LinkRole::Generic);
        c.commit(link(5), LinkRole::Named(NamedLink::Content));
        c.commit(link(6), LinkRole::Named(NamedLink::Content));
        // Not a Text slot.
        c.commit(link(7), LinkRole::Named(NamedLink::Cells));

        assert_eq!(c.data_link.as_ref().map(|l| l.ids[0]), Some(2));
        assert_eq!(c.name_link.as_ref().map(|l| l.ids[0]), Some(3));
        match &c.family_data {
            FamilyData::Text(t) => assert_eq!(t.content.as_ref().map(|l| l.ids[0]), Some(5)),
            other => panic!("unexpected family data {other:?}"),
        }
        let overflow: Vec<ZoneId> = c.links.iter().map(|l| l.ids[0]).collect();
        assert_eq!(overflow, vec![4, 6, 7]);

        let origins: Vec<LinkOrigin> = c.all_links().into_iter().map(|(o, _)| o).collect();
        assert_eq!(
            origins,
            vec![
                LinkOrigin::Data,
                LinkOrigin::Name,
                LinkOrigin::Named(NamedLink::Content),
                LinkOrigin::Overflow(0),
                LinkOrigin::Overflow(1),
                LinkOrigin::Overflow(2),
            ]
        );
    }

    #[test]
    fn test_root_collects_cluster_lists() {
        let mut c = Cluster::new(1, FamilyType::Root, Endianness::Big);
        c.commit(link(2), LinkRole::Named(NamedLink::ClusterList));
        c.commit(link(3), LinkRole::Named(NamedLink::ClusterList));
        match &c.family_data {
            FamilyData::Root(r) => assert_eq!(r.cluster_lists.len(), 2),
            other => panic!("unexpected family data {other:?}"),
        }
        assert!(c.links.is_empty());
    }
}
