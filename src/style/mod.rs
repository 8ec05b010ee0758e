//! Style sheets and the parent-chain cascade shared by every style family.

mod cascade;
mod graphic_style;
mod parse;
mod text_style;

use serde::Serialize;

use crate::cluster::StyleKind;
use crate::diagnostics::Diagnostics;
use crate::resolver::Entries;
use crate::zone::Endianness;

pub use self::cascade::{
    Cascade, CutEdge, CutReason, FlagPatch, Inherit, StyleNode, resolve_cascade,
};
pub use self::graphic_style::{GraphicFlags, GraphicStyle};
pub use self::parse::{StyleAttributes, parse_style_node, style_nodes};
pub use self::text_style::{FontFlags, Justification, TextStyle};

/// The resolved styles of one Style cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StyleSheet {
    Text(Cascade<TextStyle>),
    Graphic(Cascade<GraphicStyle>),
}

impl StyleSheet {
    /// Decodes and resolves the entries of a style list. Only text and graphic sheets carry
    /// attributes this crate understands.
    pub fn build(
        kind: StyleKind,
        entries: &Entries<Vec<u8>>,
        names: Option<&Entries<String>>,
        endianness: Endianness,
        max_field_depth: usize,
        diag: &mut Diagnostics,
    ) -> Option<StyleSheet> {
        match kind {
            StyleKind::Text => {
                let nodes =
                    style_nodes::<TextStyle>(entries, names, endianness, max_field_depth, diag);
                Some(StyleSheet::Text(resolve_cascade(&nodes, diag)))
            }
            StyleKind::Graphic => {
                let nodes =
                    style_nodes::<GraphicStyle>(entries, names, endianness, max_field_depth, diag);
                Some(StyleSheet::Graphic(resolve_cascade(&nodes, diag)))
            }
            StyleKind::Format | StyleKind::Unit | StyleKind::Other(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StyleSheet::Text(c) => c.resolved.len(),
            StyleSheet::Graphic(c) => c.resolved.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
