//! Style entries as field sequences.
//!
//! Each entry of a style list is a run of attribute fields. An attribute is a field-list whose
//! tag names the attribute and whose first child holds the value.

use log::trace;

use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::field::{Field, read_fields, tags};
use crate::resolver::Entries;
use crate::utils::ZoneCursor;
use crate::zone::Endianness;

use super::cascade::{Inherit, StyleNode};

pub trait StyleAttributes: Inherit {
    fn name_mut(&mut self) -> &mut Option<String>;

    /// Applies one attribute. Returns `false` if this style has no such attribute or the value
    /// has the wrong shape.
    fn apply(&mut self, tag: u32, field: &Field) -> bool;
}

pub(crate) fn assign<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

/// Builds a style node from its attribute fields.
pub fn parse_style_node<T: StyleAttributes>(
    fields: &[Field],
    diag: &mut Diagnostics,
) -> StyleNode<T> {
    let mut node = StyleNode::new(T::default());

    for field in fields {
        let understood = match field.tag {
            tags::STYLE_PARENT => assign_parent(&mut node.parents[0], field),
            tags::STYLE_LINKED_PARENT => assign_parent(&mut node.parents[1], field),
            tags::STYLE_NAME => assign(node.raw.name_mut(), field.as_str().map(str::to_owned)),
            tag => node.raw.apply(tag, field),
        };
        if !understood {
            diag.anomaly(
                AnomalyKind::UnknownTag,
                field.position,
                "style",
                format_args!("ignoring style attribute {:#x}", field.tag),
            );
        }
    }
    node
}

fn assign_parent(slot: &mut u32, field: &Field) -> bool {
    match field.as_u32() {
        Some(id) => {
            *slot = id;
            true
        }
        None => false,
    }
}

/// Decodes one style node per list entry. Missing entries become default styles so ids stay
/// aligned; a style without a name attribute takes its name from `names`.
pub fn style_nodes<T: StyleAttributes>(
    entries: &Entries<Vec<u8>>,
    names: Option<&Entries<String>>,
    endianness: Endianness,
    max_field_depth: usize,
    diag: &mut Diagnostics,
) -> Vec<StyleNode<T>> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let id = i + 1;
            let mut node = match entry {
                Some(bytes) => {
                    let mut cursor = ZoneCursor::new(bytes, endianness);
                    let fields = read_fields(&mut cursor, bytes.len(), max_field_depth, diag);
                    trace!("style {id}: {} attribute(s)", fields.len());
                    parse_style_node::<T>(&fields, diag)
                }
                None => StyleNode::new(T::default()),
            };
            if node.raw.name_mut().is_none() {
                if let Some(name) = names.and_then(|n| n.get(id)) {
                    *node.raw.name_mut() = Some(name.clone());
                }
            }
            node
        })
        .collect()
}
