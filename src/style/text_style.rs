use bitflags::bitflags;
use serde::Serialize;

use crate::field::{Field, tags};

use super::cascade::{FlagPatch, Inherit};
use super::parse::{StyleAttributes, assign};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct FontFlags: u32 {
        const BOLD = 0x0001;
        const ITALIC = 0x0002;
        const UNDERLINE = 0x0004;
        const STRIKEOUT = 0x0008;
        const SUPERSCRIPT = 0x0010;
        const SUBSCRIPT = 0x0020;
        const OUTLINE = 0x0040;
        const SHADOW = 0x0080;
        const SMALL_CAPS = 0x0100;
        const ALL_CAPS = 0x0200;
        const HIDDEN = 0x0400;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Justification {
    Left,
    Center,
    Right,
    Full,
    Other(u32),
}

impl From<u32> for Justification {
    fn from(value: u32) -> Self {
        match value {
            0 => Justification::Left,
            1 => Justification::Center,
            2 => Justification::Right,
            3 => Justification::Full,
            other => Justification::Other(other),
        }
    }
}

/// Character and paragraph attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextStyle {
    /// Never inherited.
    pub name: Option<String>,
    pub font_id: Option<u32>,
    /// In points.
    pub font_size: Option<f64>,
    pub color: Option<u32>,
    pub language: Option<u32>,
    pub line_spacing: Option<f64>,
    pub justification: Option<Justification>,
    pub flags: FlagPatch<FontFlags>,
}

impl Inherit for TextStyle {
    fn inherit_from(&self, parent: &Self) -> Self {
        TextStyle {
            name: self.name.clone(),
            font_id: self.font_id.or(parent.font_id),
            font_size: self.font_size.or(parent.font_size),
            color: self.color.or(parent.color),
            language: self.language.or(parent.language),
            line_spacing: self.line_spacing.or(parent.line_spacing),
            justification: self.justification.or(parent.justification),
            flags: self.flags.over(&parent.flags),
        }
    }
}

impl StyleAttributes for TextStyle {
    fn name_mut(&mut self) -> &mut Option<String> {
        &mut self.name
    }

    fn apply(&mut self, tag: u32, field: &Field) -> bool {
        match tag {
            tags::FONT_ID => assign(&mut self.font_id, field.as_u32()),
            tags::FONT_SIZE => assign(&mut self.font_size, field.as_f64()),
            tags::FONT_FLAGS_SET => match field.as_u32() {
                Some(bits) => {
                    self.flags.set = FontFlags::from_bits_truncate(bits);
                    true
                }
                None => false,
            },
            tags::FONT_FLAGS_CLEAR => match field.as_u32() {
                Some(bits) => {
                    self.flags.clear = FontFlags::from_bits_truncate(bits);
                    true
                }
                None => false,
            },
            tags::TEXT_COLOR => assign(&mut self.color, field.as_u32()),
            tags::LANGUAGE => assign(&mut self.language, field.as_u32()),
            tags::LINE_SPACING => assign(&mut self.line_spacing, field.as_f64()),
            tags::JUSTIFICATION => {
                assign(&mut self.justification, field.as_u32().map(Justification::from))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_child_overrides_and_rescinds() {
        let parent = TextStyle {
            name: Some("Body".to_owned()),
            font_id: Some(3),
            font_size: Some(12.0),
            justification: Some(Justification::Full),
            flags: FlagPatch::new(FontFlags::BOLD | FontFlags::UNDERLINE, FontFlags::empty()),
            ..TextStyle::default()
        };
        let child = TextStyle {
            font_size: Some(18.0),
            flags: FlagPatch::new(FontFlags::ITALIC, FontFlags::BOLD),
            ..TextStyle::default()
        };

        let resolved = child.inherit_from(&parent);
        assert_eq!(resolved.name, None);
        assert_eq!(resolved.font_id, Some(3));
        assert_eq!(resolved.font_size, Some(18.0));
        assert_eq!(resolved.justification, Some(Justification::Full));
        assert_eq!(
            resolved.flags.effective(),
            FontFlags::UNDERLINE | FontFlags::ITALIC
        );
    }
}
