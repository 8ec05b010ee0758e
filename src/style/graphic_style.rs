use bitflags::bitflags;
use serde::Serialize;

use crate::field::{Field, tags};

use super::cascade::{FlagPatch, Inherit};
use super::parse::{StyleAttributes, assign};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct GraphicFlags: u32 {
        const NO_LINE = 0x0001;
        const NO_FILL = 0x0002;
        const SHADOW = 0x0004;
        const ARROW_START = 0x0008;
        const ARROW_END = 0x0010;
        const ROUNDED = 0x0020;
        const DASHED = 0x0040;
    }
}

/// Line and fill attributes of shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphicStyle {
    pub name: Option<String>,
    pub line_width: Option<f64>,
    pub line_color: Option<u32>,
    pub fill_color: Option<u32>,
    pub pattern: Option<u32>,
    /// 0.0 (transparent) to 1.0.
    pub opacity: Option<f64>,
    pub flags: FlagPatch<GraphicFlags>,
}

impl Inherit for GraphicStyle {
    fn inherit_from(&self, parent: &Self) -> Self {
        GraphicStyle {
            name: self.name.clone(),
            line_width: self.line_width.or(parent.line_width),
            line_color: self.line_color.or(parent.line_color),
            fill_color: self.fill_color.or(parent.fill_color),
            pattern: self.pattern.or(parent.pattern),
            opacity: self.opacity.or(parent.opacity),
            flags: self.flags.over(&parent.flags),
        }
    }
}

impl StyleAttributes for GraphicStyle {
    fn name_mut(&mut self) -> &mut Option<String> {
        &mut self.name
    }

    fn apply(&mut self, tag: u32, field: &Field) -> bool {
        let flags = || field.as_u32().map(GraphicFlags::from_bits_truncate);
        match tag {
            tags::LINE_WIDTH => assign(&mut self.line_width, field.as_f64()),
            tags::LINE_COLOR => assign(&mut self.line_color, field.as_u32()),
            tags::FILL_COLOR => assign(&mut self.fill_color, field.as_u32()),
            tags::PATTERN => assign(&mut self.pattern, field.as_u32()),
            tags::OPACITY => assign(&mut self.opacity, field.as_f64()),
            tags::GRAPHIC_FLAGS_SET => match flags() {
                Some(f) => {
                    self.flags.set = f;
                    true
                }
                None => false,
            },
            tags::GRAPHIC_FLAGS_CLEAR => match flags() {
                Some(f) => {
                    self.flags.clear = f;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}
