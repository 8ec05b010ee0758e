//! Self-describing tagged values.
//!
//! A field is `u32 tag | VarInt size | size bytes of payload`. Tags whose top 16 bits are zero
//! are never fields; callers use that to detect the end of a field run. Payloads of known tags
//! have fixed encodings (see [`tags`]). Unknown tags hold either an opaque blob or, when the size
//! is written in the long VarInt form (the "complex" marker), a nested run of fields.

use log::{debug, trace};
use serde::Serialize;

use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::err::{DecodeError, DecodeResult};
use crate::utils::{ZoneCursor, decode_utf16_units_z};
use crate::varint::read_varint;

/// Field type tags with a fixed meaning.
pub mod tags {
    pub const SHORT_SIGNED: u32 = 0x0003_b880;
    pub const SHORT_UNSIGNED: u32 = 0x0003_b890;
    pub const LONG: u32 = 0x0003_c057;
    pub const DOUBLE: u32 = 0x0014_715a;
    pub const INT_PAIR: u32 = 0x0014_7506;
    pub const UNICODE: u32 = 0x000c_8042;
    pub const UNSTRUCTURED: u32 = 0x000c_e017;
    pub const LONG_LIST: u32 = 0x000c_e842;
    pub const SHORT_LIST: u32 = 0x000c_e843;
    /// Long-list of child cluster ids.
    pub const CLUSTER_ID_LIST: u32 = 0x0001_5b42;
    /// Long-list of offsets attached to the link declared by the same sub-record.
    pub const POSITION_TABLE: u32 = 0x0001_5b43;

    // Style attributes. These are complex fields whose first child holds the value.
    pub const STYLE_PARENT: u32 = 0x0009_0001;
    pub const STYLE_LINKED_PARENT: u32 = 0x0009_0002;
    pub const STYLE_NAME: u32 = 0x0009_0003;
    pub const FONT_ID: u32 = 0x0009_0010;
    pub const FONT_SIZE: u32 = 0x0009_0011;
    pub const FONT_FLAGS_SET: u32 = 0x0009_0012;
    pub const FONT_FLAGS_CLEAR: u32 = 0x0009_0013;
    pub const TEXT_COLOR: u32 = 0x0009_0014;
    pub const LANGUAGE: u32 = 0x0009_0015;
    pub const LINE_SPACING: u32 = 0x0009_0016;
    pub const JUSTIFICATION: u32 = 0x0009_0017;
    pub const LINE_WIDTH: u32 = 0x0009_0030;
    pub const LINE_COLOR: u32 = 0x0009_0031;
    pub const FILL_COLOR: u32 = 0x0009_0032;
    pub const PATTERN: u32 = 0x0009_0033;
    pub const GRAPHIC_FLAGS_SET: u32 = 0x0009_0034;
    pub const GRAPHIC_FLAGS_CLEAR: u32 = 0x0009_0035;
    pub const OPACITY: u32 = 0x0009_0036;
}

/// Human-readable tag names for traces. Never used to make decoding decisions.
pub fn tag_name(tag: u32) -> Option<&'static str> {
    use tags::*;
    Some(match tag {
        SHORT_SIGNED => "short",
        SHORT_UNSIGNED => "ushort",
        LONG => "long",
        DOUBLE => "double",
        INT_PAIR => "intPair",
        UNICODE => "unicode",
        UNSTRUCTURED => "unstructured",
        LONG_LIST => "longList",
        SHORT_LIST => "shortList",
        CLUSTER_ID_LIST => "clusterIds",
        POSITION_TABLE => "positions",
        STYLE_PARENT => "style:parent",
        STYLE_LINKED_PARENT => "style:linkedParent",
        STYLE_NAME => "style:name",
        FONT_ID => "font:id",
        FONT_SIZE => "font:size",
        FONT_FLAGS_SET => "font:flags+",
        FONT_FLAGS_CLEAR => "font:flags-",
        TEXT_COLOR => "text:color",
        LANGUAGE => "text:language",
        LINE_SPACING => "para:spacing",
        JUSTIFICATION => "para:justify",
        LINE_WIDTH => "line:width",
        LINE_COLOR => "line:color",
        FILL_COLOR => "fill:color",
        PATTERN => "fill:pattern",
        GRAPHIC_FLAGS_SET => "graphic:flags+",
        GRAPHIC_FLAGS_CLEAR => "graphic:flags-",
        OPACITY => "graphic:opacity",
        _ => return None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub tag: u32,
    /// Offset of the tag within its zone.
    pub position: u64,
    /// Declared end of the field within its zone.
    pub end: u64,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    ShortSigned(i16),
    ShortUnsigned(u16),
    Long(u32),
    Double(f64),
    IntPair(i32, i32),
    Unicode(String),
    /// A 4-byte sub-id followed by raw bytes.
    Unstructured { sub_id: u32, data: Vec<u8> },
    /// Bytes of a field that could not be (or was not) interpreted.
    Opaque(Vec<u8>),
    LongList(Vec<u32>),
    ShortList(Vec<u16>),
    List(Vec<Field>),
}

impl Field {
    pub fn children(&self) -> &[Field] {
        match &self.value {
            FieldValue::List(children) => children,
            _ => &[],
        }
    }

    /// The value itself for scalar fields, or the value of the first child for a field-list.
    pub fn scalar(&self) -> &FieldValue {
        match &self.value {
            FieldValue::List(children) => children.first().map_or(&self.value, |c| c.scalar()),
            value => value,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self.scalar() {
            FieldValue::ShortSigned(v) => u32::try_from(*v).ok(),
            FieldValue::ShortUnsigned(v) => Some(u32::from(*v)),
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.scalar() {
            FieldValue::Double(v) => Some(*v),
            FieldValue::ShortSigned(v) => Some(f64::from(*v)),
            FieldValue::ShortUnsigned(v) => Some(f64::from(*v)),
            FieldValue::Long(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.scalar() {
            FieldValue::Unicode(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long_list(&self) -> Option<&[u32]> {
        match self.scalar() {
            FieldValue::LongList(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    ShortSigned,
    ShortUnsigned,
    Long,
    Double,
    IntPair,
    Unicode,
    Unstructured,
    LongList,
    ShortList,
}

fn known_encoding(tag: u32) -> Option<Encoding> {
    use tags::*;
    Some(match tag {
        SHORT_SIGNED => Encoding::ShortSigned,
        SHORT_UNSIGNED => Encoding::ShortUnsigned,
        LONG => Encoding::Long,
        DOUBLE => Encoding::Double,
        INT_PAIR => Encoding::IntPair,
        UNICODE => Encoding::Unicode,
        UNSTRUCTURED => Encoding::Unstructured,
        LONG_LIST | CLUSTER_ID_LIST | POSITION_TABLE => Encoding::LongList,
        SHORT_LIST => Encoding::ShortList,
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy)]
struct FieldHeader {
    tag: u32,
    start: usize,
    data_start: usize,
    end: usize,
    complex: bool,
}

impl FieldHeader {
    fn opens_list(&self) -> bool {
        self.complex && known_encoding(self.tag).is_none()
    }
}

/// Reads a field tag and size. `Ok(None)` means "not a field here"; in that case and on error
/// the cursor is back at its starting position.
fn read_field_header(cursor: &mut ZoneCursor<'_>, bound: usize) -> DecodeResult<Option<FieldHeader>> {
    let start = cursor.pos();
    if bound.saturating_sub(start) < 5 {
        return Ok(None);
    }

    let tag = cursor.u32_named("field tag")?;
    if tag >> 16 == 0 {
        cursor.rewind(start);
        return Ok(None);
    }

    let marker = cursor.peek_u8("field size")?;
    let size = match read_varint(cursor, bound) {
        Ok(size) => size,
        Err(e) => {
            cursor.rewind(start);
            return Err(e);
        }
    };

    let data_start = cursor.pos();
    let end = data_start.saturating_add(size as usize);
    if size == 0 || end > bound {
        cursor.rewind(start);
        return Err(DecodeError::InvalidFieldSize {
            offset: start as u64,
            size,
        });
    }

    Ok(Some(FieldHeader {
        tag,
        start,
        data_start,
        end,
        complex: marker & 0xF0 == 0xC0,
    }))
}

fn decode_known(
    cursor: &mut ZoneCursor<'_>,
    header: &FieldHeader,
    encoding: Encoding,
    diag: &mut Diagnostics,
) -> DecodeResult<FieldValue> {
    let size = header.end - header.data_start;
    let mut c = cursor.limited(header.end)?;

    let (unit, value) = match encoding {
        Encoding::ShortSigned => (0, FieldValue::ShortSigned(c.i16_named("short")?)),
        Encoding::ShortUnsigned => (0, FieldValue::ShortUnsigned(c.u16_named("ushort")?)),
        Encoding::Long => (0, FieldValue::Long(c.u32_named("long")?)),
        Encoding::Double => (0, FieldValue::Double(c.f64_named("double")?)),
        Encoding::IntPair => {
            let a = c.i32_named("pair.0")?;
            let b = c.i32_named("pair.1")?;
            (0, FieldValue::IntPair(a, b))
        }
        Encoding::Unicode => {
            let units = c.u16_vec(size / 2, "unicode")?;
            (2, FieldValue::Unicode(decode_utf16_units_z(&units)))
        }
        Encoding::Unstructured => {
            let sub_id = c.u32_named("unstructured.id")?;
            let data = c.take_bytes(size - 4, "unstructured.data")?.to_vec();
            (0, FieldValue::Unstructured { sub_id, data })
        }
        Encoding::LongList => (4, FieldValue::LongList(c.u32_vec(size / 4, "long list")?)),
        Encoding::ShortList => (2, FieldValue::ShortList(c.u16_vec(size / 2, "short list")?)),
    };

    if unit > 0 && size % unit != 0 {
        diag.note(
            header.data_start as u64,
            "field",
            format_args!("dropping {} trailing byte(s) of tag {:#x}", size % unit, header.tag),
        );
    }
    Ok(value)
}

fn decode_leaf(cursor: &ZoneCursor<'_>, header: &FieldHeader, diag: &mut Diagnostics) -> Field {
    let mut c = *cursor;
    let span = &cursor.buf()[header.data_start..header.end];

    let value = match known_encoding(header.tag) {
        Some(encoding) => match decode_known(&mut c, header, encoding, diag) {
            Ok(value) => value,
            Err(e) => {
                diag.anomaly_in(
                    AnomalyKind::UnknownTag,
                    cursor.buf(),
                    header.start,
                    "field",
                    format_args!("tag {:#x} does not fit its {} byte(s): {e}", header.tag, span.len()),
                );
                FieldValue::Opaque(span.to_vec())
            }
        },
        None => {
            diag.anomaly(
                AnomalyKind::UnknownTag,
                header.start as u64,
                "field",
                format_args!("unknown tag {:#x} kept as {} opaque byte(s)", header.tag, span.len()),
            );
            FieldValue::Opaque(span.to_vec())
        }
    };

    trace!(
        "{:#x}: field {:#x} ({}) -> {:?}",
        header.start,
        header.tag,
        tag_name(header.tag).unwrap_or("?"),
        value
    );

    Field {
        tag: header.tag,
        position: header.start as u64,
        end: header.end as u64,
        value,
    }
}

fn opaque(cursor: &ZoneCursor<'_>, header: &FieldHeader) -> Field {
    Field {
        tag: header.tag,
        position: header.start as u64,
        end: header.end as u64,
        value: FieldValue::Opaque(cursor.buf()[header.data_start..header.end].to_vec()),
    }
}

struct Frame {
    header: FieldHeader,
    children: Vec<Field>,
}

impl Frame {
    fn finish(self) -> Field {
        Field {
            tag: self.header.tag,
            position: self.header.start as u64,
            end: self.header.end as u64,
            value: FieldValue::List(self.children),
        }
    }
}

/// Reads one field.
///
/// On success the cursor is at the field's declared end, whatever the payload actually used. On
/// `Ok(None)` (no field here) or error it is back where it started.
///
/// Field-lists are read with an explicit stack; a list nested deeper than `max_depth` is kept as
/// an opaque value.
pub fn read_field(
    cursor: &mut ZoneCursor<'_>,
    bound: usize,
    max_depth: usize,
    diag: &mut Diagnostics,
) -> DecodeResult<Option<Field>> {
    let start = cursor.pos();
    let bound = bound.min(cursor.len());

    let result = read_field_inner(cursor, bound, max_depth, diag);
    if !matches!(result, Ok(Some(_))) {
        cursor.rewind(start);
    }
    result
}

fn read_field_inner(
    cursor: &mut ZoneCursor<'_>,
    bound: usize,
    max_depth: usize,
    diag: &mut Diagnostics,
) -> DecodeResult<Option<Field>> {
    let Some(root) = read_field_header(cursor, bound)? else {
        return Ok(None);
    };

    if !root.opens_list() || max_depth == 0 {
        let field = if root.opens_list() {
            diag.anomaly(
                AnomalyKind::UnknownTag,
                root.start as u64,
                "field",
                "field-list nesting limit reached",
            );
            opaque(cursor, &root)
        } else {
            decode_leaf(cursor, &root, diag)
        };
        cursor.set_pos(root.end, "field end")?;
        return Ok(Some(field));
    }

    trace!(
        "{:#x}: field-list {:#x} ({}) up to {:#x}",
        root.start,
        root.tag,
        tag_name(root.tag).unwrap_or("?"),
        root.end
    );

    let mut stack = vec![Frame {
        header: root,
        children: Vec::new(),
    }];

    loop {
        let depth = stack.len();
        let Some(frame) = stack.last_mut() else {
            break;
        };
        let frame_end = frame.header.end;

        if cursor.pos() < frame_end {
            match read_field_header(cursor, frame_end) {
                Ok(Some(child)) if child.opens_list() && depth < max_depth => {
                    stack.push(Frame {
                        header: child,
                        children: Vec::new(),
                    });
                }
                Ok(Some(child)) => {
                    let field = if child.opens_list() {
                        diag.anomaly(
                            AnomalyKind::UnknownTag,
                            child.start as u64,
                            "field",
                            format_args!("field-list nesting limit {max_depth} reached"),
                        );
                        opaque(cursor, &child)
                    } else {
                        decode_leaf(cursor, &child, diag)
                    };
                    frame.children.push(field);
                    cursor.set_pos(child.end, "field end")?;
                }
                Ok(None) | Err(_) => {
                    debug!(
                        "{:#x}: {} unparsed byte(s) inside field-list {:#x}",
                        cursor.pos(),
                        frame_end - cursor.pos(),
                        frame.header.tag
                    );
                    diag.note(
                        cursor.position(),
                        "field",
                        format_args!(
                            "skipping {} trailing byte(s) of a field-list",
                            frame_end - cursor.pos()
                        ),
                    );
                    cursor.set_pos(frame_end, "field-list end")?;
                }
            }
            continue;
        }

        let Some(done) = stack.pop() else {
            break;
        };
        cursor.set_pos(done.header.end, "field-list end")?;
        let field = done.finish();
        match stack.last_mut() {
            Some(parent) => parent.children.push(field),
            None => return Ok(Some(field)),
        }
    }

    Ok(None)
}

/// Reads fields until `bound` or until something that is not a field. The cursor stops after the
/// last field read.
pub fn read_fields(
    cursor: &mut ZoneCursor<'_>,
    bound: usize,
    max_depth: usize,
    diag: &mut Diagnostics,
) -> Vec<Field> {
    let mut fields = Vec::new();
    while cursor.pos() < bound {
        match read_field(cursor, bound, max_depth, diag) {
            Ok(Some(field)) => fields.push(field),
            Ok(None) => break,
            Err(e) => {
                diag.anomaly_in(e.class(), cursor.buf(), cursor.pos(), "field", &e);
                break;
            }
        }
    }
    fields
}
