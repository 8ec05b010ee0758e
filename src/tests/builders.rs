//! Byte-level builders for synthetic zones.
//!
//! Std-only so integration tests can pull this file in with `#[path]`; the including module must
//! have an `Endianness` in scope.
#![allow(dead_code)]

use super::Endianness;

const PROLOGUE: [u16; 4] = [0x5a61, 0x0601, 0, 0];

/// Shortest VarInt form of `value` (up to 28 bits).
pub fn varint(value: u32) -> Vec<u8> {
    match value {
        0..=0x7f => vec![value as u8],
        0x80..=0x3fff => vec![0x80 | (value >> 8) as u8, value as u8],
        _ => varint_long(value),
    }
}

/// Four-byte VarInt form, which also carries the field "complex" marker.
pub fn varint_long(value: u32) -> Vec<u8> {
    ((value & 0x0fff_ffff) | 0xc000_0000).to_be_bytes().to_vec()
}

pub struct ByteWriter {
    endian: Endianness,
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new(endian: Endianness) -> Self {
        ByteWriter {
            endian,
            buf: Vec::new(),
        }
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        match self.endian {
            Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
        }
        self
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.u16(v as u16)
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        match self.endian {
            Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
        }
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.u32(v as u32)
    }

    pub fn f64(&mut self, v: f64) -> &mut Self {
        match self.endian {
            Endianness::Big => self.buf.extend_from_slice(&v.to_be_bytes()),
            Endianness::Little => self.buf.extend_from_slice(&v.to_le_bytes()),
        }
        self
    }

    /// UTF-16 code units, no terminator.
    pub fn utf16(&mut self, s: &str) -> &mut Self {
        for unit in s.encode_utf16() {
            self.u16(unit);
        }
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// A field with a short-form size.
pub fn field(endian: Endianness, tag: u32, payload: &[u8]) -> Vec<u8> {
    let mut w = ByteWriter::new(endian);
    w.u32(tag).bytes(&varint(payload.len() as u32)).bytes(payload);
    w.into_bytes()
}

/// A field whose size uses the four-byte form, i.e. a complex field.
pub fn field_long_form(endian: Endianness, tag: u32, content: &[u8]) -> Vec<u8> {
    let mut w = ByteWriter::new(endian);
    w.u32(tag)
        .bytes(&varint_long(content.len() as u32))
        .bytes(content);
    w.into_bytes()
}

/// A field-list holding `children`.
pub fn complex_field(endian: Endianness, tag: u32, children: &[Vec<u8>]) -> Vec<u8> {
    field_long_form(endian, tag, &children.concat())
}

/// Scalar fields of every known encoding.
pub struct FieldBuilder {
    endian: Endianness,
}

impl FieldBuilder {
    pub fn big() -> Self {
        FieldBuilder {
            endian: Endianness::Big,
        }
    }

    pub fn little() -> Self {
        FieldBuilder {
            endian: Endianness::Little,
        }
    }

    fn with(&self, tag: u32, write: impl FnOnce(&mut ByteWriter)) -> Vec<u8> {
        let mut payload = ByteWriter::new(self.endian);
        write(&mut payload);
        field(self.endian, tag, &payload.into_bytes())
    }

    pub fn short(&self, tag: u32, v: i16) -> Vec<u8> {
        self.with(tag, |w| {
            w.i16(v);
        })
    }

    pub fn long(&self, tag: u32, v: u32) -> Vec<u8> {
        self.with(tag, |w| {
            w.u32(v);
        })
    }

    pub fn double(&self, tag: u32, v: f64) -> Vec<u8> {
        self.with(tag, |w| {
            w.f64(v);
        })
    }

    pub fn pair(&self, tag: u32, a: i32, b: i32) -> Vec<u8> {
        self.with(tag, |w| {
            w.i32(a).i32(b);
        })
    }

    pub fn unicode(&self, tag: u32, s: &str) -> Vec<u8> {
        self.with(tag, |w| {
            w.utf16(s);
        })
    }

    pub fn longs(&self, tag: u32, values: &[u32]) -> Vec<u8> {
        self.with(tag, |w| {
            for &v in values {
                w.u32(v);
            }
        })
    }

    pub fn shorts(&self, tag: u32, values: &[u16]) -> Vec<u8> {
        self.with(tag, |w| {
            for &v in values {
                w.u16(v);
            }
        })
    }

    pub fn unstructured(&self, tag: u32, sub_id: u32, data: &[u8]) -> Vec<u8> {
        self.with(tag, |w| {
            w.u32(sub_id).bytes(data);
        })
    }
}

/// The variable part of a link header.
#[derive(Debug, Clone)]
pub struct LinkSpec {
    pub tag: u32,
    pub secondary: u16,
    /// `None` for two-id links and short-fixed tags.
    pub size: Option<u16>,
    pub ids: Vec<u16>,
}

impl LinkSpec {
    /// One id with an explicit element size. `size` must not be 0, 1 or 0x100.
    pub fn single(tag: u32, secondary: u16, size: u16, id: u16) -> Self {
        LinkSpec {
            tag,
            secondary,
            size: Some(size),
            ids: vec![id],
        }
    }

    pub fn pair(tag: u32, secondary: u16, id1: u16, id2: u16) -> Self {
        LinkSpec {
            tag,
            secondary,
            size: None,
            ids: vec![id1, id2],
        }
    }

    /// `tag` must be one of the short-fixed tags.
    pub fn short_fixed(tag: u32, secondary: u16, id: u16) -> Self {
        LinkSpec {
            tag,
            secondary,
            size: None,
            ids: vec![id],
        }
    }
}

pub fn link_header(endian: Endianness, spec: &LinkSpec) -> Vec<u8> {
    let mut w = ByteWriter::new(endian);
    w.u32(spec.tag).u32(0).u16(0).u16(0).u16(0).u16(0).u16(spec.secondary);
    if let Some(size) = spec.size {
        w.u16(size);
    }
    for &id in &spec.ids {
        if id == 0 {
            w.u16(0);
        } else {
            w.u16(1).u16(id);
        }
    }
    w.into_bytes()
}

/// A cluster zone: prologue plus sub-records.
pub struct ClusterBuilder {
    endian: Endianness,
    /// Per record: `fSz` varint, header bytes and fields.
    bodies: Vec<Vec<u8>>,
}

impl ClusterBuilder {
    pub fn new(endian: Endianness) -> Self {
        ClusterBuilder {
            endian,
            bodies: Vec::new(),
        }
    }

    /// `flag`, `n` and `payload`, zero-padded to the `f_sz` header bytes, followed by `fields`.
    pub fn raw_record(
        mut self,
        f_sz: u32,
        flag: u16,
        n: i32,
        payload: &[u8],
        fields: &[Vec<u8>],
    ) -> Self {
        let mut header = ByteWriter::new(self.endian);
        header.u16(flag).i32(n).bytes(payload);
        let mut header = header.into_bytes();
        assert!(
            header.len() <= f_sz as usize,
            "header of {} bytes does not fit fSz {f_sz:#x}",
            header.len()
        );
        header.resize(f_sz as usize, 0);

        let mut body = varint(f_sz);
        body.extend(header);
        for f in fields {
            body.extend_from_slice(f);
        }
        self.bodies.push(body);
        self
    }

    /// A header sub-record (`N = -5`).
    pub fn header(self, f_sz: u32, declared_id: u32, type_word: u16) -> Self {
        let mut payload = ByteWriter::new(self.endian);
        payload.u32(declared_id).u16(type_word);
        let payload = payload.into_bytes();
        self.raw_record(f_sz, 0, -5, &payload, &[])
    }

    /// A data sub-record whose payload is a link header followed by `extra_header`.
    pub fn link_record(
        self,
        n: i32,
        f_sz: u32,
        link: &LinkSpec,
        extra_header: &[u8],
        fields: &[Vec<u8>],
    ) -> Self {
        let mut payload = link_header(self.endian, link);
        payload.extend_from_slice(extra_header);
        self.raw_record(f_sz, 0, n, &payload, fields)
    }

    /// Appends raw bytes to the body of the last sub-record.
    pub fn trailing_bytes(mut self, bytes: &[u8]) -> Self {
        if let Some(body) = self.bodies.last_mut() {
            body.extend_from_slice(bytes);
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut w = ByteWriter::new(self.endian);
        for v in PROLOGUE {
            w.u16(v);
        }
        for body in &self.bodies {
            w.bytes(&varint(0))
                .bytes(&varint(body.len() as u32))
                .bytes(body);
        }
        w.into_bytes()
    }
}
