//! Zones and the store that owns them.
//!
//! A zone is a numbered byte range of the physical file. Locating zones inside the file is the
//! job of the enclosing application; this crate only consumes the [`ZoneStore`] interface.

use hashbrown::HashMap;
use serde::Serialize;

pub type ZoneId = u32;

/// The zone kind of every zone that holds a cluster.
pub const CLUSTER_ZONE_KIND: &str = "Cluster";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Endianness {
    Big,
    Little,
}

/// A borrowed view of a zone, as handed out by a [`ZoneStore`].
#[derive(Debug, Clone, Copy)]
pub struct Zone<'a> {
    pub id: ZoneId,
    pub data: &'a [u8],
    pub kind: &'a str,
    pub endianness: Endianness,
}

impl<'a> Zone<'a> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_cluster(&self) -> bool {
        self.kind == CLUSTER_ZONE_KIND
    }
}

/// Synchronous, already-buffered access to the zones of one document.
pub trait ZoneStore {
    fn fetch_zone(&self, id: ZoneId) -> Option<Zone<'_>>;

    /// Returns `true` if `pos` lies inside the physical input.
    ///
    /// The decoder itself never calls this: every zone it reads arrives as an already bounded
    /// slice. It is here for converters that find absolute input offsets inside decoded data.
    fn check_position(&self, pos: u64) -> bool;
}

#[derive(Debug, Clone)]
struct StoredZone {
    data: Vec<u8>,
    kind: String,
    endianness: Endianness,
}

/// An in-memory [`ZoneStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryZoneStore {
    zones: HashMap<ZoneId, StoredZone>,
    input_len: u64,
}

impl MemoryZoneStore {
    pub fn new() -> Self {
        MemoryZoneStore::default()
    }

    /// Adds (or replaces) zone `id`. The store's notion of the input length grows by the zone's
    /// byte length.
    pub fn insert(
        &mut self,
        id: ZoneId,
        kind: impl Into<String>,
        endianness: Endianness,
        data: Vec<u8>,
    ) -> &mut Self {
        self.input_len += data.len() as u64;
        self.zones.insert(
            id,
            StoredZone {
                data,
                kind: kind.into(),
                endianness,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl ZoneStore for MemoryZoneStore {
    fn fetch_zone(&self, id: ZoneId) -> Option<Zone<'_>> {
        self.zones.get(&id).map(|z| Zone {
            id,
            data: &z.data,
            kind: &z.kind,
            endianness: z.endianness,
        })
    }

    fn check_position(&self, pos: u64) -> bool {
        pos <= self.input_len
    }
}

impl<T: ZoneStore + ?Sized> ZoneStore for &T {
    fn fetch_zone(&self, id: ZoneId) -> Option<Zone<'_>> {
        (**self).fetch_zone(id)
    }

    fn check_position(&self, pos: u64) -> bool {
        (**self).check_position(pos)
    }
}
