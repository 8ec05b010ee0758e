//! Second pass: materializes the zones referenced by links.
//!
//! Every link resolves on its own. A link that cannot be materialized (missing zone, wrong zone
//! kind, size arithmetic that does not add up) is reported and skipped; the others still resolve.

use log::trace;
use serde::Serialize;

use crate::cluster::LinkOrigin;
use crate::diagnostics::{AnomalyKind, Diagnostics};
use crate::err::{DecodeError, DecodeResult};
use crate::link::{Link, LinkType};
use crate::utils::bytes::read_u32_table;
use crate::utils::{Utf16DecodeError, decode_utf16_bytes_lossy, decode_utf16_bytes_z};
use crate::zone::{CLUSTER_ZONE_KIND, Zone, ZoneId, ZoneStore};

/// List entries, indexed from 1. An entry whose span was invalid is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Entries<T>(Vec<Option<T>>);

impl<T> Entries<T> {
    /// The entry at 1-based `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        index
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> {
        self.0.iter().map(Option::as_ref)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Payload {
    List(Entries<Vec<u8>>),
    UnicodeList(Entries<String>),
    FixedArray {
        element_size: u32,
        records: Vec<Vec<u8>>,
    },
    /// Referenced zones confirmed to hold clusters.
    Clusters(Vec<ZoneId>),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    pub origin: LinkOrigin,
    pub link: Link,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLink {
    pub origin: LinkOrigin,
    pub link: Link,
    pub kind: AnomalyKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub resolved: Vec<ResolvedLink>,
    pub skipped: Vec<SkippedLink>,
}

impl Resolution {
    pub fn get(&self, origin: LinkOrigin) -> Option<&ResolvedLink> {
        self.resolved.iter().find(|r| r.origin == origin)
    }

    /// Cluster zones reached through resolved cluster links.
    pub fn cluster_ids(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.resolved
            .iter()
            .flat_map(|r| match &r.payload {
                Payload::Clusters(ids) => ids.as_slice(),
                _ => &[][..],
            })
            .copied()
    }
}

fn fetch<S: ZoneStore + ?Sized>(store: &S, id: ZoneId) -> DecodeResult<Zone<'_>> {
    store.fetch_zone(id).ok_or(DecodeError::MissingZone { id })
}

/// The zone holding the link's data: its last referenced id.
fn payload_id(link: &Link) -> DecodeResult<ZoneId> {
    link.nonzero_ids().last().ok_or(DecodeError::EmptyLink)
}

fn offsets_for<S: ZoneStore + ?Sized>(
    store: &S,
    link: &Link,
    payload: &Zone<'_>,
) -> DecodeResult<Vec<u32>> {
    let ids: Vec<ZoneId> = link.nonzero_ids().collect();
    if ids.len() >= 2 {
        let positions = fetch(store, ids[0])?;
        return read_u32_table(positions.data, positions.endianness).ok_or(
            DecodeError::MisalignedTable {
                what: "position table",
                id: positions.id,
                len: positions.len(),
                unit: 4,
            },
        );
    }
    if !link.long_list.is_empty() {
        return Ok(link.long_list.clone());
    }
    Ok(vec![0, payload.len() as u32])
}

/// Splits `data` at consecutive offset pairs. Invalid spans become `None`.
fn spans<'a>(
    data: &'a [u8],
    offsets: &[u32],
    zone: ZoneId,
    diag: &mut Diagnostics,
) -> Vec<Option<&'a [u8]>> {
    offsets
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let (start, end) = (pair[0] as usize, pair[1] as usize);
            if start <= end && end <= data.len() {
                Some(&data[start..end])
            } else {
                diag.anomaly(
                    AnomalyKind::Bounds,
                    start as u64,
                    "resolver",
                    format_args!(
                        "zone {zone}: entry {} spans {start:#x}..{end:#x} of {} bytes",
                        i + 1,
                        data.len()
                    ),
                );
                None
            }
        })
        .collect()
}

fn resolve_list<S: ZoneStore + ?Sized>(
    store: &S,
    link: &Link,
    diag: &mut Diagnostics,
) -> DecodeResult<Payload> {
    let payload = fetch(store, payload_id(link)?)?;
    let offsets = offsets_for(store, link, &payload)?;
    let spans = spans(payload.data, &offsets, payload.id, diag);

    if link.link_type == LinkType::UnicodeList {
        let entries = spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let span = span?;
                match decode_utf16_bytes_z(span, payload.endianness) {
                    Ok(s) => Some(s),
                    Err(Utf16DecodeError::OddLength) => {
                        diag.note(
                            u64::from(offsets[i]),
                            "resolver",
                            format_args!("zone {}: odd-length string {}", payload.id, i + 1),
                        );
                        Some(decode_utf16_bytes_lossy(span, payload.endianness))
                    }
                }
            })
            .collect();
        Ok(Payload::UnicodeList(Entries(entries)))
    } else {
        let entries = spans.into_iter().map(|s| s.map(<[u8]>::to_vec)).collect();
        Ok(Payload::List(Entries(entries)))
    }
}

fn resolve_fixed<S: ZoneStore + ?Sized>(store: &S, link: &Link) -> DecodeResult<Payload> {
    let zone = fetch(store, payload_id(link)?)?;
    let expected = u64::from(link.n) * u64::from(link.element_size);
    if expected != zone.len() as u64 {
        return Err(DecodeError::ShapeMismatch {
            id: zone.id,
            n: link.n,
            element_size: link.element_size,
            len: zone.len(),
        });
    }

    let records = match link.element_size as usize {
        0 => Vec::new(),
        size => zone.data.chunks_exact(size).map(<[u8]>::to_vec).collect(),
    };
    Ok(Payload::FixedArray {
        element_size: link.element_size,
        records,
    })
}

fn resolve_clusters<S: ZoneStore + ?Sized>(
    store: &S,
    link: &Link,
    diag: &mut Diagnostics,
) -> DecodeResult<Payload> {
    let mut clusters = Vec::new();
    let mut errors = Vec::new();
    for id in link.nonzero_ids() {
        match fetch(store, id) {
            Ok(zone) if zone.is_cluster() => clusters.push(id),
            Ok(zone) => errors.push(DecodeError::WrongZoneKind {
                id,
                kind: zone.kind.to_owned(),
                expected: CLUSTER_ZONE_KIND,
            }),
            Err(e) => errors.push(e),
        }
    }

    let mut errors = errors.into_iter();
    // With nothing left to return, the first error fails the whole link and is reported by
    // the caller.
    let failed = if clusters.is_empty() { errors.next() } else { None };
    for e in errors {
        diag.anomaly(e.class(), 0, "resolver", &e);
    }
    match failed {
        Some(e) => Err(e),
        None => Ok(Payload::Clusters(clusters)),
    }
}

/// Materializes one non-empty link.
pub fn resolve_link<S: ZoneStore + ?Sized>(
    store: &S,
    link: &Link,
    diag: &mut Diagnostics,
) -> DecodeResult<Payload> {
    if link.is_empty() {
        return Err(DecodeError::EmptyLink);
    }

    match link.link_type {
        LinkType::List | LinkType::UnicodeList => resolve_list(store, link, diag),
        LinkType::FixedSizeList => resolve_fixed(store, link),
        LinkType::ClusterLink => resolve_clusters(store, link, diag),
        LinkType::Text => {
            let zone = fetch(store, payload_id(link)?)?;
            Ok(Payload::Text(decode_utf16_bytes_lossy(zone.data, zone.endianness)))
        }
        LinkType::Graphic | LinkType::Picture | LinkType::Unknown => {
            let zone = fetch(store, payload_id(link)?)?;
            Ok(Payload::Bytes(zone.data.to_vec()))
        }
    }
}

/// Resolves every non-empty link. Failures are reported and collected, never returned.
pub fn resolve_links<'l, S, I>(store: &S, links: I, diag: &mut Diagnostics) -> Resolution
where
    S: ZoneStore + ?Sized,
    I: IntoIterator<Item = (LinkOrigin, &'l Link)>,
{
    let mut resolution = Resolution::default();

    for (origin, link) in links {
        if link.is_empty() {
            trace!("{origin:?}: empty link");
            continue;
        }

        match resolve_link(store, link, diag) {
            Ok(payload) => {
                diag.note(
                    0,
                    "resolver",
                    format_args!("{origin:?}: {} resolved", link.link_type.as_str()),
                );
                resolution.resolved.push(ResolvedLink {
                    origin,
                    link: link.clone(),
                    payload,
                });
            }
            Err(e) => {
                let kind = e.class();
                diag.anomaly(
                    kind,
                    0,
                    "resolver",
                    format_args!("{origin:?}: skipping {} link: {e}", link.link_type.as_str()),
                );
                resolution.skipped.push(SkippedLink {
                    origin,
                    link: link.clone(),
                    kind,
                    reason: e.to_string(),
                });
            }
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::builders::ByteWriter;
    use crate::zone::{Endianness, MemoryZoneStore};
    use pretty_assertions::assert_eq;

    fn utf16be(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_be_bytes).collect()
    }

    #[test]
    fn test_unicode_list_with_position_zone() {
        let mut store = MemoryZoneStore::new();
        let mut names = utf16be("ab");
        names.extend(utf16be("cde"));
        store.insert(2, "ItemData", Endianness::Big, names);
        let mut pos = ByteWriter::new(Endianness::Big);
        // The third entry overruns the payload.
        pos.u32(0).u32(4).u32(10).u32(40);
        store.insert(1, "ItemData", Endianness::Big, pos.into_bytes());

        let link = Link::new(LinkType::UnicodeList, vec![1, 2], 3, 0);
        let mut diag = Diagnostics::new();
        let Payload::UnicodeList(entries) = resolve_link(&store, &link, &mut diag).unwrap() else {
            panic!("expected a unicode list");
        };
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.get(1).map(String::as_str), Some("ab"));
        assert_eq!(entries.get(2).map(String::as_str), Some("cde"));
        assert_eq!(entries.get(3), None);
        assert_eq!(entries.get(0), None);
        assert_eq!(diag.count(AnomalyKind::Bounds), 1);
    }

    #[test]
    fn test_list_uses_long_list_positions() {
        let mut store = MemoryZoneStore::new();
        store.insert(5, "ItemData", Endianness::Little, vec![1, 2, 3, 4, 5]);
        let mut link = Link::new(LinkType::List, vec![0, 5], 2, 0);
        link.long_list = vec![0, 2, 5];

        let mut diag = Diagnostics::new();
        let Payload::List(entries) = resolve_link(&store, &link, &mut diag).unwrap() else {
            panic!("expected a list");
        };
        assert_eq!(entries.get(1), Some(&vec![1, 2]));
        assert_eq!(entries.get(2), Some(&vec![3, 4, 5]));
    }

    #[test]
    fn test_single_entry_without_positions() {
        let mut store = MemoryZoneStore::new();
        store.insert(5, "ItemData", Endianness::Little, utf16be("x").into_iter().rev().collect());
        let link = Link::new(LinkType::UnicodeList, vec![5], 1, 2);

        let mut diag = Diagnostics::new();
        let Payload::UnicodeList(entries) = resolve_link(&store, &link, &mut diag).unwrap() else {
            panic!("expected a unicode list");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get(1).map(String::as_str), Some("x"));
    }

    #[test]
    fn test_fixed_size_list_shape() {
        let mut store = MemoryZoneStore::new();
        store.insert(3, "ItemData", Endianness::Big, vec![0; 36]);
        let mut diag = Diagnostics::new();

        let ok = Link::new(LinkType::FixedSizeList, vec![3], 3, 12);
        match resolve_link(&store, &ok, &mut diag).unwrap() {
            Payload::FixedArray { records, .. } => assert_eq!(records.len(), 3),
            other => panic!("unexpected payload {other:?}"),
        }

        let bad = Link::new(LinkType::FixedSizeList, vec![3], 4, 12);
        assert!(matches!(
            resolve_link(&store, &bad, &mut diag),
            Err(DecodeError::ShapeMismatch { n: 4, len: 36, .. })
        ));
    }

    #[test]
    fn test_cluster_link_checks_zone_kind() {
        let mut store = MemoryZoneStore::new();
        store.insert(7, CLUSTER_ZONE_KIND, Endianness::Big, vec![0; 16]);
        store.insert(8, "ItemData", Endianness::Big, vec![0; 16]);

        let mut diag = Diagnostics::new();
        let link = Link::new(LinkType::ClusterLink, vec![7, 8], 0, 0);
        assert_eq!(
            resolve_link(&store, &link, &mut diag).unwrap(),
            Payload::Clusters(vec![7])
        );
        assert_eq!(diag.count(AnomalyKind::StructuralMismatch), 1);

        let link = Link::new(LinkType::ClusterLink, vec![8], 0, 0);
        assert!(matches!(
            resolve_link(&store, &link, &mut diag),
            Err(DecodeError::WrongZoneKind { id: 8, .. })
        ));
        // The failing link is left for the caller to report.
        assert_eq!(diag.count(AnomalyKind::StructuralMismatch), 1);
    }

    #[test]
    fn test_resolve_links_isolates_failures() {
        let mut store = MemoryZoneStore::new();
        store.insert(3, "ItemData", Endianness::Big, vec![0; 8]);
        let good = Link::new(LinkType::FixedSizeList, vec![3], 2, 4);
        let missing = Link::new(LinkType::Text, vec![99], 1, 0);
        let empty = Link::new(LinkType::List, vec![0, 0], 0, 0);

        let mut diag = Diagnostics::new();
        let resolution = resolve_links(
            &store,
            [
                (LinkOrigin::Overflow(0), &missing),
                (LinkOrigin::Data, &good),
                (LinkOrigin::Overflow(1), &empty),
            ],
            &mut diag,
        );

        assert_eq!(resolution.resolved.len(), 1);
        assert!(resolution.get(LinkOrigin::Data).is_some());
        assert_eq!(resolution.skipped.len(), 1);
        assert_eq!(resolution.skipped[0].origin, LinkOrigin::Overflow(0));
        assert_eq!(resolution.skipped[0].kind, AnomalyKind::StructuralMismatch);
    }

    #[test]
    fn test_text_and_picture_links_materialize() {
        let mut store = MemoryZoneStore::new();
        let text: Vec<u8> = "hi".encode_utf16().flat_map(u16::to_le_bytes).collect();
        store.insert(4, "ItemData", Endianness::Little, text);
        store.insert(5, "ItemData", Endianness::Big, vec![0x89, b'P', b'N', b'G']);

        let mut diag = Diagnostics::new();
        let text = Link::new(LinkType::Text, vec![4], 1, 0);
        assert_eq!(
            resolve_link(&store, &text, &mut diag).unwrap(),
            Payload::Text("hi".to_owned())
        );
        let picture = Link::new(LinkType::Picture, vec![5], 1, 4);
        assert_eq!(
            resolve_link(&store, &picture, &mut diag).unwrap(),
            Payload::Bytes(vec![0x89, b'P', b'N', b'G'])
        );
        assert_eq!(diag.total(), 0);
    }
}
