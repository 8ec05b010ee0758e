#![allow(dead_code)]
use std::sync::Once;

use cluster_decoder::{CLUSTER_ZONE_KIND, Endianness, MemoryZoneStore, ZoneId};

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

pub const ROOT_HEADER: u32 = 0x34;
pub const STYLE_HEADER: u32 = 0x20;

/// Big-endian u32 table, as stored in position zones.
pub fn u32_table(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn utf16_be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_be_bytes()).collect()
}

/// Offsets `[0, len(e1), len(e1)+len(e2), ...]` and the concatenated entries.
pub fn list_zones(entries: &[Vec<u8>]) -> (Vec<u8>, Vec<u8>) {
    let mut offsets = vec![0u32];
    let mut payload = Vec::new();
    for e in entries {
        payload.extend_from_slice(e);
        offsets.push(payload.len() as u32);
    }
    (u32_table(&offsets), payload)
}

pub fn insert_cluster(store: &mut MemoryZoneStore, id: ZoneId, data: Vec<u8>) {
    store.insert(id, CLUSTER_ZONE_KIND, Endianness::Big, data);
}

pub fn insert_data(store: &mut MemoryZoneStore, id: ZoneId, data: Vec<u8>) {
    store.insert(id, "ItemData", Endianness::Big, data);
}
