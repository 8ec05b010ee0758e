use cluster_decoder::Endianness;
use cluster_decoder::field::tags;
use cluster_decoder::style::{FontFlags, StyleSheet};
use cluster_decoder::{
    AnomalyKind, ClusterDecoder, CollectingSink, DecoderSettings, Diagnostics, FamilyType,
    LinkOrigin, LinkType, MemoryZoneStore, Payload,
};
use pretty_assertions::assert_eq;

mod fixtures;
use fixtures::*;

#[path = "../src/tests/builders.rs"]
mod builders;
use builders::{ByteWriter, ClusterBuilder, FieldBuilder, LinkSpec, complex_field};

fn root_cluster() -> Vec<u8> {
    ClusterBuilder::new(Endianness::Big)
        .header(ROOT_HEADER, 1, 0)
        .link_record(1, 0x1e, &LinkSpec::single(0x0017_5000, 0, 2, 5), &[], &[])
        .build()
}

#[test]
fn test_root_cluster_with_name_list() {
    ensure_env_logger_initialized();
    let mut store = MemoryZoneStore::new();
    insert_cluster(&mut store, 1, root_cluster());
    insert_data(&mut store, 5, utf16_be("Document"));

    let mut decoder =
        ClusterDecoder::new(&store).with_configuration(DecoderSettings::new().num_threads(1));
    let root = decoder.decode(1).expect("root to decode");

    assert_eq!(root.cluster.family, FamilyType::Root);
    let name = root.cluster.name_link.as_ref().expect("a name link");
    assert_eq!(name.ids, vec![5]);
    assert_eq!(name.link_type, LinkType::UnicodeList);

    let names = match &root.resolution.get(LinkOrigin::Name).expect("resolved").payload {
        Payload::UnicodeList(names) => names.clone(),
        other => panic!("unexpected payload {other:?}"),
    };
    assert_eq!(names.get(1).map(String::as_str), Some("Document"));
    assert_eq!(decoder.diagnostics().total(), 0);
}

#[test]
fn test_cluster_info_overrides_fingerprint() {
    ensure_env_logger_initialized();
    let mut store = MemoryZoneStore::new();
    insert_cluster(&mut store, 1, root_cluster());
    insert_data(&mut store, 5, utf16_be("Sheet"));

    let mut info = ByteWriter::new(Endianness::Big);
    // Family code 10 is Spreadsheet.
    info.u32(1).u16(10).u16(5).utf16("Sheet");
    insert_data(&mut store, 99, info.into_bytes());

    let mut decoder = ClusterDecoder::new(&store)
        .with_cluster_info(99)
        .expect("main list zone");
    assert_eq!(decoder.cluster_info().len(), 1);
    assert_eq!(
        decoder.cluster_info().get(1).map(|i| i.name.as_str()),
        Some("Sheet")
    );

    let cluster = decoder.decode(1).unwrap();
    assert_eq!(cluster.cluster.family, FamilyType::Spreadsheet);
}

#[test]
fn test_style_cluster_resolves_cascade() {
    ensure_env_logger_initialized();
    let fb = FieldBuilder::big();
    let body = [
        complex_field(Endianness::Big, tags::FONT_SIZE, &[fb.double(tags::DOUBLE, 12.0)]),
        complex_field(Endianness::Big, tags::FONT_FLAGS_SET, &[fb.long(tags::LONG, 0x3)]),
    ]
    .concat();
    let emphasis = [
        complex_field(Endianness::Big, tags::STYLE_PARENT, &[fb.long(tags::LONG, 1)]),
        complex_field(Endianness::Big, tags::STYLE_NAME, &[fb.unicode(tags::UNICODE, "Emphasis")]),
        complex_field(Endianness::Big, tags::FONT_FLAGS_CLEAR, &[fb.long(tags::LONG, 0x1)]),
    ]
    .concat();
    let (positions, payload) = list_zones(&[body, emphasis]);

    let mut store = MemoryZoneStore::new();
    // Type word 2: text styles.
    let style = ClusterBuilder::new(Endianness::Big)
        .header(STYLE_HEADER, 4, 2)
        .link_record(2, 0x20, &LinkSpec::pair(0x0001_0000, 0, 20, 21), &[], &[])
        .link_record(1, 0x1e, &LinkSpec::single(0x0017_5000, 0, 2, 22), &[], &[])
        .build();
    insert_cluster(&mut store, 4, style);
    insert_data(&mut store, 20, positions);
    insert_data(&mut store, 21, payload);
    insert_data(&mut store, 22, utf16_be("Body"));

    let mut decoder = ClusterDecoder::new(&store);
    let decoded = decoder.decode(4).unwrap();
    assert_eq!(decoded.cluster.family, FamilyType::Style);

    let Some(StyleSheet::Text(cascade)) = &decoded.styles else {
        panic!("expected a text style sheet, got {:?}", decoded.styles);
    };
    assert_eq!(cascade.resolved.len(), 2);

    let body = cascade.get(1).unwrap();
    assert_eq!(body.name.as_deref(), Some("Body"));
    assert_eq!(body.flags.effective(), FontFlags::BOLD | FontFlags::ITALIC);

    let emphasis = cascade.get(2).unwrap();
    assert_eq!(emphasis.name.as_deref(), Some("Emphasis"));
    assert_eq!(emphasis.font_size, Some(12.0));
    assert_eq!(emphasis.flags.effective(), FontFlags::ITALIC);
    assert_eq!(cascade.visit_order, vec![1, 2]);
}

#[test]
fn test_decode_all_collects_diagnostics_from_workers() {
    ensure_env_logger_initialized();
    let mut store = MemoryZoneStore::new();
    for id in 1..=4 {
        insert_cluster(&mut store, id, root_cluster());
    }
    // Every root names zone 5, which is missing.

    let sink = CollectingSink::new();
    let mut decoder = ClusterDecoder::new(&store)
        .with_configuration(DecoderSettings::new().num_threads(2))
        .with_diagnostics(Diagnostics::with_sink(Box::new(sink.clone())));

    let results = decoder.decode_all(&[1, 2, 3, 4]);
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(decoder.decoded_count(), 4);
    assert_eq!(decoder.diagnostics().count(AnomalyKind::StructuralMismatch), 4);
    assert!(
        sink.entries()
            .iter()
            .any(|e| e.label == "resolver" && e.summary.contains("zone 5"))
    );

    for result in results {
        let decoded = result.unwrap();
        assert_eq!(decoded.resolution.skipped.len(), 1);
        assert!(decoded.resolution.resolved.is_empty());
    }
}

#[test]
fn test_decoded_cluster_serializes() {
    let mut store = MemoryZoneStore::new();
    insert_cluster(&mut store, 1, root_cluster());
    insert_data(&mut store, 5, utf16_be("Doc"));

    let mut decoder = ClusterDecoder::new(&store);
    let root = decoder.decode(1).unwrap();
    let json = serde_json::to_value(&*root).expect("serializable");

    assert_eq!(json["cluster"]["family"], "Root");
    assert_eq!(json["cluster"]["name_link"]["ids"], serde_json::json!([5]));
}
