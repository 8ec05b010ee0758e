use cluster_decoder::Diagnostics;
use cluster_decoder::style::{
    CutReason, FlagPatch, FontFlags, GraphicFlags, GraphicStyle, StyleNode, TextStyle,
    resolve_cascade,
};
use pretty_assertions::assert_eq;

mod fixtures;
use fixtures::ensure_env_logger_initialized;

fn text(size: Option<f64>, set: FontFlags, clear: FontFlags) -> TextStyle {
    TextStyle {
        font_size: size,
        flags: FlagPatch::new(set, clear),
        ..TextStyle::default()
    }
}

#[test]
fn test_three_node_cycle_resolves_each_once() {
    ensure_env_logger_initialized();
    // 1 -> 2 -> 3 -> 1
    let nodes = vec![
        StyleNode::new(text(Some(10.0), FontFlags::BOLD, FontFlags::empty())).with_parent(2),
        StyleNode::new(text(None, FontFlags::ITALIC, FontFlags::empty())).with_parent(3),
        StyleNode::new(text(None, FontFlags::UNDERLINE, FontFlags::empty())).with_parent(1),
    ];

    let mut diag = Diagnostics::new();
    let cascade = resolve_cascade(&nodes, &mut diag);

    assert_eq!(cascade.resolved.len(), 3);
    let mut order = cascade.visit_order.clone();
    order.sort_unstable();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(cascade.cut_edges.len(), 1);
    assert_eq!(cascade.cut_edges[0].reason, CutReason::Cycle);

    // Only the style resolved last sits below the other two and carries all three flags.
    let all = FontFlags::BOLD | FontFlags::ITALIC | FontFlags::UNDERLINE;
    let full = cascade
        .resolved
        .iter()
        .filter(|s| s.flags.effective() == all)
        .count();
    assert_eq!(full, 1);
}

#[test]
fn test_cleared_flag_leaves_the_rest() {
    let nodes = vec![
        StyleNode::new(text(
            Some(11.0),
            FontFlags::BOLD | FontFlags::UNDERLINE | FontFlags::SMALL_CAPS,
            FontFlags::empty(),
        )),
        StyleNode::new(text(None, FontFlags::empty(), FontFlags::UNDERLINE)).with_parent(1),
        StyleNode::new(text(Some(14.0), FontFlags::empty(), FontFlags::empty())).with_parent(2),
    ];

    let mut diag = Diagnostics::new();
    let cascade = resolve_cascade(&nodes, &mut diag);

    let leaf = cascade.get(3).unwrap();
    assert_eq!(leaf.flags.effective(), FontFlags::BOLD | FontFlags::SMALL_CAPS);
    assert_eq!(leaf.font_size, Some(14.0));
    assert_eq!(cascade.get(2).unwrap().font_size, Some(11.0));
    assert_eq!(diag.total(), 0);
}

#[test]
fn test_graphic_styles_inherit_fill_and_line() {
    let base = GraphicStyle {
        line_width: Some(1.5),
        fill_color: Some(0x00ff_0000),
        flags: FlagPatch::new(GraphicFlags::SHADOW | GraphicFlags::ROUNDED, GraphicFlags::empty()),
        ..GraphicStyle::default()
    };
    let derived = GraphicStyle {
        fill_color: Some(0x0000_ff00),
        flags: FlagPatch::new(GraphicFlags::NO_LINE, GraphicFlags::SHADOW),
        ..GraphicStyle::default()
    };
    let nodes = vec![StyleNode::new(base), StyleNode::new(derived).with_parent(1)];

    let mut diag = Diagnostics::new();
    let cascade = resolve_cascade(&nodes, &mut diag);
    let derived = cascade.get(2).unwrap();

    assert_eq!(derived.line_width, Some(1.5));
    assert_eq!(derived.fill_color, Some(0x0000_ff00));
    assert_eq!(
        derived.flags.effective(),
        GraphicFlags::ROUNDED | GraphicFlags::NO_LINE
    );
}

#[test]
fn test_linked_parent_resolves_regardless_of_numbering() {
    let big = || text(Some(20.0), FontFlags::empty(), FontFlags::empty());
    let plain = || text(None, FontFlags::ITALIC, FontFlags::empty());

    let child_first = vec![
        StyleNode::new(plain()).with_linked_parent(2),
        StyleNode::new(big()),
    ];
    let child_last = vec![
        StyleNode::new(big()),
        StyleNode::new(plain()).with_linked_parent(1),
    ];

    let mut diag = Diagnostics::new();
    let first = resolve_cascade(&child_first, &mut diag);
    let last = resolve_cascade(&child_last, &mut diag);

    assert_eq!(first.get(1).unwrap().font_size, Some(20.0));
    assert_eq!(first.get(1), last.get(2));
    assert!(first.cut_edges.is_empty());
    assert_eq!(diag.total(), 0);
}
