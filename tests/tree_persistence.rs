//! Saving and loading tree documents.

use chroma_graph::{
    EvalContext, NodeId, NodeKind, SocketId, Tree, Value, evaluate, from_json, switch_mode,
    to_json,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn out(tree: &Tree, node: NodeId) -> SocketId {
    tree.node(node).unwrap().outputs[0]
}

fn input(tree: &Tree, node: NodeId, i: usize) -> SocketId {
    tree.node(node).unwrap().data_inputs()[i]
}

fn sample_tree() -> Tree {
    let mut tree = Tree::new();
    let lit = tree.add_node(NodeKind::VectorLiteral);
    tree.set_field(input(&tree, lit, 1), Value::Float(0.812)).unwrap();

    let lab = tree.add_node(NodeKind::LabColor);
    switch_mode(&mut tree, lab, "fromValues").unwrap();
    tree.set_field(input(&tree, lab, 3), Value::Choice("d50".into())).unwrap();

    let mix = tree.add_node(NodeKind::Arithmetic);
    switch_mode(&mut tree, mix, "lerp").unwrap();
    tree.link(out(&tree, lit), input(&tree, mix, 0)).unwrap();
    tree.link(out(&tree, lab), input(&tree, mix, 1)).unwrap();
    tree.set_field(input(&tree, mix, 2), Value::Float(0.3)).unwrap();
    tree.set_position(mix, [120.0, -40.0]).unwrap();
    tree
}

#[test]
fn round_trip_preserves_structure_and_behavior() {
    init_logs();
    let tree = sample_tree();
    let json = to_json(&tree).unwrap();
    let loaded = from_json(&json).unwrap();

    assert_eq!(loaded.nodes().count(), tree.nodes().count());
    assert_eq!(loaded.links().count(), tree.links().count());

    let kinds: Vec<_> = loaded.nodes().map(|n| (n.kind, n.mode)).collect();
    assert_eq!(
        kinds,
        vec![
            (NodeKind::VectorLiteral, "default"),
            (NodeKind::LabColor, "fromValues"),
            (NodeKind::Arithmetic, "lerp"),
        ]
    );
    let mix = loaded.nodes().last().unwrap().id;
    assert_eq!(loaded.node(mix).unwrap().position, [120.0, -40.0]);

    // Same inputs, same result: documents capture everything evaluation
    // depends on, including dynamic type resolution via the links.
    let ctx = EvalContext::default();
    let before = evaluate(&tree, out(&tree, tree.nodes().last().unwrap().id), &ctx).unwrap();
    let after = evaluate(&loaded, out(&loaded, mix), &ctx).unwrap();
    assert_eq!(before, after);
}

#[test]
fn round_trip_survives_a_second_pass_unchanged() {
    init_logs();
    let json = to_json(&sample_tree()).unwrap();
    let again = to_json(&from_json(&json).unwrap()).unwrap();
    assert_eq!(json, again);
}

#[test]
fn unknown_mode_aborts_the_import() {
    init_logs();
    let json = to_json(&sample_tree()).unwrap();
    let broken = json.replace("\"lerp\"", "\"modulo\"");
    let err = from_json(&broken).unwrap_err();
    assert!(format!("{err:#}").contains("modulo"));
}

#[test]
fn dangling_link_aborts_the_import() {
    init_logs();
    let json = to_json(&sample_tree()).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    doc["links"][0]["from"] = serde_json::json!(9999);
    let err = from_json(&doc.to_string()).unwrap_err();
    assert!(format!("{err:#}").contains("9999"));
}

#[test]
fn malformed_json_is_reported_as_such() {
    init_logs();
    let err = from_json("{\"nodes\": [").unwrap_err();
    assert!(format!("{err:#}").contains("malformed"));
}
