//! Transpilation to GLSL: statement ordering, uniform plumbing and naga
//! validation of the merged programs.

use std::collections::HashMap;

use chroma_graph::{NodeId, NodeKind, SocketId, Tree, Value, switch_mode, transpile};
use chroma_graph::transpile::{UniformContext, UniformHandle, dependency_order};
use chroma_graph::validation::validate_fragment;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn out(tree: &Tree, node: NodeId) -> SocketId {
    tree.node(node).unwrap().outputs[0]
}

fn input(tree: &Tree, node: NodeId, i: usize) -> SocketId {
    tree.node(node).unwrap().data_inputs()[i]
}

fn vector_literal(tree: &mut Tree, v: [f32; 3]) -> NodeId {
    let node = tree.add_node(NodeKind::VectorLiteral);
    for (i, x) in v.into_iter().enumerate() {
        tree.set_field(input(tree, node, i), Value::Float(x)).unwrap();
    }
    node
}

#[test]
fn producer_statements_come_before_consumers() {
    init_logs();
    let mut tree = Tree::new();
    let lit = vector_literal(&mut tree, [0.0, 0.812, 0.0]);
    let color = tree.add_node(NodeKind::SrgbColor);
    tree.link(out(&tree, lit), input(&tree, color, 0)).unwrap();

    let program = transpile(&tree, out(&tree, color)).unwrap();
    let lit_line = format!("vec3 n{lit}_vector = vec3(0.0, 0.812, 0.0);");
    let color_line = format!("vec3 n{color}_color = n{lit}_vector;");
    let src = &program.source;
    let lit_at = src.find(&lit_line).expect("literal statement missing");
    let color_at = src.find(&color_line).expect("color statement missing");
    assert!(lit_at < color_at);
    assert!(src.contains(&format!("vec3 out_rgb = n{color}_color;")));
    validate_fragment(src).unwrap();
}

#[test]
fn dependency_order_visits_a_diamond_once() {
    init_logs();
    let mut tree = Tree::new();
    let pos = tree.add_node(NodeKind::SamplePosition);
    let split = tree.add_node(NodeKind::SplitVector);
    tree.link(out(&tree, pos), input(&tree, split, 0)).unwrap();
    let combine = tree.add_node(NodeKind::CombineVector);
    for i in 0..3 {
        tree.link(
            tree.node(split).unwrap().outputs[i],
            input(&tree, combine, i),
        )
        .unwrap();
    }
    let order = dependency_order(&tree, out(&tree, combine)).unwrap();
    assert_eq!(order, vec![pos, split, combine]);
}

#[test]
fn full_pipeline_program_passes_naga() {
    init_logs();
    let mut tree = Tree::new();
    let pos = tree.add_node(NodeKind::SamplePosition);
    let split = tree.add_node(NodeKind::SplitVector);
    tree.link(out(&tree, pos), input(&tree, split, 0)).unwrap();

    let cmp = tree.add_node(NodeKind::Compare);
    tree.link(tree.node(split).unwrap().outputs[0], input(&tree, cmp, 0))
        .unwrap();
    tree.set_field(input(&tree, cmp, 1), Value::Float(0.5)).unwrap();

    // Bool feeding a dynamic arithmetic input exercises the float() wrap.
    let mix = tree.add_node(NodeKind::Arithmetic);
    switch_mode(&mut tree, mix, "multiply").unwrap();
    tree.link(out(&tree, cmp), input(&tree, mix, 0)).unwrap();
    tree.set_field(input(&tree, mix, 1), Value::Float(0.75)).unwrap();

    let hsl = tree.add_node(NodeKind::HslColor);
    switch_mode(&mut tree, hsl, "fromValues").unwrap();
    tree.link(out(&tree, mix), input(&tree, hsl, 0)).unwrap();

    let program = transpile(&tree, out(&tree, hsl)).unwrap();
    validate_fragment(&program.source).unwrap();
}

#[test]
fn lab_program_inlines_the_chosen_white_point() {
    init_logs();
    let mut tree = Tree::new();
    let lab = tree.add_node(NodeKind::LabColor);
    tree.set_field(input(&tree, lab, 1), Value::Choice("d50".into())).unwrap();
    let program = transpile(&tree, out(&tree, lab)).unwrap();
    assert!(program.source.contains("0.96422"), "{}", program.source);
    validate_fragment(&program.source).unwrap();
}

#[test]
fn ramp_uniforms_are_namespaced_and_initialized() {
    init_logs();
    #[derive(Default)]
    struct Recorder {
        vec3s: HashMap<u32, [f32; 3]>,
    }
    impl UniformContext for Recorder {
        fn write_float(&mut self, _handle: UniformHandle, _value: f32) {}
        fn write_vec3(&mut self, handle: UniformHandle, value: [f32; 3]) {
            self.vec3s.insert(handle.0, value);
        }
    }

    let mut tree = Tree::new();
    let a = tree.add_node(NodeKind::GradientRamp);
    let b = tree.add_node(NodeKind::GradientRamp);
    tree.set_field(input(&tree, a, 2), Value::Color([0.2, 0.4, 0.6])).unwrap();
    let mix = tree.add_node(NodeKind::Arithmetic);
    tree.link(out(&tree, a), input(&tree, mix, 0)).unwrap();
    tree.link(out(&tree, b), input(&tree, mix, 1)).unwrap();

    let program = transpile(&tree, out(&tree, mix)).unwrap();
    let mut names: Vec<_> = program.uniforms.keys().cloned().collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            format!("u_n{a}_from"),
            format!("u_n{a}_to"),
            format!("u_n{b}_from"),
            format!("u_n{b}_to"),
        ]
    );

    let mut recorder = Recorder::default();
    let init = &program.uniforms[&format!("u_n{a}_to")];
    init(&mut recorder, UniformHandle(7));
    assert_eq!(recorder.vec3s[&7], [0.2, 0.4, 0.6]);

    validate_fragment(&program.source).unwrap();
}

#[test]
fn vector_valued_producer_feeds_a_float_consumer_cleanly() {
    init_logs();
    let mut tree = Tree::new();
    let lit = vector_literal(&mut tree, [0.3, 0.6, 0.9]);
    let srgb = tree.add_node(NodeKind::SrgbColor);
    tree.link(out(&tree, lit), input(&tree, srgb, 0)).unwrap();

    // m1 operates in Color, m2 falls back to Float; the dynamic link between
    // them must hand m2 a float-shaped view of m1's vec3 local.
    let m1 = tree.add_node(NodeKind::Arithmetic);
    tree.link(out(&tree, srgb), input(&tree, m1, 0)).unwrap();
    let m2 = tree.add_node(NodeKind::Arithmetic);
    tree.link(out(&tree, m1), input(&tree, m2, 0)).unwrap();
    tree.set_field(input(&tree, m2, 1), Value::Float(0.25)).unwrap();

    let program = transpile(&tree, out(&tree, m2)).unwrap();
    assert!(
        program.source.contains(&format!("n{m1}_result.x")),
        "{}",
        program.source
    );
    validate_fragment(&program.source).unwrap();
}

#[test]
fn missing_type_mapping_fails_the_whole_transpile() {
    init_logs();
    let mut tree = Tree::new();
    let ramp = tree.add_node(NodeKind::GradientRamp);
    let cmp = tree.add_node(NodeKind::Compare);
    // The ramp only offers color-shaped expressions; a Float consumer has
    // nothing to request.
    tree.link(out(&tree, ramp), input(&tree, cmp, 0)).unwrap();
    let err = transpile(&tree, out(&tree, cmp)).unwrap_err();
    assert!(format!("{err:#}").contains("no shader mapping"));
}

#[test]
fn cyclical_graphs_never_produce_a_program() {
    init_logs();
    let mut tree = Tree::new();
    let a = tree.add_node(NodeKind::Arithmetic);
    let b = tree.add_node(NodeKind::Arithmetic);
    tree.link(out(&tree, a), input(&tree, b, 0)).unwrap();
    tree.link(out(&tree, b), input(&tree, a, 0)).unwrap();
    assert!(transpile(&tree, out(&tree, b)).is_err());
}
