//! Gradient ramp: blends between two constant color stops.
//!
//! The stops are constant-only sockets, so the shader path lifts them into
//! uniforms instead of baking literals; the host can re-upload new stop
//! colors without re-transpiling. Uniform names carry the node id, keeping
//! two ramps in one program from colliding.

use anyhow::Result;

use crate::eval::{EvalContext, input_value};
use crate::graph::{Node, Tree};
use crate::overload::{FieldDefault, Overload, OverloadGroup, SocketSpec};
use crate::template::Template;
use crate::transpile::{OutputBinding, ShaderBundle, UniformContext, UniformInitializer};
use crate::types::{SocketType, Value};

pub static GRADIENT_RAMP: OverloadGroup = OverloadGroup {
    default_mode: "default",
    overloads: &[Overload {
        mode: "default",
        inputs: &[
            SocketSpec::new("t", SocketType::Float, FieldDefault::Float(0.5)),
            SocketSpec::constant("from", SocketType::Color, FieldDefault::Color([0.0; 3])),
            SocketSpec::constant("to", SocketType::Color, FieldDefault::Color([1.0; 3])),
        ],
        outputs: &[SocketSpec::new(
            "color",
            SocketType::Color,
            FieldDefault::Color([0.0; 3]),
        )],
        evaluate: eval_ramp,
        shader: shader_ramp,
    }],
};

fn stops(tree: &Tree, node: &Node) -> Result<([f32; 3], [f32; 3])> {
    let inputs = node.data_inputs();
    let from = tree.socket(inputs[1])?.field.as_vec3()?;
    let to = tree.socket(inputs[2])?.field.as_vec3()?;
    Ok((from, to))
}

fn eval_ramp(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    let t = input_value(tree, node, 0, ctx)?.as_float()?;
    let (from, to) = stops(tree, node)?;
    Ok(Value::Color([
        from[0] + (to[0] - from[0]) * t,
        from[1] + (to[1] - from[1]) * t,
        from[2] + (to[2] - from[2]) * t,
    ]))
}

fn shader_ramp(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    let id = node.id;
    let (from, to) = stops(tree, node)?;
    let from_name = format!("u_n{id}_from");
    let to_name = format!("u_n{id}_to");
    let prelude = format!(
        "layout(set = 0, binding = {id}) uniform RampStops_n{id} {{\n    \
         vec3 {from_name};\n    vec3 {to_name};\n}};"
    );
    let body = format!("vec3 {{color}} = mix({from_name}, {to_name}, {{t}});");
    let uniforms: Vec<(String, UniformInitializer)> = vec![
        (
            from_name,
            Box::new(move |ctx: &mut dyn UniformContext, handle| ctx.write_vec3(handle, from)),
        ),
        (
            to_name,
            Box::new(move |ctx: &mut dyn UniformContext, handle| ctx.write_vec3(handle, to)),
        ),
    ];
    Ok(ShaderBundle {
        body: Template::new(body),
        prelude: Template::new(prelude),
        input_slots: &["t", "", ""],
        slot_types: Vec::new(),
        outputs: vec![OutputBinding::new(&[
            (SocketType::Color, "{color}"),
            (SocketType::Vector, "{color}"),
        ])],
        uniforms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::evaluate;
    use crate::nodes::NodeKind;

    #[test]
    fn midpoint_blends_the_stops() {
        let mut tree = Tree::new();
        let ramp = tree.add_node(NodeKind::GradientRamp);
        let inputs: Vec<_> = tree.node(ramp).unwrap().data_inputs().to_vec();
        tree.set_field(inputs[1], Value::Color([0.0, 0.0, 0.0])).unwrap();
        tree.set_field(inputs[2], Value::Color([1.0, 0.5, 0.0])).unwrap();
        tree.set_field(inputs[0], Value::Float(0.5)).unwrap();
        let out = tree.node(ramp).unwrap().outputs[0];
        let got = evaluate(&tree, out, &EvalContext::default()).unwrap();
        assert_eq!(got, Value::Color([0.5, 0.25, 0.0]));
    }

    #[test]
    fn stop_sockets_refuse_links() {
        let mut tree = Tree::new();
        let lit = tree.add_node(NodeKind::VectorLiteral);
        let ramp = tree.add_node(NodeKind::GradientRamp);
        let from = tree.node(ramp).unwrap().data_inputs()[1];
        let src = tree.node(lit).unwrap().outputs[0];
        assert!(tree.link(src, from).is_err());
    }

    #[test]
    fn ramp_uniforms_are_namespaced_by_node() {
        let mut tree = Tree::new();
        let a = tree.add_node(NodeKind::GradientRamp);
        let b = tree.add_node(NodeKind::GradientRamp);
        let names = |id| {
            let node = tree.node(id).unwrap();
            let bundle = shader_ramp(&tree, node).unwrap();
            bundle.uniforms.into_iter().map(|(n, _)| n).collect::<Vec<_>>()
        };
        let a_names = names(a);
        for name in names(b) {
            assert!(!a_names.contains(&name));
        }
    }
}
