//! Vector plumbing nodes: component split and combine.

use anyhow::Result;

use crate::eval::{EvalContext, input_value};
use crate::graph::{Node, Tree};
use crate::overload::{FieldDefault, Overload, OverloadGroup, SocketSpec};
use crate::template::Template;
use crate::transpile::{OutputBinding, ShaderBundle};
use crate::types::{SocketType, Value};

pub static SPLIT_VECTOR: OverloadGroup = OverloadGroup {
    default_mode: "default",
    overloads: &[Overload {
        mode: "default",
        inputs: &[SocketSpec::new(
            "vec",
            SocketType::Vector,
            FieldDefault::Vector([0.0; 3]),
        )],
        outputs: &[
            SocketSpec::new("x", SocketType::Float, FieldDefault::Float(0.0)),
            SocketSpec::new("y", SocketType::Float, FieldDefault::Float(0.0)),
            SocketSpec::new("z", SocketType::Float, FieldDefault::Float(0.0)),
        ],
        evaluate: eval_split,
        shader: shader_split,
    }],
};

/// One eval fn serves all three outputs; the index picks the component.
fn eval_split(tree: &Tree, node: &Node, output: usize, ctx: &EvalContext) -> Result<Value> {
    let v = input_value(tree, node, 0, ctx)?.as_vec3()?;
    Ok(Value::Float(v[output]))
}

fn shader_split(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    let component = |swizzle: &str| -> OutputBinding {
        let expr = format!("{{parts}}.{swizzle}");
        let splat = format!("vec3({expr})");
        OutputBinding::new(&[
            (SocketType::Float, expr.as_str()),
            (SocketType::Vector, splat.as_str()),
            (SocketType::Color, splat.as_str()),
        ])
    };
    Ok(ShaderBundle {
        body: Template::new("vec3 {parts} = {vec};"),
        prelude: Template::default(),
        input_slots: &["vec"],
        slot_types: Vec::new(),
        outputs: vec![component("x"), component("y"), component("z")],
        uniforms: Vec::new(),
    })
}

pub static COMBINE_VECTOR: OverloadGroup = OverloadGroup {
    default_mode: "default",
    overloads: &[Overload {
        mode: "default",
        inputs: &[
            SocketSpec::new("x", SocketType::Float, FieldDefault::Float(0.0)),
            SocketSpec::new("y", SocketType::Float, FieldDefault::Float(0.0)),
            SocketSpec::new("z", SocketType::Float, FieldDefault::Float(0.0)),
        ],
        outputs: &[SocketSpec::new(
            "vector",
            SocketType::Vector,
            FieldDefault::Vector([0.0; 3]),
        )],
        evaluate: eval_combine,
        shader: shader_combine,
    }],
};

fn eval_combine(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    let x = input_value(tree, node, 0, ctx)?.as_float()?;
    let y = input_value(tree, node, 1, ctx)?.as_float()?;
    let z = input_value(tree, node, 2, ctx)?.as_float()?;
    Ok(Value::Vector([x, y, z]))
}

fn shader_combine(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    Ok(ShaderBundle {
        body: Template::new("vec3 {vector} = vec3({x}, {y}, {z});"),
        prelude: Template::default(),
        input_slots: &["x", "y", "z"],
        slot_types: Vec::new(),
        outputs: vec![OutputBinding::new(&[
            (SocketType::Vector, "{vector}"),
            (SocketType::Color, "{vector}"),
            (SocketType::Float, "{vector}.x"),
        ])],
        uniforms: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::evaluate;
    use crate::nodes::NodeKind;

    #[test]
    fn split_then_combine_reorders_components() {
        let mut tree = Tree::new();
        let lit = tree.add_node(NodeKind::VectorLiteral);
        for (i, v) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            let s = tree.node(lit).unwrap().data_inputs()[i];
            tree.set_field(s, Value::Float(v)).unwrap();
        }
        let split = tree.add_node(NodeKind::SplitVector);
        let combine = tree.add_node(NodeKind::CombineVector);
        tree.link(
            tree.node(lit).unwrap().outputs[0],
            tree.node(split).unwrap().data_inputs()[0],
        )
        .unwrap();
        // z -> x, x -> y, y -> z.
        for (from, to) in [(2, 0), (0, 1), (1, 2)] {
            tree.link(
                tree.node(split).unwrap().outputs[from],
                tree.node(combine).unwrap().data_inputs()[to],
            )
            .unwrap();
        }
        let out = tree.node(combine).unwrap().outputs[0];
        let got = evaluate(&tree, out, &EvalContext::default()).unwrap();
        assert_eq!(got, Value::Vector([3.0, 1.0, 2.0]));
    }
}
