//! Source nodes: literal vectors and the sampling position.

use anyhow::Result;

use crate::eval::{EvalContext, input_value};
use crate::graph::{Node, Tree};
use crate::overload::{FieldDefault, Overload, OverloadGroup, SocketSpec};
use crate::template::Template;
use crate::transpile::{OutputBinding, ShaderBundle};
use crate::types::{SocketType, Value};

pub static VECTOR_LITERAL: OverloadGroup = OverloadGroup {
    default_mode: "default",
    overloads: &[Overload {
        mode: "default",
        inputs: &[
            SocketSpec::constant("x", SocketType::Float, FieldDefault::Float(0.0)),
            SocketSpec::constant("y", SocketType::Float, FieldDefault::Float(0.0)),
            SocketSpec::constant("z", SocketType::Float, FieldDefault::Float(0.0)),
        ],
        outputs: &[SocketSpec::new(
            "vector",
            SocketType::Vector,
            FieldDefault::Vector([0.0; 3]),
        )],
        evaluate: eval_vector_literal,
        shader: shader_vector_literal,
    }],
};

fn eval_vector_literal(
    tree: &Tree,
    node: &Node,
    _output: usize,
    ctx: &EvalContext,
) -> Result<Value> {
    let x = input_value(tree, node, 0, ctx)?.as_float()?;
    let y = input_value(tree, node, 1, ctx)?.as_float()?;
    let z = input_value(tree, node, 2, ctx)?.as_float()?;
    Ok(Value::Vector([x, y, z]))
}

fn shader_vector_literal(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
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

pub static SAMPLE_POSITION: OverloadGroup = OverloadGroup {
    default_mode: "default",
    overloads: &[Overload {
        mode: "default",
        inputs: &[],
        outputs: &[SocketSpec::new(
            "position",
            SocketType::Vector,
            FieldDefault::Vector([0.0; 3]),
        )],
        evaluate: eval_sample_position,
        shader: shader_sample_position,
    }],
};

fn eval_sample_position(
    _tree: &Tree,
    _node: &Node,
    _output: usize,
    ctx: &EvalContext,
) -> Result<Value> {
    Ok(Value::Vector([ctx.coords[0], ctx.coords[1], 0.0]))
}

fn shader_sample_position(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    Ok(ShaderBundle {
        body: Template::default(),
        prelude: Template::default(),
        input_slots: &[],
        slot_types: Vec::new(),
        outputs: vec![OutputBinding::new(&[
            (SocketType::Vector, "vec3(v_coords, 0.0)"),
            (SocketType::Color, "vec3(v_coords, 0.0)"),
            (SocketType::Float, "v_coords.x"),
        ])],
        uniforms: Vec::new(),
    })
}
