//! Arithmetic and comparison nodes.
//!
//! Arithmetic works on whatever its dynamic sockets have resolved to: the
//! operating type is the most restrictive type across the dynamic inputs
//! and the output, falling back to Float when nothing is linked. Scalar-ish
//! operands (Bool, Integer, Float) compute in floats; Vector and Color
//! compute component-wise.

use anyhow::Result;

use crate::eval::{EvalContext, input_value};
use crate::graph::{Node, Tree};
use crate::overload::{FieldDefault, Overload, OverloadGroup, SocketSpec};
use crate::template::Template;
use crate::transpile::{OutputBinding, ShaderBundle};
use crate::types::{SocketType, Value};

const BINARY_INPUTS: &[SocketSpec] = &[
    SocketSpec::dynamic("a", FieldDefault::Float(0.0)),
    SocketSpec::dynamic("b", FieldDefault::Float(0.0)),
];

const LERP_INPUTS: &[SocketSpec] = &[
    SocketSpec::dynamic("a", FieldDefault::Float(0.0)),
    SocketSpec::dynamic("b", FieldDefault::Float(1.0)),
    SocketSpec::new("t", SocketType::Float, FieldDefault::Float(0.5)),
];

const DYNAMIC_RESULT: &[SocketSpec] =
    &[SocketSpec::dynamic("result", FieldDefault::Float(0.0))];

pub static ARITHMETIC: OverloadGroup = OverloadGroup {
    default_mode: "add",
    overloads: &[
        Overload {
            mode: "add",
            inputs: BINARY_INPUTS,
            outputs: DYNAMIC_RESULT,
            evaluate: eval_add,
            shader: shader_add,
        },
        Overload {
            mode: "subtract",
            inputs: BINARY_INPUTS,
            outputs: DYNAMIC_RESULT,
            evaluate: eval_subtract,
            shader: shader_subtract,
        },
        Overload {
            mode: "multiply",
            inputs: BINARY_INPUTS,
            outputs: DYNAMIC_RESULT,
            evaluate: eval_multiply,
            shader: shader_multiply,
        },
        Overload {
            mode: "divide",
            inputs: BINARY_INPUTS,
            outputs: DYNAMIC_RESULT,
            evaluate: eval_divide,
            shader: shader_divide,
        },
        Overload {
            mode: "lerp",
            inputs: LERP_INPUTS,
            outputs: DYNAMIC_RESULT,
            evaluate: eval_lerp,
            shader: shader_lerp,
        },
    ],
};

/// The type arithmetic happens in: the most restrictive resolution across
/// the node's dynamic sockets, Float when none of them is linked.
fn operating_type(tree: &Tree, node: &Node) -> Result<SocketType> {
    let mut ty = SocketType::DynamicAny;
    for socket in node.data_inputs().iter().chain(node.outputs.iter()) {
        let sock = tree.socket(*socket)?;
        if sock.flags.dynamic {
            ty = SocketType::most_restrictive(ty, sock.effective_type());
        }
    }
    if ty == SocketType::DynamicAny {
        ty = SocketType::Float;
    }
    Ok(ty)
}

fn is_vectorish(ty: SocketType) -> bool {
    matches!(ty, SocketType::Vector | SocketType::Color)
}

fn apply(ty: SocketType, a: &Value, b: &Value, op: impl Fn(f32, f32) -> f32) -> Result<Value> {
    if is_vectorish(ty) {
        let a = a.as_vec3()?;
        let b = b.as_vec3()?;
        Value::Vector([op(a[0], b[0]), op(a[1], b[1]), op(a[2], b[2])]).coerce(ty)
    } else {
        Value::Float(op(a.as_float()?, b.as_float()?)).coerce(ty)
    }
}

fn eval_binary(
    tree: &Tree,
    node: &Node,
    ctx: &EvalContext,
    op: fn(f32, f32) -> f32,
) -> Result<Value> {
    let ty = operating_type(tree, node)?;
    let a = input_value(tree, node, 0, ctx)?;
    let b = input_value(tree, node, 1, ctx)?;
    apply(ty, &a, &b, op)
}

fn eval_add(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    eval_binary(tree, node, ctx, |a, b| a + b)
}

fn eval_subtract(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    eval_binary(tree, node, ctx, |a, b| a - b)
}

fn eval_multiply(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    eval_binary(tree, node, ctx, |a, b| a * b)
}

fn eval_divide(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    eval_binary(tree, node, ctx, |a, b| a / b)
}

fn eval_lerp(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    let ty = operating_type(tree, node)?;
    let t = input_value(tree, node, 2, ctx)?.as_float()?;
    let a = input_value(tree, node, 0, ctx)?;
    let b = input_value(tree, node, 1, ctx)?;
    apply(ty, &a, &b, move |a, b| a + (b - a) * t)
}

fn result_entries(ty: SocketType) -> OutputBinding {
    if is_vectorish(ty) {
        OutputBinding::new(&[
            (SocketType::Vector, "{result}"),
            (SocketType::Color, "{result}"),
            (SocketType::Float, "{result}.x"),
            (SocketType::Bool, "({result}.x != 0.0)"),
            (SocketType::Integer, "int({result}.x)"),
        ])
    } else {
        OutputBinding::new(&[
            (SocketType::Float, "{result}"),
            (SocketType::Vector, "vec3({result})"),
            (SocketType::Color, "vec3({result})"),
            (SocketType::Bool, "({result} != 0.0)"),
            (SocketType::Integer, "int({result})"),
        ])
    }
}

/// The type to request for an operand slot. Asking producers for the
/// operating type directly keeps the GPU path on the same coercions as the
/// CPU path (`as_float` takes `.x` of a vector, scalars splat), whatever
/// the operand socket itself resolved to.
fn operand_request(ty: SocketType) -> SocketType {
    if is_vectorish(ty) { ty } else { SocketType::Float }
}

fn shader_binary(tree: &Tree, node: &Node, symbol: &str) -> Result<ShaderBundle> {
    let ty = operating_type(tree, node)?;
    let glsl = if is_vectorish(ty) { "vec3" } else { "float" };
    let request = operand_request(ty);
    Ok(ShaderBundle {
        body: Template::new(format!("{glsl} {{result}} = {{a}} {symbol} {{b}};")),
        prelude: Template::default(),
        input_slots: &["a", "b"],
        slot_types: vec![("a", request), ("b", request)],
        outputs: vec![result_entries(ty)],
        uniforms: Vec::new(),
    })
}

fn shader_add(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    shader_binary(tree, node, "+")
}

fn shader_subtract(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    shader_binary(tree, node, "-")
}

fn shader_multiply(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    shader_binary(tree, node, "*")
}

fn shader_divide(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    shader_binary(tree, node, "/")
}

fn shader_lerp(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    let ty = operating_type(tree, node)?;
    let glsl = if is_vectorish(ty) { "vec3" } else { "float" };
    let request = operand_request(ty);
    Ok(ShaderBundle {
        body: Template::new(format!("{glsl} {{result}} = mix({{a}}, {{b}}, {{t}});")),
        prelude: Template::default(),
        input_slots: &["a", "b", "t"],
        slot_types: vec![("a", request), ("b", request)],
        outputs: vec![result_entries(ty)],
        uniforms: Vec::new(),
    })
}

// ---- Compare ----

pub static COMPARE: OverloadGroup = OverloadGroup {
    default_mode: "lessThan",
    overloads: &[
        Overload {
            mode: "lessThan",
            inputs: COMPARE_INPUTS,
            outputs: BOOL_RESULT,
            evaluate: eval_less_than,
            shader: shader_less_than,
        },
        Overload {
            mode: "greaterThan",
            inputs: COMPARE_INPUTS,
            outputs: BOOL_RESULT,
            evaluate: eval_greater_than,
            shader: shader_greater_than,
        },
        Overload {
            mode: "equal",
            inputs: COMPARE_INPUTS,
            outputs: BOOL_RESULT,
            evaluate: eval_equal,
            shader: shader_equal,
        },
    ],
};

const COMPARE_INPUTS: &[SocketSpec] = &[
    SocketSpec::new("a", SocketType::Float, FieldDefault::Float(0.0)),
    SocketSpec::new("b", SocketType::Float, FieldDefault::Float(0.0)),
];

const BOOL_RESULT: &[SocketSpec] = &[SocketSpec::new(
    "result",
    SocketType::Bool,
    FieldDefault::Bool(false),
)];

fn eval_compare(
    tree: &Tree,
    node: &Node,
    ctx: &EvalContext,
    op: fn(f32, f32) -> bool,
) -> Result<Value> {
    let a = input_value(tree, node, 0, ctx)?.as_float()?;
    let b = input_value(tree, node, 1, ctx)?.as_float()?;
    Ok(Value::Bool(op(a, b)))
}

fn eval_less_than(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    eval_compare(tree, node, ctx, |a, b| a < b)
}

fn eval_greater_than(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    eval_compare(tree, node, ctx, |a, b| a > b)
}

fn eval_equal(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    eval_compare(tree, node, ctx, |a, b| a == b)
}

fn shader_compare(symbol: &str) -> Result<ShaderBundle> {
    Ok(ShaderBundle {
        body: Template::new(format!("bool {{result}} = {{a}} {symbol} {{b}};")),
        prelude: Template::default(),
        input_slots: &["a", "b"],
        slot_types: Vec::new(),
        outputs: vec![OutputBinding::new(&[
            (SocketType::Bool, "{result}"),
            (SocketType::Float, "float({result})"),
            (SocketType::Integer, "int({result})"),
            (SocketType::Vector, "vec3(float({result}))"),
            (SocketType::Color, "vec3(float({result}))"),
        ])],
        uniforms: Vec::new(),
    })
}

fn shader_less_than(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    shader_compare("<")
}

fn shader_greater_than(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    shader_compare(">")
}

fn shader_equal(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    shader_compare("==")
}
