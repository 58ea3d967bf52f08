//! Color-space constructor nodes: sRGB, CIE L*a*b* and HSL.
//!
//! Each converter has two interchangeable overloads: `fromVec` takes one
//! vector input, `fromValues` takes the individual components. Lab carries
//! an illuminant dropdown that survives in both modes.

use anyhow::{Result, bail};

use crate::colormath::{self, Illuminant};
use crate::eval::{EvalContext, input_value};
use crate::graph::{Node, Tree};
use crate::overload::{FieldDefault, Overload, OverloadGroup, SocketSpec};
use crate::template::Template;
use crate::transpile::{OutputBinding, ShaderBundle};
use crate::types::{SocketType, Value};

const COLOR_OUT: &[SocketSpec] = &[SocketSpec::new(
    "color",
    SocketType::Color,
    FieldDefault::Color([0.0; 3]),
)];

fn color_entries() -> Vec<OutputBinding> {
    vec![OutputBinding::new(&[
        (SocketType::Color, "{color}"),
        (SocketType::Vector, "{color}"),
        (SocketType::Float, "{color}.x"),
    ])]
}

// ---- sRGB ----

pub static SRGB_COLOR: OverloadGroup = OverloadGroup {
    default_mode: "fromVec",
    overloads: &[
        Overload {
            mode: "fromVec",
            inputs: &[SocketSpec::new(
                "vec",
                SocketType::Vector,
                FieldDefault::Vector([0.0; 3]),
            )],
            outputs: COLOR_OUT,
            evaluate: eval_srgb_from_vec,
            shader: shader_srgb_from_vec,
        },
        Overload {
            mode: "fromValues",
            inputs: &[
                SocketSpec::new("r", SocketType::Float, FieldDefault::Float(0.0)),
                SocketSpec::new("g", SocketType::Float, FieldDefault::Float(0.0)),
                SocketSpec::new("b", SocketType::Float, FieldDefault::Float(0.0)),
            ],
            outputs: COLOR_OUT,
            evaluate: eval_srgb_from_values,
            shader: shader_srgb_from_values,
        },
    ],
};

/// Components are already linear sRGB; the constructor is a pass-through.
fn eval_srgb_from_vec(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    let v = input_value(tree, node, 0, ctx)?.as_vec3()?;
    Ok(Value::Color(v))
}

fn eval_srgb_from_values(
    tree: &Tree,
    node: &Node,
    _output: usize,
    ctx: &EvalContext,
) -> Result<Value> {
    let r = input_value(tree, node, 0, ctx)?.as_float()?;
    let g = input_value(tree, node, 1, ctx)?.as_float()?;
    let b = input_value(tree, node, 2, ctx)?.as_float()?;
    Ok(Value::Color([r, g, b]))
}

fn shader_srgb_from_vec(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    Ok(ShaderBundle {
        body: Template::new("vec3 {color} = {vec};"),
        prelude: Template::default(),
        input_slots: &["vec"],
        slot_types: Vec::new(),
        outputs: color_entries(),
        uniforms: Vec::new(),
    })
}

fn shader_srgb_from_values(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    Ok(ShaderBundle {
        body: Template::new("vec3 {color} = vec3({r}, {g}, {b});"),
        prelude: Template::default(),
        input_slots: &["r", "g", "b"],
        slot_types: Vec::new(),
        outputs: color_entries(),
        uniforms: Vec::new(),
    })
}

// ---- CIE L*a*b* ----

const ILLUMINANT: SocketSpec = SocketSpec::constant(
    "illuminant",
    SocketType::Dropdown,
    FieldDefault::Choice("d65"),
);

pub static LAB_COLOR: OverloadGroup = OverloadGroup {
    default_mode: "fromVec",
    overloads: &[
        Overload {
            mode: "fromVec",
            inputs: &[
                SocketSpec::new(
                    "lab",
                    SocketType::Vector,
                    FieldDefault::Vector([50.0, 0.0, 0.0]),
                ),
                ILLUMINANT,
            ],
            outputs: COLOR_OUT,
            evaluate: eval_lab_from_vec,
            shader: shader_lab_from_vec,
        },
        Overload {
            mode: "fromValues",
            inputs: &[
                SocketSpec::new("l", SocketType::Float, FieldDefault::Float(50.0)),
                SocketSpec::new("a", SocketType::Float, FieldDefault::Float(0.0)),
                SocketSpec::new("b", SocketType::Float, FieldDefault::Float(0.0)),
                ILLUMINANT,
            ],
            outputs: COLOR_OUT,
            evaluate: eval_lab_from_values,
            shader: shader_lab_from_values,
        },
    ],
};

fn parse_illuminant(choice: &str, node: u32) -> Result<Illuminant> {
    match choice {
        "d65" => Ok(Illuminant::D65),
        "d50" => Ok(Illuminant::D50),
        other => bail!("unknown illuminant `{other}` on node {node}"),
    }
}

/// Reads the constant illuminant dropdown at the given data-input index.
fn node_illuminant(tree: &Tree, node: &Node, index: usize) -> Result<Illuminant> {
    let socket = node.data_inputs()[index];
    parse_illuminant(tree.socket(socket)?.field.as_choice()?, node.id)
}

fn lab_to_color(lab: [f32; 3], illuminant: Illuminant) -> Value {
    Value::Color(colormath::xyz_to_linear_srgb(colormath::lab_to_xyz(
        lab, illuminant,
    )))
}

fn eval_lab_from_vec(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    let lab = input_value(tree, node, 0, ctx)?.as_vec3()?;
    Ok(lab_to_color(lab, node_illuminant(tree, node, 1)?))
}

fn eval_lab_from_values(
    tree: &Tree,
    node: &Node,
    _output: usize,
    ctx: &EvalContext,
) -> Result<Value> {
    let l = input_value(tree, node, 0, ctx)?.as_float()?;
    let a = input_value(tree, node, 1, ctx)?.as_float()?;
    let b = input_value(tree, node, 2, ctx)?.as_float()?;
    Ok(lab_to_color([l, a, b], node_illuminant(tree, node, 3)?))
}

fn white_literal(illuminant: Illuminant) -> Result<String> {
    Value::Vector(illuminant.white_point()).glsl_literal()
}

fn shader_lab_from_vec(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    let white = white_literal(node_illuminant(tree, node, 1)?)?;
    Ok(ShaderBundle {
        body: Template::new(format!(
            "vec3 {{color}} = xyz_to_linear_srgb(lab_to_xyz({{lab}}, {white}));"
        )),
        prelude: Template::default(),
        input_slots: &["lab", ""],
        slot_types: Vec::new(),
        outputs: color_entries(),
        uniforms: Vec::new(),
    })
}

fn shader_lab_from_values(tree: &Tree, node: &Node) -> Result<ShaderBundle> {
    let white = white_literal(node_illuminant(tree, node, 3)?)?;
    Ok(ShaderBundle {
        body: Template::new(format!(
            "vec3 {{color}} = xyz_to_linear_srgb(lab_to_xyz(vec3({{l}}, {{a}}, {{b}}), {white}));"
        )),
        prelude: Template::default(),
        input_slots: &["l", "a", "b", ""],
        slot_types: Vec::new(),
        outputs: color_entries(),
        uniforms: Vec::new(),
    })
}

// ---- HSL ----

pub static HSL_COLOR: OverloadGroup = OverloadGroup {
    default_mode: "fromVec",
    overloads: &[
        Overload {
            mode: "fromVec",
            inputs: &[SocketSpec::new(
                "hsl",
                SocketType::Vector,
                FieldDefault::Vector([0.0, 0.0, 0.5]),
            )],
            outputs: COLOR_OUT,
            evaluate: eval_hsl_from_vec,
            shader: shader_hsl_from_vec,
        },
        Overload {
            mode: "fromValues",
            inputs: &[
                SocketSpec::hue("h", FieldDefault::Float(0.0)),
                SocketSpec::new("s", SocketType::Float, FieldDefault::Float(1.0)),
                SocketSpec::new("l", SocketType::Float, FieldDefault::Float(0.5)),
            ],
            outputs: COLOR_OUT,
            evaluate: eval_hsl_from_values,
            shader: shader_hsl_from_values,
        },
    ],
};

fn hsl_to_color(hsl: [f32; 3]) -> Value {
    Value::Color(colormath::srgb_to_linear(colormath::hsl_to_rgb(hsl)))
}

fn eval_hsl_from_vec(tree: &Tree, node: &Node, _output: usize, ctx: &EvalContext) -> Result<Value> {
    let hsl = input_value(tree, node, 0, ctx)?.as_vec3()?;
    Ok(hsl_to_color(hsl))
}

fn eval_hsl_from_values(
    tree: &Tree,
    node: &Node,
    _output: usize,
    ctx: &EvalContext,
) -> Result<Value> {
    let h = input_value(tree, node, 0, ctx)?.as_float()?;
    let s = input_value(tree, node, 1, ctx)?.as_float()?;
    let l = input_value(tree, node, 2, ctx)?.as_float()?;
    Ok(hsl_to_color([h, s, l]))
}

fn shader_hsl_from_vec(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    Ok(ShaderBundle {
        body: Template::new("vec3 {color} = srgb_to_linear(hsl_to_rgb({hsl}));"),
        prelude: Template::default(),
        input_slots: &["hsl"],
        slot_types: Vec::new(),
        outputs: color_entries(),
        uniforms: Vec::new(),
    })
}

fn shader_hsl_from_values(_tree: &Tree, _node: &Node) -> Result<ShaderBundle> {
    Ok(ShaderBundle {
        body: Template::new("vec3 {color} = srgb_to_linear(hsl_to_rgb(vec3({h}, {s}, {l})));"),
        prelude: Template::default(),
        input_slots: &["h", "s", "l"],
        slot_types: Vec::new(),
        outputs: color_entries(),
        uniforms: Vec::new(),
    })
}
