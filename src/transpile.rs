//! Topological shader transpilation.
//!
//! The transpiler walks a target socket's dependency subgraph in depth-first
//! post-order (producers strictly before consumers), asks each node's active
//! overload for its shader variable bundle, substitutes producer
//! sub-expressions into consumer slots, and merges everything into one GLSL
//! fragment program built on the slot-substitution template engine.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use log::debug;

use crate::graph::{NodeId, SocketDirection, SocketId, Tree};
use crate::overload;
use crate::template::Template;
use crate::types::{SocketType, Value};

/// Handle to a uniform resolved by the GPU host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformHandle(pub u32);

/// Host-side write access to uniform storage. The core never talks to the
/// GPU itself; the host invokes each initializer with a live context and the
/// handle it resolved for the uniform's name.
pub trait UniformContext {
    fn write_float(&mut self, handle: UniformHandle, value: f32);
    fn write_vec3(&mut self, handle: UniformHandle, value: [f32; 3]);
}

pub type UniformInitializer = Box<dyn Fn(&mut dyn UniformContext, UniformHandle)>;

/// Named sub-expressions a node output offers to consumers, keyed by the
/// type a consumer may request. Entries are templates over the bundle's
/// local slot names; a requested type without an entry is a transpile error.
#[derive(Debug, Default)]
pub struct OutputBinding {
    entries: Vec<(SocketType, Template)>,
}

impl OutputBinding {
    pub fn new(entries: &[(SocketType, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(ty, expr)| (*ty, Template::new(*expr)))
                .collect(),
        }
    }

    fn template_for(&self, ty: SocketType) -> Option<&Template> {
        self.entries
            .iter()
            .find(|(t, _)| *t == ty)
            .map(|(_, tpl)| tpl)
    }
}

/// The per-node package merged during transpilation: a statement body, an
/// optional prelude hoisted above `main`, per-output sub-expressions and
/// uniform initializers. Bundles are built per node, consumed immediately
/// and discarded once merged.
pub struct ShaderBundle {
    pub body: Template,
    pub prelude: Template,
    /// Slot name for each data input, in order. An empty name means the
    /// bundle reads that input itself (constant dropdowns and the like).
    pub input_slots: &'static [&'static str],
    /// Requested-type overrides by slot name. A dynamic operand socket may
    /// still be resolved `DynamicAny` while the node computes in a concrete
    /// operating type; the override makes the producer hand over an
    /// expression of that type instead of its natural one.
    pub slot_types: Vec<(&'static str, SocketType)>,
    /// One binding per output socket, in order.
    pub outputs: Vec<OutputBinding>,
    /// Uniform name (already node-namespaced) to host-side initializer.
    pub uniforms: Vec<(String, UniformInitializer)>,
}

/// The merged program handed to the GPU host.
pub struct ShaderProgram {
    pub source: String,
    pub uniforms: HashMap<String, UniformInitializer>,
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("source", &self.source)
            .field("uniforms", &self.uniforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Fixed outer program. Shared helper functions mirror `colormath`; the
/// final value is converted to gamma sRGB and alpha drops for out-of-gamut
/// results.
const SHADER_SKELETON: &str = r#"#version 450

layout(location = 0) in vec2 v_coords;
layout(location = 0) out vec4 f_color;

float linear_to_srgb_channel(float x) {
    if (x <= 0.0031308) {
        return 12.92 * x;
    }
    return 1.055 * pow(x, 1.0 / 2.4) - 0.055;
}

vec3 linear_to_srgb(vec3 c) {
    return vec3(
        linear_to_srgb_channel(c.r),
        linear_to_srgb_channel(c.g),
        linear_to_srgb_channel(c.b)
    );
}

float srgb_to_linear_channel(float x) {
    if (x <= 0.04045) {
        return x / 12.92;
    }
    return pow((x + 0.055) / 1.055, 2.4);
}

vec3 srgb_to_linear(vec3 c) {
    return vec3(
        srgb_to_linear_channel(c.r),
        srgb_to_linear_channel(c.g),
        srgb_to_linear_channel(c.b)
    );
}

vec3 xyz_to_linear_srgb(vec3 xyz) {
    float r = 3.2406 * xyz.x - 1.5372 * xyz.y - 0.4986 * xyz.z;
    float g = -0.9689 * xyz.x + 1.8758 * xyz.y + 0.0415 * xyz.z;
    float b = 0.0557 * xyz.x - 0.2040 * xyz.y + 1.0570 * xyz.z;
    return vec3(r, g, b);
}

float lab_finv(float t) {
    float epsilon = 216.0 / 24389.0;
    float kappa = 24389.0 / 27.0;
    float t3 = t * t * t;
    if (t3 > epsilon) {
        return t3;
    }
    return (116.0 * t - 16.0) / kappa;
}

vec3 lab_to_xyz(vec3 lab, vec3 white) {
    float fy = (lab.x + 16.0) / 116.0;
    float fx = fy + lab.y / 500.0;
    float fz = fy - lab.z / 200.0;
    return vec3(lab_finv(fx), lab_finv(fy), lab_finv(fz)) * white;
}

vec3 hsl_to_rgb(vec3 hsl) {
    float h = fract(hsl.x);
    float s = clamp(hsl.y, 0.0, 1.0);
    float l = clamp(hsl.z, 0.0, 1.0);
    float c = (1.0 - abs(2.0 * l - 1.0)) * s;
    float hp = h * 6.0;
    float x = c * (1.0 - abs(mod(hp, 2.0) - 1.0));
    vec3 rgb;
    if (hp < 1.0) {
        rgb = vec3(c, x, 0.0);
    } else if (hp < 2.0) {
        rgb = vec3(x, c, 0.0);
    } else if (hp < 3.0) {
        rgb = vec3(0.0, c, x);
    } else if (hp < 4.0) {
        rgb = vec3(0.0, x, c);
    } else if (hp < 5.0) {
        rgb = vec3(x, 0.0, c);
    } else {
        rgb = vec3(c, 0.0, x);
    }
    return rgb + vec3(l - 0.5 * c);
}

float gamut_alpha(vec3 c) {
    float overflow = max(max(max(-c.r, c.r - 1.0), max(-c.g, c.g - 1.0)), max(-c.b, c.b - 1.0));
    if (overflow <= 0.0) {
        return 1.0;
    }
    return clamp(1.0 - overflow, 0.25, 0.75);
}

{prelude}

void main() {
{body}
    vec3 out_rgb = {result};
    f_color = vec4(linear_to_srgb(clamp(out_rgb, 0.0, 1.0)), gamut_alpha(out_rgb));
}
"#;

/// Nodes feeding `target`, producers strictly before consumers. Depth-first
/// post-order from the target: all input-link sources are appended before
/// the node itself.
pub fn dependency_order(tree: &Tree, target: SocketId) -> Result<Vec<NodeId>> {
    let start = tree.socket(target)?.node;
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(tree, start, &mut visited, &mut order)?;
    Ok(order)
}

fn visit(
    tree: &Tree,
    node: NodeId,
    visited: &mut HashSet<NodeId>,
    order: &mut Vec<NodeId>,
) -> Result<()> {
    if !visited.insert(node) {
        return Ok(());
    }
    for socket in tree.node(node)?.data_inputs() {
        if let Some(link) = tree.incoming_link(*socket) {
            visit(tree, link.from_node, visited, order)?;
        }
    }
    order.push(node);
    Ok(())
}

/// Transpiles the graph feeding `target` into a single GLSL fragment
/// program plus the merged uniform initializer map. No partial program is
/// ever returned: unresolved slots, missing type mappings and cyclical
/// links all fail the whole call.
pub fn transpile(tree: &Tree, target: SocketId) -> Result<ShaderProgram> {
    let target_socket = tree.socket(target)?;
    if target_socket.direction != SocketDirection::Output {
        bail!("transpile target must be an output socket (socket {target})");
    }
    tree.reject_cycles(target_socket.node)?;

    let order = dependency_order(tree, target)?;
    debug!("transpile socket {target}: {} node(s)", order.len());

    // Producing socket -> rendered sub-expressions per requestable type.
    let mut produced: HashMap<SocketId, Vec<(SocketType, String)>> = HashMap::new();
    let mut bodies: Vec<String> = Vec::new();
    let mut preludes: Vec<String> = Vec::new();
    let mut prelude_seen: HashSet<String> = HashSet::new();
    let mut uniforms: HashMap<String, UniformInitializer> = HashMap::new();

    for node_id in order {
        let node = tree.node(node_id)?;
        let overload = overload::active_overload(node)?;
        let bundle = (overload.shader)(tree, node)?;

        let data_inputs = node.data_inputs();
        if bundle.input_slots.len() != data_inputs.len() {
            bail!(
                "node {node_id} ({}) declares {} input slots for {} data inputs",
                node.kind.type_name(),
                bundle.input_slots.len(),
                data_inputs.len()
            );
        }
        if bundle.outputs.len() != node.outputs.len() {
            bail!(
                "node {node_id} ({}) declares {} output bindings for {} outputs",
                node.kind.type_name(),
                bundle.outputs.len(),
                node.outputs.len()
            );
        }

        let mut bindings: HashMap<String, String> = HashMap::new();
        for (slot, socket_id) in bundle.input_slots.iter().zip(data_inputs) {
            if slot.is_empty() {
                continue;
            }
            let requested = bundle
                .slot_types
                .iter()
                .find(|(name, _)| name == slot)
                .map(|(_, ty)| *ty);
            let expr = input_expression(tree, &produced, *socket_id, requested)?;
            bindings.insert((*slot).to_string(), expr);
        }

        // Every slot the bundle mentions that is not an input is a local
        // variable to be named; namespace it by node id.
        let mut locals: Vec<String> = Vec::new();
        let mut note_locals = |tpl: &Template| {
            for slot in tpl.slots() {
                let owned = slot.to_string();
                if !bindings.contains_key(&owned) && !locals.contains(&owned) {
                    locals.push(owned);
                }
            }
        };
        note_locals(&bundle.body);
        note_locals(&bundle.prelude);
        for binding in &bundle.outputs {
            for (_, tpl) in &binding.entries {
                note_locals(tpl);
            }
        }
        for local in locals {
            let name = format!("n{node_id}_{local}");
            bindings.insert(local, name);
        }

        let body = bundle.body.substitute(&bindings).finish()?;
        if !body.is_empty() {
            bodies.push(body);
        }
        let prelude = bundle.prelude.substitute(&bindings).finish()?;
        if !prelude.is_empty() && prelude_seen.insert(prelude.clone()) {
            preludes.push(prelude);
        }

        for (index, binding) in bundle.outputs.iter().enumerate() {
            let socket = node.outputs[index];
            let mut entries = Vec::with_capacity(binding.entries.len());
            for (ty, tpl) in &binding.entries {
                entries.push((*ty, tpl.substitute(&bindings).finish()?));
            }
            produced.insert(socket, entries);
        }

        for (name, init) in bundle.uniforms {
            if uniforms.insert(name.clone(), init).is_some() {
                bail!("duplicate uniform name `{name}`; node kinds must namespace uniforms");
            }
        }
    }

    let result = color_expression(tree, &produced, target)?;
    let source = assemble(&bodies, &preludes, &result)?;
    Ok(ShaderProgram { source, uniforms })
}

/// Expression to substitute into a consumer slot for a linked or unlinked
/// input socket. `requested` overrides the type asked of the producer; by
/// default it is the socket's resolved type.
fn input_expression(
    tree: &Tree,
    produced: &HashMap<SocketId, Vec<(SocketType, String)>>,
    socket: SocketId,
    requested: Option<SocketType>,
) -> Result<String> {
    let sock = tree.socket(socket)?;
    let ty = requested.unwrap_or_else(|| sock.effective_type());
    match tree.incoming_link(socket) {
        Some(link) => {
            let entries = produced.get(&link.from).ok_or_else(|| {
                anyhow::anyhow!(
                    "producer socket {} of node {} was not transpiled before its consumer",
                    link.from,
                    link.from_node
                )
            })?;
            match entries.iter().find(|(t, _)| *t == ty) {
                Some((_, expr)) => Ok(expr.clone()),
                None => bail!(
                    "node {} has no shader mapping for type {ty:?}, requested by \
                     socket `{}` of node {}",
                    link.from_node,
                    sock.label,
                    sock.node
                ),
            }
        }
        None => {
            let mut value = sock.field.coerce(ty)?;
            if sock.flags.hue {
                if let Value::Float(h) = value {
                    value = Value::Float(h - h.floor());
                }
            }
            value.glsl_literal()
        }
    }
}

/// A vec3 view of the target socket's value, for the skeleton's final color.
fn color_expression(
    tree: &Tree,
    produced: &HashMap<SocketId, Vec<(SocketType, String)>>,
    target: SocketId,
) -> Result<String> {
    let entries = produced
        .get(&target)
        .ok_or_else(|| anyhow::anyhow!("target socket {target} produced no shader value"))?;
    let find = |ty: SocketType| entries.iter().find(|(t, _)| *t == ty).map(|(_, e)| e);
    if let Some(expr) = find(SocketType::Color).or_else(|| find(SocketType::Vector)) {
        return Ok(expr.clone());
    }
    if let Some(expr) = find(SocketType::Float) {
        return Ok(format!("vec3({expr})"));
    }
    if let Some(expr) = find(SocketType::Bool) {
        return Ok(format!("vec3(float({expr}))"));
    }
    if let Some(expr) = find(SocketType::Integer) {
        return Ok(format!("vec3(float({expr}))"));
    }
    let sock = tree.socket(target)?;
    bail!(
        "socket `{}` of node {} resolves to {:?}, which has no color view for the final program",
        sock.label,
        sock.node,
        sock.effective_type()
    );
}

fn indent(body: &str) -> String {
    body.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn assemble(bodies: &[String], preludes: &[String], result: &str) -> Result<String> {
    let body = bodies.iter().map(|b| indent(b)).collect::<Vec<_>>().join("\n");
    let mut bindings = HashMap::new();
    bindings.insert("prelude".to_string(), preludes.join("\n"));
    bindings.insert("body".to_string(), body);
    bindings.insert("result".to_string(), result.to_string());
    Template::new(SHADER_SKELETON).substitute(&bindings).finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_has_exactly_the_expected_slots() {
        let t = Template::new(SHADER_SKELETON);
        assert_eq!(t.slots(), vec!["prelude", "body", "result"]);
    }

    #[test]
    fn indent_preserves_blank_lines() {
        assert_eq!(indent("a;\n\nb;"), "    a;\n\n    b;");
    }
}
