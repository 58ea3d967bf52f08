//! Overloads: interchangeable socket/behavior sets selected by a node mode.
//!
//! An [`Overload`] is a self-contained definition of the sockets a node
//! exposes in one mode plus the functions computing its CPU values and
//! shader fragments. Groups are static data attached to node kinds; the
//! same mechanism carries per-kind dispatch, so single-mode kinds are just
//! groups with one entry.

use anyhow::{Result, bail};
use log::debug;

use crate::eval::EvalContext;
use crate::graph::{Node, NodeId, SocketDirection, SocketFlags, Tree};
use crate::transpile::ShaderBundle;
use crate::types::{SocketType, Value};

/// Constant default for a socket field, const-constructible so overload
/// tables can live in statics.
#[derive(Clone, Copy, Debug)]
pub enum FieldDefault {
    Float(f32),
    Integer(i32),
    Bool(bool),
    Vector([f32; 3]),
    Color([f32; 3]),
    Choice(&'static str),
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Float(x) => Value::Float(x),
            FieldDefault::Integer(i) => Value::Integer(i),
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::Vector(v) => Value::Vector(v),
            FieldDefault::Color(c) => Value::Color(c),
            FieldDefault::Choice(s) => Value::Choice(s.to_string()),
        }
    }
}

/// Blueprint for one socket of an overload.
#[derive(Clone, Copy, Debug)]
pub struct SocketSpec {
    pub label: &'static str,
    pub ty: SocketType,
    pub flags: SocketFlags,
    pub default: FieldDefault,
}

impl SocketSpec {
    pub const fn new(label: &'static str, ty: SocketType, default: FieldDefault) -> Self {
        Self {
            label,
            ty,
            flags: SocketFlags::NONE,
            default,
        }
    }

    pub const fn constant(label: &'static str, ty: SocketType, default: FieldDefault) -> Self {
        Self {
            label,
            ty,
            flags: SocketFlags {
                dynamic: false,
                constant_only: true,
                hue: false,
            },
            default,
        }
    }

    pub const fn dynamic(label: &'static str, default: FieldDefault) -> Self {
        Self {
            label,
            ty: SocketType::DynamicAny,
            flags: SocketFlags {
                dynamic: true,
                constant_only: false,
                hue: false,
            },
            default,
        }
    }

    pub const fn hue(label: &'static str, default: FieldDefault) -> Self {
        Self {
            label,
            ty: SocketType::Float,
            flags: SocketFlags {
                dynamic: false,
                constant_only: false,
                hue: true,
            },
            default,
        }
    }
}

/// Computes the value of the node's output socket at the given index.
pub type EvalFn = fn(&Tree, &Node, usize, &EvalContext) -> Result<Value>;

/// Produces the node's shader variable bundle for the active mode.
pub type ShaderFn = fn(&Tree, &Node) -> Result<ShaderBundle>;

pub struct Overload {
    pub mode: &'static str,
    pub inputs: &'static [SocketSpec],
    pub outputs: &'static [SocketSpec],
    pub evaluate: EvalFn,
    pub shader: ShaderFn,
}

pub struct OverloadGroup {
    pub default_mode: &'static str,
    pub overloads: &'static [Overload],
}

impl OverloadGroup {
    /// Lookup by mode identifier; an absent mode is a fail-fast error.
    pub fn get(&self, mode: &str) -> Result<&'static Overload> {
        for overload in self.overloads {
            if overload.mode == mode {
                return Ok(overload);
            }
        }
        bail!("unknown overload mode `{mode}`");
    }

    pub fn modes(&self) -> impl Iterator<Item = &'static str> {
        self.overloads.iter().map(|o| o.mode)
    }
}

/// The overload currently selected on a node.
pub fn active_overload(node: &Node) -> Result<&'static Overload> {
    node.kind.overload_group().get(node.mode)
}

/// Creates and installs an overload's sockets on a node. The node's lists
/// must not contain managed sockets already.
pub(crate) fn install(tree: &mut Tree, node: NodeId, overload: &'static Overload) {
    for spec in overload.inputs {
        let socket = tree.create_socket(node, SocketDirection::Input, spec);
        tree.push_input(node, socket);
    }
    for spec in overload.outputs {
        let socket = tree.create_socket(node, SocketDirection::Output, spec);
        tree.push_output(node, socket);
    }
}

/// Transitions a node to a new mode: disconnects and removes every socket
/// installed by the old overload, then installs the new overload's socket
/// set. The leading selector socket is preserved in place. Links into the
/// discarded sockets are removed; switching back does not restore them.
pub fn switch_mode(tree: &mut Tree, node: NodeId, mode: &str) -> Result<()> {
    let (group, old_mode, selector, managed): (_, _, _, Vec<_>) = {
        let n = tree.node(node)?;
        (
            n.kind.overload_group(),
            n.mode,
            n.selector(),
            n.data_inputs()
                .iter()
                .chain(n.outputs.iter())
                .copied()
                .collect(),
        )
    };
    let target = group.get(mode)?;
    if target.mode == old_mode {
        return Ok(());
    }

    for socket in managed {
        tree.discard_socket(socket);
    }
    tree.set_node_mode(node, target.mode);
    install(tree, node, target);
    if let Some(selector) = selector {
        tree.set_selector_field(selector, target.mode);
    }
    debug!("node {node}: mode `{old_mode}` -> `{}`", target.mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::NodeKind;
    use crate::types::SocketType;

    fn socket_shape(tree: &Tree, node: NodeId) -> Vec<(SocketDirection, SocketType, &'static str)> {
        let n = tree.node(node).unwrap();
        n.inputs
            .iter()
            .chain(n.outputs.iter())
            .map(|s| {
                let s = tree.socket(*s).unwrap();
                (s.direction, s.effective_type(), s.label)
            })
            .collect()
    }

    #[test]
    fn mode_round_trip_restores_the_socket_shape() {
        let mut tree = Tree::new();
        let node = tree.add_node(NodeKind::SrgbColor);
        let original = socket_shape(&tree, node);
        switch_mode(&mut tree, node, "fromValues").unwrap();
        assert_ne!(socket_shape(&tree, node), original);
        switch_mode(&mut tree, node, "fromVec").unwrap();
        assert_eq!(socket_shape(&tree, node), original);
    }

    #[test]
    fn switching_away_disconnects_managed_sockets() {
        let mut tree = Tree::new();
        let v = tree.add_node(NodeKind::CombineVector);
        let c = tree.add_node(NodeKind::SrgbColor);
        let dst = tree.node(c).unwrap().data_inputs()[0];
        tree.link(tree.node(v).unwrap().outputs[0], dst).unwrap();
        assert_eq!(tree.links().count(), 1);
        switch_mode(&mut tree, c, "fromValues").unwrap();
        assert_eq!(tree.links().count(), 0);
        // Switching back does not restore the lost link.
        switch_mode(&mut tree, c, "fromVec").unwrap();
        assert_eq!(tree.links().count(), 0);
    }

    #[test]
    fn unknown_mode_fails_without_touching_the_node() {
        let mut tree = Tree::new();
        let node = tree.add_node(NodeKind::Arithmetic);
        let before = socket_shape(&tree, node);
        let err = switch_mode(&mut tree, node, "modulo").unwrap_err();
        assert!(format!("{err:#}").contains("modulo"));
        assert_eq!(socket_shape(&tree, node), before);
    }

    #[test]
    fn selector_field_tracks_the_mode() {
        let mut tree = Tree::new();
        let node = tree.add_node(NodeKind::Arithmetic);
        let selector = tree.node(node).unwrap().selector().unwrap();
        tree.set_field(selector, Value::Choice("multiply".into()))
            .unwrap();
        assert_eq!(tree.node(node).unwrap().mode, "multiply");
        assert_eq!(
            tree.socket(selector).unwrap().field,
            Value::Choice("multiply".into())
        );
    }
}
