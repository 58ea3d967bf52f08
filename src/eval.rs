//! Pull-based CPU evaluation of the graph.
//!
//! Evaluation is synchronous and recursive: asking an output socket for its
//! value invokes the owning node's active overload, which in turn evaluates
//! whichever inputs it needs. There is no memoization; the result is a pure
//! function of the current graph state and the context.

use anyhow::{Result, anyhow, bail};

use crate::graph::{Node, SocketDirection, SocketId, Tree};
use crate::overload;
use crate::types::Value;

/// Call-scoped parameters for one evaluation pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvalContext {
    /// Sampling coordinates, for nodes that read the position being shaded.
    pub coords: [f32; 2],
}

/// Evaluates a socket. Rejects targets whose dependency subgraph contains
/// cyclical links before any recursion starts; silently evaluating into a
/// cycle must never happen.
pub fn evaluate(tree: &Tree, socket: SocketId, ctx: &EvalContext) -> Result<Value> {
    let owner = tree.socket(socket)?.node;
    tree.reject_cycles(owner)?;
    eval_socket(tree, socket, ctx)
}

pub(crate) fn eval_socket(tree: &Tree, socket: SocketId, ctx: &EvalContext) -> Result<Value> {
    let sock = tree.socket(socket)?;
    match sock.direction {
        SocketDirection::Output => {
            let node = tree.node(sock.node)?;
            let index = node
                .outputs
                .iter()
                .position(|s| *s == socket)
                .ok_or_else(|| anyhow!("socket {socket} is not listed on node {}", node.id))?;
            let overload = overload::active_overload(node)?;
            (overload.evaluate)(tree, node, index, ctx)
        }
        SocketDirection::Input => input_value_of_socket(tree, socket, ctx),
    }
}

/// Value of a node's data input by index: the linked source's value if a
/// link exists, otherwise the socket's literal field. Either way the result
/// is coerced to the socket's effective type.
pub(crate) fn input_value(
    tree: &Tree,
    node: &Node,
    index: usize,
    ctx: &EvalContext,
) -> Result<Value> {
    let socket = *node.data_inputs().get(index).ok_or_else(|| {
        anyhow!(
            "node {} ({}) has no data input {index}",
            node.id,
            node.kind.type_name()
        )
    })?;
    input_value_of_socket(tree, socket, ctx)
}

fn input_value_of_socket(tree: &Tree, socket: SocketId, ctx: &EvalContext) -> Result<Value> {
    let sock = tree.socket(socket)?;
    if sock.direction != SocketDirection::Input {
        bail!("socket {socket} is not an input");
    }
    let ty = sock.effective_type();
    match tree.incoming_link(socket) {
        Some(link) => eval_socket(tree, link.from, ctx)?.coerce(ty),
        None => {
            let mut value = sock.field.coerce(ty)?;
            if sock.flags.hue {
                if let Value::Float(h) = value {
                    value = Value::Float(h - h.floor());
                }
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use crate::nodes::NodeKind;

    fn out(tree: &Tree, node: NodeId) -> SocketId {
        tree.node(node).unwrap().outputs[0]
    }

    fn input(tree: &Tree, node: NodeId, i: usize) -> SocketId {
        tree.node(node).unwrap().data_inputs()[i]
    }

    #[test]
    fn unlinked_input_uses_its_field() {
        let mut tree = Tree::new();
        let v = tree.add_node(NodeKind::VectorLiteral);
        tree.set_field(input(&tree, v, 0), Value::Float(0.25)).unwrap();
        let got = evaluate(&tree, out(&tree, v), &EvalContext::default()).unwrap();
        assert_eq!(got, Value::Vector([0.25, 0.0, 0.0]));
    }

    #[test]
    fn hue_fields_wrap_into_the_unit_interval() {
        let mut tree = Tree::new();
        let c = tree.add_node(NodeKind::HslColor);
        tree.set_field(input(&tree, c, 0), Value::Choice("fromValues".into()))
            .unwrap_err();
        // Selector is input 0 of the full list, not of data_inputs; switch
        // through the node's selector socket instead.
        let selector = tree.node(c).unwrap().selector().unwrap();
        tree.set_field(selector, Value::Choice("fromValues".into()))
            .unwrap();
        tree.set_field(input(&tree, c, 0), Value::Float(1.25)).unwrap();
        tree.set_field(input(&tree, c, 1), Value::Float(1.0)).unwrap();
        tree.set_field(input(&tree, c, 2), Value::Float(0.5)).unwrap();
        let wrapped = evaluate(&tree, out(&tree, c), &EvalContext::default()).unwrap();

        tree.set_field(input(&tree, c, 0), Value::Float(0.25)).unwrap();
        let plain = evaluate(&tree, out(&tree, c), &EvalContext::default()).unwrap();
        assert_eq!(wrapped, plain);
    }

    #[test]
    fn evaluating_into_a_cycle_is_refused() {
        let mut tree = Tree::new();
        let a = tree.add_node(NodeKind::Arithmetic);
        let b = tree.add_node(NodeKind::Arithmetic);
        tree.link(out(&tree, a), input(&tree, b, 0)).unwrap();
        tree.link(out(&tree, b), input(&tree, a, 0)).unwrap();
        let err = evaluate(&tree, out(&tree, b), &EvalContext::default()).unwrap_err();
        assert!(format!("{err:#}").contains("cyclical"));
    }

    #[test]
    fn sample_position_reads_the_context() {
        let mut tree = Tree::new();
        let p = tree.add_node(NodeKind::SamplePosition);
        let ctx = EvalContext { coords: [0.3, 0.7] };
        let got = evaluate(&tree, out(&tree, p), &ctx).unwrap();
        assert_eq!(got, Value::Vector([0.3, 0.7, 0.0]));
    }
}
