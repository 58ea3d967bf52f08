//! The graph data model: trees, nodes, sockets and links.
//!
//! All storage is arena-style, keyed by stable ids. Links are plain id pairs;
//! sockets never hold references to other sockets, so ownership stays flat
//! and the ids double as the serialization format. Every structural mutation
//! goes through [`Tree`] methods so type inference and overload transitions
//! fire consistently; nothing else may splice socket lists or link endpoints.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{Result, anyhow, bail};
use log::debug;

use crate::nodes::NodeKind;
use crate::overload::{self, SocketSpec};
use crate::types::{SocketType, Value};

pub type NodeId = u32;
pub type SocketId = u32;
pub type LinkId = u32;

pub const DEFAULT_NODE_WIDTH: f32 = 140.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketDirection {
    Input,
    Output,
}

/// Behavioral flags on a socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketFlags {
    /// Effective type is inferred from links instead of declared.
    pub dynamic: bool,
    /// Only the literal field is accepted; linking into this socket fails.
    pub constant_only: bool,
    /// Float field wraps into [0, 1) when read (hue-valued).
    pub hue: bool,
}

impl SocketFlags {
    pub const NONE: SocketFlags = SocketFlags {
        dynamic: false,
        constant_only: false,
        hue: false,
    };
}

/// A typed input or output port on a node.
#[derive(Clone, Debug)]
pub struct Socket {
    pub id: SocketId,
    pub node: NodeId,
    pub direction: SocketDirection,
    pub label: &'static str,
    pub declared: SocketType,
    pub flags: SocketFlags,
    /// Literal value used when the socket is unlinked.
    pub field: Value,
    /// Inference result for dynamic sockets; kept current by the tree.
    resolved: SocketType,
}

impl Socket {
    /// Declared type for static sockets, inferred type for dynamic ones.
    pub fn effective_type(&self) -> SocketType {
        if self.flags.dynamic {
            self.resolved
        } else {
            self.declared
        }
    }
}

/// A computation unit with ordered input and output sockets.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub mode: &'static str,
    pub position: [f32; 2],
    pub width: f32,
    pub inputs: Vec<SocketId>,
    pub outputs: Vec<SocketId>,
}

impl Node {
    /// Multi-mode nodes carry a leading dropdown selector input socket that
    /// overload transitions never touch.
    pub fn has_selector(&self) -> bool {
        self.kind.overload_group().overloads.len() > 1
    }

    pub fn selector(&self) -> Option<SocketId> {
        if self.has_selector() {
            self.inputs.first().copied()
        } else {
            None
        }
    }

    /// Input sockets managed by the active overload (selector excluded).
    pub fn data_inputs(&self) -> &[SocketId] {
        if self.has_selector() {
            &self.inputs[1..]
        } else {
            &self.inputs
        }
    }
}

/// A directed edge from an output socket to an input socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub from: SocketId,
    pub to: SocketId,
    pub from_node: NodeId,
    pub to_node: NodeId,
}

/// Result of a cycle search: links that close a loop back into the active
/// traversal path, plus every link the traversal touched. The same link can
/// be part of several loops; both lists are deduplicated by link id.
#[derive(Clone, Debug, Default)]
pub struct CycleReport {
    pub duplicates: Vec<LinkId>,
    pub visited: Vec<LinkId>,
}

impl CycleReport {
    pub fn is_acyclic(&self) -> bool {
        self.duplicates.is_empty()
    }
}

/// Owner of all nodes, sockets and links.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: HashMap<NodeId, Node>,
    sockets: HashMap<SocketId, Socket>,
    links: HashMap<LinkId, Link>,
    node_order: Vec<NodeId>,
    link_order: Vec<LinkId>,
    next_node: NodeId,
    next_socket: SocketId,
    next_link: LinkId,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| anyhow!("unknown node {id}"))
    }

    pub fn socket(&self, id: SocketId) -> Result<&Socket> {
        self.sockets
            .get(&id)
            .ok_or_else(|| anyhow!("unknown socket {id}"))
    }

    pub fn link_by_id(&self, id: LinkId) -> Result<&Link> {
        self.links.get(&id).ok_or_else(|| anyhow!("unknown link {id}"))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Links in creation order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.link_order.iter().filter_map(|id| self.links.get(id))
    }

    /// The single incoming link of an input socket, if any.
    pub fn incoming_link(&self, socket: SocketId) -> Option<Link> {
        self.links().find(|l| l.to == socket).copied()
    }

    pub fn outgoing_links(&self, socket: SocketId) -> Vec<Link> {
        self.links().filter(|l| l.from == socket).copied().collect()
    }

    pub fn effective_type(&self, socket: SocketId) -> Result<SocketType> {
        Ok(self.socket(socket)?.effective_type())
    }

    /// Adds a node of the given kind with its default overload's sockets
    /// installed, and a leading mode selector when the kind has several.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let group = kind.overload_group();
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                kind,
                mode: group.default_mode,
                position: [0.0, 0.0],
                width: DEFAULT_NODE_WIDTH,
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
        );
        self.node_order.push(id);

        if group.overloads.len() > 1 {
            let selector = self.alloc_socket(Socket {
                id: 0,
                node: id,
                direction: SocketDirection::Input,
                label: "mode",
                declared: SocketType::Dropdown,
                flags: SocketFlags {
                    constant_only: true,
                    ..SocketFlags::NONE
                },
                field: Value::Choice(group.default_mode.to_string()),
                resolved: SocketType::Dropdown,
            });
            self.nodes.get_mut(&id).unwrap().inputs.push(selector);
        }

        let default = group
            .get(group.default_mode)
            .expect("overload group missing its default mode");
        overload::install(self, id, default);
        debug!("add node {id} ({})", kind.type_name());
        id
    }

    /// Removes a node, cascading to every link touching its sockets.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        let sockets: Vec<SocketId> = {
            let n = self.node(node)?;
            n.inputs.iter().chain(n.outputs.iter()).copied().collect()
        };
        for socket in sockets {
            self.discard_socket(socket);
        }
        self.nodes.remove(&node);
        self.node_order.retain(|n| *n != node);
        debug!("remove node {node}");
        Ok(())
    }

    /// Connects an output socket to an input socket. An occupied input is
    /// relinked (the previous link is removed first). Fires dynamic type
    /// inference on both endpoints.
    pub fn link(&mut self, from: SocketId, to: SocketId) -> Result<LinkId> {
        let (from_node, from_label) = {
            let s = self.socket(from)?;
            if s.direction != SocketDirection::Output {
                bail!("link source must be an output socket (socket {from})");
            }
            (s.node, s.label)
        };
        let (to_node, to_label) = {
            let s = self.socket(to)?;
            if s.direction != SocketDirection::Input {
                bail!("link destination must be an input socket (socket {to})");
            }
            if s.flags.constant_only {
                bail!(
                    "socket `{}` of node {} only accepts a constant field value",
                    s.label,
                    s.node
                );
            }
            (s.node, s.label)
        };

        if let Some(existing) = self.incoming_link(to) {
            self.unlink(existing.id)?;
        }

        let id = self.next_link;
        self.next_link += 1;
        self.links.insert(
            id,
            Link {
                id,
                from,
                to,
                from_node,
                to_node,
            },
        );
        self.link_order.push(id);
        debug!("link {id}: node {from_node} `{from_label}` -> node {to_node} `{to_label}`");
        self.refresh_dynamic_types(&[from, to]);
        Ok(id)
    }

    pub fn unlink(&mut self, link: LinkId) -> Result<()> {
        let l = self
            .links
            .remove(&link)
            .ok_or_else(|| anyhow!("unknown link {link}"))?;
        self.link_order.retain(|x| *x != link);
        debug!("unlink {link}");
        self.refresh_dynamic_types(&[l.from, l.to]);
        Ok(())
    }

    /// Sets an input socket's literal field. Writing the mode selector of a
    /// multi-mode node performs the overload transition; an unknown mode
    /// fails fast without touching the node.
    pub fn set_field(&mut self, socket: SocketId, value: Value) -> Result<()> {
        let (node_id, declared, dynamic, direction) = {
            let s = self.socket(socket)?;
            (s.node, s.declared, s.flags.dynamic, s.direction)
        };
        if direction != SocketDirection::Input {
            bail!("cannot set a field on output socket {socket}");
        }

        let is_selector = self.node(node_id)?.selector() == Some(socket);
        if is_selector {
            let mode = value.as_choice()?.to_string();
            return overload::switch_mode(self, node_id, &mode);
        }

        let stored = if dynamic { value } else { value.coerce(declared)? };
        self.sockets.get_mut(&socket).unwrap().field = stored;
        Ok(())
    }

    pub fn set_position(&mut self, node: NodeId, position: [f32; 2]) -> Result<()> {
        self.nodes
            .get_mut(&node)
            .ok_or_else(|| anyhow!("unknown node {node}"))?
            .position = position;
        Ok(())
    }

    pub fn set_width(&mut self, node: NodeId, width: f32) -> Result<()> {
        self.nodes
            .get_mut(&node)
            .ok_or_else(|| anyhow!("unknown node {node}"))?
            .width = width;
        Ok(())
    }

    /// Depth-first search outward along outgoing links from `start`,
    /// reporting every link that closes a loop back into the active path.
    pub fn find_cyclical_links(&self, start: NodeId) -> CycleReport {
        let mut report = CycleReport::default();
        let mut dup_seen = HashSet::new();
        let mut visit_seen = HashSet::new();
        let mut path: Vec<(NodeId, LinkId)> = Vec::new();
        self.walk_cycles(
            start,
            start,
            &mut path,
            &mut report,
            &mut dup_seen,
            &mut visit_seen,
        );
        report
    }

    fn walk_cycles(
        &self,
        start: NodeId,
        current: NodeId,
        path: &mut Vec<(NodeId, LinkId)>,
        report: &mut CycleReport,
        dup_seen: &mut HashSet<LinkId>,
        visit_seen: &mut HashSet<LinkId>,
    ) {
        let Some(node) = self.nodes.get(&current) else {
            return;
        };
        for out_socket in &node.outputs {
            for link in self.outgoing_links(*out_socket) {
                if visit_seen.insert(link.id) {
                    report.visited.push(link.id);
                }
                let dst = link.to_node;
                let loop_start = if dst == start {
                    Some(0)
                } else {
                    path.iter().position(|(n, _)| *n == dst).map(|p| p + 1)
                };
                if let Some(pos) = loop_start {
                    // Closed a loop: the links travelled since `dst` plus the
                    // closing link are duplicates.
                    for (_, l) in &path[pos..] {
                        if dup_seen.insert(*l) {
                            report.duplicates.push(*l);
                        }
                    }
                    if dup_seen.insert(link.id) {
                        report.duplicates.push(link.id);
                    }
                    continue;
                }
                path.push((dst, link.id));
                self.walk_cycles(start, dst, path, report, dup_seen, visit_seen);
                path.pop();
            }
        }
    }

    /// Every node feeding `start` through input links, `start` included.
    pub fn upstream_nodes(&self, start: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            if !visited.insert(n) {
                continue;
            }
            order.push(n);
            if let Some(node) = self.nodes.get(&n) {
                for socket in &node.inputs {
                    if let Some(link) = self.incoming_link(*socket) {
                        stack.push(link.from_node);
                    }
                }
            }
        }
        order
    }

    /// Errors if any cyclical link is reachable from `start`'s dependency
    /// subgraph. Evaluation and transpilation call this before recursing.
    pub fn reject_cycles(&self, start: NodeId) -> Result<()> {
        for n in self.upstream_nodes(start) {
            let report = self.find_cyclical_links(n);
            if !report.is_acyclic() {
                bail!(
                    "cyclical links reachable from node {start}: {:?}",
                    report.duplicates
                );
            }
        }
        Ok(())
    }

    // ---- mutation internals shared with the overload manager ----

    fn alloc_socket(&mut self, mut socket: Socket) -> SocketId {
        let id = self.next_socket;
        self.next_socket += 1;
        socket.id = id;
        self.sockets.insert(id, socket);
        id
    }

    pub(crate) fn create_socket(
        &mut self,
        node: NodeId,
        direction: SocketDirection,
        spec: &SocketSpec,
    ) -> SocketId {
        let resolved = if spec.flags.dynamic {
            SocketType::DynamicAny
        } else {
            spec.ty
        };
        self.alloc_socket(Socket {
            id: 0,
            node,
            direction,
            label: spec.label,
            declared: spec.ty,
            flags: spec.flags,
            field: spec.default.to_value(),
            resolved,
        })
    }

    pub(crate) fn push_input(&mut self, node: NodeId, socket: SocketId) {
        self.nodes.get_mut(&node).unwrap().inputs.push(socket);
    }

    pub(crate) fn push_output(&mut self, node: NodeId, socket: SocketId) {
        self.nodes.get_mut(&node).unwrap().outputs.push(socket);
    }

    pub(crate) fn set_node_mode(&mut self, node: NodeId, mode: &'static str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.mode = mode;
        }
    }

    pub(crate) fn set_selector_field(&mut self, socket: SocketId, mode: &str) {
        if let Some(s) = self.sockets.get_mut(&socket) {
            s.field = Value::Choice(mode.to_string());
        }
    }

    /// Unlinks and removes a socket, dropping it from its node's lists.
    pub(crate) fn discard_socket(&mut self, socket: SocketId) {
        let touching: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.from == socket || l.to == socket)
            .map(|l| l.id)
            .collect();
        for link in touching {
            let _ = self.unlink(link);
        }
        if let Some(s) = self.sockets.remove(&socket) {
            if let Some(n) = self.nodes.get_mut(&s.node) {
                n.inputs.retain(|x| *x != socket);
                n.outputs.retain(|x| *x != socket);
            }
        }
    }

    // ---- dynamic type inference ----

    /// Recomputes dynamic socket types after a structural change. The
    /// connected component of dynamic sockets around `seeds` is reset to
    /// `DynamicAny` before propagation, so a concrete type can only enter
    /// from a statically typed socket; recomputing from stale resolutions
    /// would let two mutually-linked dynamic sockets keep confirming a type
    /// whose source link is gone. From the reset state resolutions only
    /// grow more restrictive, so the worklist reaches a fixed point.
    pub(crate) fn refresh_dynamic_types(&mut self, seeds: &[SocketId]) {
        let mut component: Vec<SocketId> = Vec::new();
        let mut seen: HashSet<SocketId> = HashSet::new();
        let mut stack: Vec<SocketId> = seeds.to_vec();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(socket) = self.sockets.get(&id) else {
                continue;
            };
            if !socket.flags.dynamic {
                continue;
            }
            component.push(id);
            for link in self.links.values() {
                if link.from == id {
                    stack.push(link.to);
                } else if link.to == id {
                    stack.push(link.from);
                }
            }
        }
        for id in &component {
            self.sockets.get_mut(id).unwrap().resolved = SocketType::DynamicAny;
        }

        let mut queue: VecDeque<SocketId> = component.into();
        while let Some(id) = queue.pop_front() {
            let Some(socket) = self.sockets.get(&id) else {
                continue;
            };
            if !socket.flags.dynamic {
                continue;
            }
            let inferred = self.infer_socket_type(id);
            let socket = self.sockets.get_mut(&id).unwrap();
            if socket.resolved != inferred {
                log::trace!(
                    "socket {id} resolved {:?} -> {:?}",
                    socket.resolved,
                    inferred
                );
                socket.resolved = inferred;
                for link in self.links.values() {
                    if link.from == id {
                        queue.push_back(link.to);
                    } else if link.to == id {
                        queue.push_back(link.from);
                    }
                }
            }
        }
    }

    /// Most restrictive effective type among all sockets linked to this one;
    /// `DynamicAny` when unlinked. Always considers every link of the socket,
    /// never just the first.
    fn infer_socket_type(&self, id: SocketId) -> SocketType {
        let Some(socket) = self.sockets.get(&id) else {
            return SocketType::DynamicAny;
        };
        let linked: Vec<SocketId> = match socket.direction {
            SocketDirection::Input => {
                self.incoming_link(id).map(|l| l.from).into_iter().collect()
            }
            SocketDirection::Output => {
                self.outgoing_links(id).iter().map(|l| l.to).collect()
            }
        };
        let mut ty = SocketType::DynamicAny;
        for other in linked {
            if let Some(s) = self.sockets.get(&other) {
                ty = SocketType::most_restrictive(ty, s.effective_type());
            }
        }
        ty
    }
}
