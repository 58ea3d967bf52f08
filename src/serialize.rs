//! Tree persistence.
//!
//! The document stores nodes in insertion order and links in creation order,
//! with the arena socket ids written out directly. Loading rebuilds the tree
//! through the normal mutation API, remapping saved socket ids onto the
//! freshly allocated ones, so overload installation, selector handling and
//! dynamic type inference all fire exactly as they would interactively.
//! Any inconsistency fails the whole import; no partial tree is returned.

use anyhow::{Context, Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::{NodeId, SocketId, Tree};
use crate::nodes::NodeKind;
use crate::overload;
use crate::types::Value;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub mode: String,
    pub position: [f32; 2],
    pub width: f32,
    pub inputs: Vec<SocketRecord>,
    pub outputs: Vec<SocketId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketRecord {
    pub id: SocketId,
    pub field: Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub from: SocketId,
    pub to: SocketId,
}

/// Snapshot of a tree as a document.
pub fn save_tree(tree: &Tree) -> Result<TreeDocument> {
    let mut nodes = Vec::new();
    for node in tree.nodes() {
        let mut inputs = Vec::with_capacity(node.inputs.len());
        for socket in &node.inputs {
            let s = tree.socket(*socket)?;
            inputs.push(SocketRecord {
                id: s.id,
                field: s.field.clone(),
            });
        }
        nodes.push(NodeRecord {
            id: node.id,
            node_type: node.kind.type_name().to_string(),
            mode: node.mode.to_string(),
            position: node.position,
            width: node.width,
            inputs,
            outputs: node.outputs.clone(),
        });
    }
    let links = tree
        .links()
        .map(|l| LinkRecord {
            from: l.from,
            to: l.to,
        })
        .collect();
    Ok(TreeDocument { nodes, links })
}

/// Rebuilds a tree from a document. Socket and link ids are reallocated;
/// the saved ids only serve to wire the document together.
pub fn load_tree(doc: &TreeDocument) -> Result<Tree> {
    let mut tree = Tree::new();
    let mut socket_map: HashMap<SocketId, SocketId> = HashMap::new();

    for record in &doc.nodes {
        let kind = NodeKind::from_type_name(&record.node_type)
            .with_context(|| format!("node {}", record.id))?;
        let id = tree.add_node(kind);
        overload::switch_mode(&mut tree, id, &record.mode)
            .with_context(|| format!("node {}", record.id))?;
        tree.set_position(id, record.position)?;
        tree.set_width(id, record.width)?;

        let (inputs, outputs) = {
            let node = tree.node(id)?;
            (node.inputs.clone(), node.outputs.clone())
        };
        if inputs.len() != record.inputs.len() || outputs.len() != record.outputs.len() {
            bail!(
                "node {} ({}) stores {}/{} sockets but mode `{}` installs {}/{}",
                record.id,
                record.node_type,
                record.inputs.len(),
                record.outputs.len(),
                record.mode,
                inputs.len(),
                outputs.len()
            );
        }
        for (saved, new_id) in record
            .inputs
            .iter()
            .map(|s| s.id)
            .chain(record.outputs.iter().copied())
            .zip(inputs.iter().chain(outputs.iter()).copied())
        {
            if socket_map.insert(saved, new_id).is_some() {
                bail!("socket id {saved} appears twice in the document");
            }
        }
        for (saved, new_id) in record.inputs.iter().zip(&inputs) {
            // The selector already holds the mode; rewriting it is a no-op
            // transition, so fields can be applied uniformly in order.
            tree.set_field(*new_id, saved.field.clone())
                .with_context(|| format!("socket {} of node {}", saved.id, record.id))?;
        }
    }

    for record in &doc.links {
        let from = *socket_map
            .get(&record.from)
            .ok_or_else(|| anyhow::anyhow!("link source references unknown socket {}", record.from))?;
        let to = *socket_map
            .get(&record.to)
            .ok_or_else(|| anyhow::anyhow!("link destination references unknown socket {}", record.to))?;
        tree.link(from, to)
            .with_context(|| format!("link {} -> {}", record.from, record.to))?;
    }

    debug!(
        "loaded tree: {} node(s), {} link(s)",
        doc.nodes.len(),
        doc.links.len()
    );
    Ok(tree)
}

pub fn to_json(tree: &Tree) -> Result<String> {
    Ok(serde_json::to_string_pretty(&save_tree(tree)?)?)
}

pub fn from_json(json: &str) -> Result<Tree> {
    let doc: TreeDocument = serde_json::from_str(json).context("malformed tree document")?;
    load_tree(&doc)
}
