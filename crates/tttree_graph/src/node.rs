// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node instances and the catalog of node types they are created from.

use crate::nodes::NodeKind;
use crate::port::{Port, PortId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a node within a graph and its saved documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Palette section a node type is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Value sources (constants, loaded files)
    Input,
    /// Transformations and composition
    Operator,
    /// Nodes that publish results
    Output,
    /// Nodes that take no part in evaluation
    Utility,
}

/// Template every node of one type is stamped from
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Type id, e.g. `tttree/inputs/text`
    pub id: String,
    /// Title shown in the palette and on new nodes
    pub name: String,
    /// Palette section
    pub category: NodeCategory,
    /// One-line help text
    pub description: String,
    /// Input layout of a fresh node
    pub inputs: Vec<Port>,
    /// Output layout of a fresh node
    pub outputs: Vec<Port>,
    /// Configuration of a fresh node
    pub kind: NodeKind,
}

/// A node placed in a graph.
///
/// Port lists belong to the instance: a composer that grew a third input
/// keeps it through save and load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Identity
    pub id: NodeId,
    /// Type id it was created from
    pub node_type: String,
    /// Title, editable
    pub name: String,
    /// Canvas position, kept for the editor
    #[serde(default)]
    pub position: [f32; 2],
    /// Inputs, in index order
    pub inputs: Vec<Port>,
    /// Outputs, in index order
    pub outputs: Vec<Port>,
    /// Configuration and runtime state
    pub kind: NodeKind,
}

impl Node {
    /// Stamp a node from `template`, giving every port a fresh id
    pub fn new(template: &NodeType) -> Self {
        Self {
            id: NodeId::new(),
            node_type: template.id.clone(),
            name: template.name.clone(),
            position: [0.0; 2],
            inputs: template.inputs.iter().map(Port::instantiate).collect(),
            outputs: template.outputs.iter().map(Port::instantiate).collect(),
            kind: template.kind.clone(),
        }
    }

    /// Place the node on the canvas
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Replace the default configuration
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Input at `index`
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Output at `index`
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Index of the output with id `port_id`
    pub fn output_index(&self, port_id: &PortId) -> Option<usize> {
        self.outputs.iter().position(|p| p.id == *port_id)
    }

    /// Index of the input with id `port_id`
    pub fn input_index(&self, port_id: &PortId) -> Option<usize> {
        self.inputs.iter().position(|p| p.id == *port_id)
    }

    /// Input or output with id `port_id`
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .find(|p| p.id == *port_id)
    }
}

/// Catalog of node types, in registration order
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node_type`, replacing any type registered under the same id
    pub fn register(&mut self, node_type: NodeType) {
        if self.types.contains_key(&node_type.id) {
            tracing::debug!("Replacing node type {}", node_type.id);
        }
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Type registered under `id`
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Every type, in registration order
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Types listed under `category`
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// New node of type `type_id` with its default configuration
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }
}
