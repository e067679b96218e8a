// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph is also the host the nodes live in: it owns their configuration,
//! grows and shrinks dynamic port lists, and installs finished media loads.

use crate::connection::{Connection, ConnectionId, Endpoint};
use crate::media::{LoadOutcome, LoadRequest, MediaError};
use crate::node::{Node, NodeId};
use crate::port::{Port, PortDirection, PortId, PortType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    /// Set whenever something changed that needs a redraw and a new tick
    #[serde(skip)]
    dirty: bool,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            dirty: false,
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        self.dirty = true;
        id
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.connections.retain(|_, c| !c.involves_node(node_id));
        self.dirty = true;
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.dirty = true;
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect an output port to an input port.
    ///
    /// Port types are advisory: a mismatch is logged, never refused. An input
    /// takes a single connection, so an existing one is replaced.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<ConnectionId, GraphError> {
        let source_node = self
            .nodes
            .get(&from_node)
            .ok_or(GraphError::NodeNotFound(from_node))?;
        let target_node = self
            .nodes
            .get(&to_node)
            .ok_or(GraphError::NodeNotFound(to_node))?;

        let source_port = source_node
            .port(&from_port)
            .ok_or(GraphError::PortNotFound(from_port))?;
        let target_port = target_node
            .port(&to_port)
            .ok_or(GraphError::PortNotFound(to_port))?;

        if !source_port.can_feed(target_port) {
            return Err(GraphError::IncompatiblePorts);
        }

        if from_node == to_node {
            return Err(GraphError::SelfLoop);
        }

        // A node may not consume its own downstream output
        if self.reaches(to_node, from_node) {
            return Err(GraphError::WouldCycle);
        }

        if !source_port.port_type.is_compatible_with(&target_port.port_type) {
            tracing::debug!(
                "Connecting {:?} output to {:?} input; mismatching values will read as missing",
                source_port.port_type,
                target_port.port_type
            );
        }

        let replaced: Vec<ConnectionId> = self
            .connections_to(to_port)
            .map(|c| c.id)
            .collect();
        for id in replaced {
            self.connections.shift_remove(&id);
        }

        let connection = Connection::new(
            Endpoint::new(from_node, from_port),
            Endpoint::new(to_node, to_port),
        );
        let id = connection.id;
        self.connections.insert(id, connection);
        self.dirty = true;
        Ok(id)
    }

    /// Connect by port index: output `output` of `from_node` to input `input` of `to_node`
    pub fn connect_indices(
        &mut self,
        from_node: NodeId,
        output: usize,
        to_node: NodeId,
        input: usize,
    ) -> Result<ConnectionId, GraphError> {
        let from_port = self.port_at(from_node, PortDirection::Output, output)?;
        let to_port = self.port_at(to_node, PortDirection::Input, input)?;
        self.connect(from_node, from_port, to_node, to_port)
    }

    fn port_at(
        &self,
        node_id: NodeId,
        direction: PortDirection,
        index: usize,
    ) -> Result<PortId, GraphError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let port = match direction {
            PortDirection::Input => node.input(index),
            PortDirection::Output => node.output(index),
        };
        port.map(|p| p.id)
            .ok_or(GraphError::PortIndexOutOfRange { node: node_id, index })
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.dirty = true;
        self.connections.shift_remove(&connection_id)
    }

    /// Remove whatever feeds input `index` of `node_id`
    pub fn disconnect_input(&mut self, node_id: NodeId, index: usize) -> Option<Connection> {
        let port = self.port_at(node_id, PortDirection::Input, index).ok()?;
        let id = self.connections_to(port).next()?.id;
        self.disconnect(id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections to a specific port
    pub fn connections_to(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.to.port == port_id)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Append one input port to a node with a variable input list
    pub fn add_input_port(&mut self, node_id: NodeId) -> Result<PortId, GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let rules = node
            .kind
            .dynamic_inputs()
            .ok_or(GraphError::FixedPorts(node_id))?;

        let port = Port::input(
            format!("{} {}", rules.prefix, node.inputs.len() + 1),
            PortType::Any,
        );
        let id = port.id;
        node.inputs.push(port);
        self.dirty = true;
        Ok(id)
    }

    /// Remove the highest-indexed input port, and its connection, from a node
    /// with a variable input list. Refused at the node's minimum.
    pub fn remove_input_port(&mut self, node_id: NodeId) -> Result<Port, GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let rules = node
            .kind
            .dynamic_inputs()
            .ok_or(GraphError::FixedPorts(node_id))?;

        if node.inputs.len() <= rules.min {
            return Err(GraphError::MinimumPorts {
                node: node_id,
                min: rules.min,
            });
        }
        let port = node
            .inputs
            .pop()
            .ok_or(GraphError::MinimumPorts { node: node_id, min: rules.min })?;
        self.connections.retain(|_, c| c.to.port != port.id);
        self.dirty = true;
        Ok(port)
    }

    /// Start loading `source` into a file-backed node.
    ///
    /// The node keeps emitting its current value until the returned request
    /// completes and is handed back through [`Self::apply_load`].
    pub fn begin_load(
        &mut self,
        node_id: NodeId,
        source: impl Into<String>,
    ) -> Result<LoadRequest, GraphError> {
        let source = source.into();
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let kind = node
            .kind
            .load_kind()
            .ok_or(GraphError::NotLoadable(node_id))?;
        node.kind.begin_load(&source);
        Ok(LoadRequest {
            node: node_id,
            kind,
            source,
        })
    }

    /// Install a finished load.
    ///
    /// Returns `Ok(false)` for completions that were superseded by a newer
    /// request or whose node is gone. A failed load leaves the node as it was.
    pub fn apply_load(&mut self, outcome: LoadOutcome) -> Result<bool, GraphError> {
        let Some(node) = self.nodes.get_mut(&outcome.node) else {
            return Ok(false);
        };
        let applied = node
            .kind
            .finish_load(&outcome.source, outcome.result)
            .map_err(|error| GraphError::LoadFailed {
                node: outcome.node,
                error,
            })?;
        if applied {
            self.dirty = true;
        }
        Ok(applied)
    }

    /// Load requests that bring back every media resource referenced by
    /// persisted configuration. Used after restoring a document.
    pub fn restore_requests(&mut self) -> Vec<LoadRequest> {
        let sources: Vec<(NodeId, String)> = self
            .nodes
            .values()
            .filter_map(|n| n.kind.restorable_source().map(|s| (n.id, s.to_string())))
            .collect();
        sources
            .into_iter()
            .filter_map(|(id, source)| self.begin_load(id, source).ok())
            .collect()
    }

    /// Flag the graph for redraw and re-evaluation
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether anything changed since the last [`Self::take_dirty`]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and clear the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Whether `target` is downstream of (or equal to) `start`
    pub fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = HashSet::new();
        while let Some(node_id) = stack.pop() {
            if node_id == target {
                return true;
            }
            if !seen.insert(node_id) {
                continue;
            }
            stack.extend(
                self.connections
                    .values()
                    .filter(|c| c.from.node == node_id)
                    .map(|c| c.to.node),
            );
        }
        false
    }

    /// Get nodes in evaluation order: every producer before its consumers
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            return Err(CycleError);
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit all nodes that this node depends on
        for connection in self.connections_for_node(node_id) {
            if connection.feeds(node_id) {
                self.visit(connection.from.node, visited, temp_mark, order)?;
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Errors from graph host operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// No port at that index
    #[error("Node {node:?} has no port at index {index}")]
    PortIndexOutOfRange {
        /// Node that was addressed
        node: NodeId,
        /// Requested index
        index: usize,
    },

    /// Connection must run from an output to an input
    #[error("Connections must run from an output to an input")]
    IncompatiblePorts,

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Connection would make a node consume its own output
    #[error("Connection would create a cycle")]
    WouldCycle,

    /// Node has a fixed set of ports
    #[error("Node {0:?} has a fixed set of ports")]
    FixedPorts(NodeId),

    /// Dynamic port list already at its floor
    #[error("Node {node:?} needs at least {min} inputs")]
    MinimumPorts {
        /// Node that was addressed
        node: NodeId,
        /// Minimum input count
        min: usize,
    },

    /// Node does not load files
    #[error("Node {0:?} does not load files")]
    NotLoadable(NodeId),

    /// A load finished with an error; the node kept its previous value
    #[error("Loading into node {node:?} failed: {error}")]
    LoadFailed {
        /// Node that requested the load
        node: NodeId,
        /// What went wrong
        #[source]
        error: MediaError,
    },
}

/// Error when graph contains a cycle
#[derive(Debug, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;
