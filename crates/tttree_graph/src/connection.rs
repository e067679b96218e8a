// SPDX-License-Identifier: MIT OR Apache-2.0
//! Links between an output port and an input port.

use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// One side of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Owning node
    pub node: NodeId,
    /// Port on that node
    pub port: PortId,
}

impl Endpoint {
    /// Endpoint on `node` at `port`
    pub fn new(node: NodeId, port: PortId) -> Self {
        Self { node, port }
    }
}

/// A value path from a producer's output to a consumer's input.
///
/// An input has at most one incoming connection; an output may fan out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Producing output
    pub from: Endpoint,
    /// Consuming input
    pub to: Endpoint,
}

impl Connection {
    /// Link `from` (an output) to `to` (an input)
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self {
            id: ConnectionId::new(),
            from,
            to,
        }
    }

    /// Whether either end sits on `node_id`
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from.node == node_id || self.to.node == node_id
    }

    /// Whether `node_id` consumes through this connection
    pub fn feeds(&self, node_id: NodeId) -> bool {
        self.to.node == node_id
    }
}
