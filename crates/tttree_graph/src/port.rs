// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ports: the typed sockets on either side of a connection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a port, unique across the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Which side of a node a port sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Consumes a value
    Input,
    /// Produces a value
    Output,
}

/// Nominal tag describing what a port expects to carry.
///
/// Tags are advisory only. The graph never refuses a connection because of
/// them; a mismatching value simply reads as missing on the consuming side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortType {
    /// Text value
    String,
    /// Numeric value
    Number,
    /// Boolean value
    Boolean,
    /// Loaded image reference
    Image,
    /// Loaded video reference
    Video,
    /// Pre-rendered markup
    Markup,
    /// Accepts anything (styled wrappers, scenes, raw values)
    Any,
}

impl PortType {
    /// Whether values of this type are expected to be understood by `other`.
    pub fn is_compatible_with(&self, other: &PortType) -> bool {
        if matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }
        self == other
    }
}

/// A named, typed socket on a node.
///
/// Inputs take at most one connection; outputs fan out to any number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Identity
    pub id: PortId,
    /// Label, e.g. `element 3`
    pub name: String,
    /// Side of the node
    pub direction: PortDirection,
    /// Advisory type tag
    pub port_type: PortType,
}

impl Port {
    fn new(name: impl Into<String>, direction: PortDirection, port_type: PortType) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            direction,
            port_type,
        }
    }

    /// Input port
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name, PortDirection::Input, port_type)
    }

    /// Output port
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(name, PortDirection::Output, port_type)
    }

    /// Same port with a fresh id, for stamping nodes from a template
    pub fn instantiate(&self) -> Self {
        Self {
            id: PortId::new(),
            ..self.clone()
        }
    }

    /// Whether a connection may run from this port into `target`.
    /// Only direction matters; types are never checked here.
    pub fn can_feed(&self, target: &Port) -> bool {
        self.direction == PortDirection::Output && target.direction == PortDirection::Input
    }
}
