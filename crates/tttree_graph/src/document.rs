// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saved graphs.
//!
//! A document is the graph's nodes, their configuration and connections as
//! pretty-printed JSON. Decoded media is never stored; image and video nodes
//! keep their source and are loaded again after opening.

use crate::connection::ConnectionId;
use crate::graph::Graph;
use crate::media::LoadRequest;
use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Current document format
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

/// Serialized form of a graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Format version
    pub version: u32,
    /// The graph
    pub graph: Graph,
}

impl GraphDocument {
    /// Document for `graph` at the current format version
    pub fn new(graph: Graph) -> Self {
        Self {
            version: DOCUMENT_FORMAT_VERSION,
            graph,
        }
    }

    /// Encode as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode and validate a document
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let document: Self = serde_json::from_str(text)?;
        if document.version != DOCUMENT_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: document.version,
                expected: DOCUMENT_FORMAT_VERSION,
            });
        }
        document.validate()?;
        Ok(document)
    }

    fn validate(&self) -> Result<(), DocumentError> {
        for node in self.graph.nodes() {
            if let Some(rules) = node.kind.dynamic_inputs() {
                if node.inputs.len() < rules.min {
                    return Err(DocumentError::TooFewInputs {
                        node: node.id,
                        min: rules.min,
                    });
                }
            }
        }

        let mut fed = HashSet::new();
        for connection in self.graph.connections() {
            if !fed.insert(connection.to.port) {
                return Err(DocumentError::InputConnectedTwice(connection.to.port));
            }
            let from_ok = self
                .graph
                .node(connection.from.node)
                .and_then(|n| n.output_index(&connection.from.port))
                .is_some();
            let to_ok = self
                .graph
                .node(connection.to.node)
                .is_some_and(|n| n.inputs.iter().any(|p| p.id == connection.to.port));
            if !from_ok || !to_ok {
                return Err(DocumentError::DanglingConnection(connection.id));
            }
        }
        self.graph
            .topological_order()
            .map_err(|_| DocumentError::Cycle)?;
        Ok(())
    }

    /// Read a document from disk
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Write a document to disk
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

/// Replace `graph` with the document in `text`.
///
/// On any error `graph` is left exactly as it was. On success, returns the
/// load requests needed to bring back the document's media.
pub fn load_into(graph: &mut Graph, text: &str) -> Result<Vec<LoadRequest>, DocumentError> {
    let document = GraphDocument::parse(text)?;
    *graph = document.graph;
    graph.mark_dirty();
    tracing::info!(
        "Loaded graph '{}' with {} nodes and {} connections",
        graph.name,
        graph.node_count(),
        graph.connection_count()
    );
    Ok(graph.restore_requests())
}

/// Errors reading or writing documents
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Not valid JSON, or not a graph
    #[error("Invalid graph document: {0}")]
    Json(#[from] serde_json::Error),

    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Saved by an incompatible version
    #[error("Unsupported document version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Version this build reads
        expected: u32,
    },

    /// A connection points at a node or port that does not exist
    #[error("Connection {0:?} refers to a missing node or port")]
    DanglingConnection(ConnectionId),

    /// A node with a variable input list has fewer inputs than its floor
    #[error("Node {node:?} needs at least {min} inputs")]
    TooFewInputs {
        /// Offending node
        node: NodeId,
        /// Smallest allowed input count
        min: usize,
    },

    /// More than one connection feeds the same input
    #[error("Input {0:?} has more than one connection")]
    InputConnectedTwice(PortId),

    /// Connections form a cycle
    #[error("Graph contains a cycle")]
    Cycle,
}
