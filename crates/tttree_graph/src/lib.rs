// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph framework for TTTree presentations.
//!
//! A graph of input, operator and output nodes is evaluated once per tick.
//! Values flow along connections; presentation outputs normalize whatever
//! reaches them and broadcast it to any number of display surfaces.
//!
//! ## Architecture
//!
//! - [`payload`]: the values that travel along connections
//! - [`graph`] and [`nodes`]: structure, node kinds, dynamic ports
//! - [`evaluation`]: ticks in topological order
//! - [`normalize`] and [`protocol`]: the render descriptor wire format
//! - [`presentation`]: named broadcast channels
//! - [`media`]: background file loading
//! - [`document`]: saving and opening graphs

pub mod connection;
pub mod document;
pub mod evaluation;
pub mod graph;
pub mod markup;
pub mod media;
pub mod node;
pub mod nodes;
pub mod normalize;
pub mod payload;
pub mod port;
pub mod presentation;
pub mod protocol;

pub use connection::{Connection, ConnectionId, Endpoint};
pub use document::{load_into, DocumentError, GraphDocument};
pub use evaluation::{EvaluationError, Evaluator, NodeEvaluator, TickReport};
pub use graph::{Graph, GraphError};
pub use media::{LoadOutcome, LoadRequest, MediaError, MediaLoader};
pub use node::{Node, NodeId, NodeRegistry, NodeType};
pub use nodes::{create_registry, NodeKind};
pub use normalize::normalize;
pub use payload::{Scene, Style, StyledWrapper, Value};
pub use port::{Port, PortDirection, PortId, PortType};
pub use presentation::{PresentationHub, Subscription, PRESENTATION_CHANNEL};
pub use protocol::{ProtocolMessage, RenderDescriptor};
