// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation.
//!
//! A tick walks the graph in topological order. Each node reads its inputs
//! from the output slots of whatever feeds it and writes its own slots.
//! Slots survive between ticks: a node that skips a tick leaves its last
//! values in place.

use crate::graph::Graph;
use crate::markup::{CommonMarkConverter, MarkupConverter};
use crate::node::{Node, NodeId};
use crate::payload::Value;
use crate::presentation::PresentationHub;
use std::collections::HashMap;
use std::sync::Arc;

/// Values present on a node's input ports for one tick, by port index
#[derive(Debug, Clone, Default)]
pub struct NodeInputs {
    values: Vec<Option<Arc<Value>>>,
}

impl NodeInputs {
    /// Inputs from explicit per-port values
    pub fn new(values: Vec<Option<Arc<Value>>>) -> Self {
        Self { values }
    }

    /// Raw value on input `index`
    pub fn get(&self, index: usize) -> Option<&Arc<Value>> {
        self.values.get(index)?.as_ref()
    }

    /// Numeric read; anything but a number is missing
    pub fn number(&self, index: usize) -> Option<f64> {
        self.get(index)?.as_number()
    }

    /// String read; numbers and booleans are stringified
    pub fn text(&self, index: usize) -> Option<String> {
        self.get(index)?.to_text()
    }

    /// Every input slot in port order
    pub fn iter(&self) -> impl Iterator<Item = Option<&Arc<Value>>> {
        self.values.iter().map(Option::as_ref)
    }

    /// Number of input ports
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the node has no input ports
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Output slots of a node, by port index
#[derive(Debug, Clone, Default)]
pub struct NodeOutput {
    values: Vec<Option<Arc<Value>>>,
}

impl NodeOutput {
    /// Create a new empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output `index`
    pub fn set<V: Into<Value>>(&mut self, index: usize, value: V) {
        self.set_opt(index, Some(value.into()));
    }

    /// Set or clear output `index`
    pub fn set_opt(&mut self, index: usize, value: Option<Value>) {
        if self.values.len() <= index {
            self.values.resize(index + 1, None);
        }
        self.values[index] = value.map(Arc::new);
    }

    /// Get output `index`
    pub fn get(&self, index: usize) -> Option<&Arc<Value>> {
        self.values.get(index)?.as_ref()
    }
}

/// Services available to a node while it evaluates
pub struct TickContext<'a> {
    /// Markdown renderer
    pub markup: &'a dyn MarkupConverter,
    /// Presentation channels
    pub presentation: &'a PresentationHub,
    /// Node being evaluated
    pub node_id: NodeId,
}

/// Trait for evaluating nodes
pub trait NodeEvaluator {
    /// Read `inputs` and write `output`. Leaving `output` untouched skips the tick.
    fn evaluate(&self, inputs: &NodeInputs, output: &mut NodeOutput, ctx: &mut TickContext<'_>);
}

/// Summary of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1
    pub tick: u64,
    /// Nodes evaluated
    pub evaluated: usize,
}

/// Runs ticks over a graph and keeps every node's output slots between them.
pub struct Evaluator {
    outputs: HashMap<NodeId, NodeOutput>,
    hub: PresentationHub,
    markup: Arc<dyn MarkupConverter>,
    ticks: u64,
}

impl Evaluator {
    /// Evaluator publishing to `hub`, rendering markdown as CommonMark
    pub fn new(hub: PresentationHub) -> Self {
        Self {
            outputs: HashMap::new(),
            hub,
            markup: Arc::new(CommonMarkConverter::new()),
            ticks: 0,
        }
    }

    /// Evaluate every node once, producers before consumers
    pub fn tick(&mut self, graph: &Graph) -> Result<TickReport, EvaluationError> {
        let order = graph
            .topological_order()
            .map_err(|_| EvaluationError::CycleDetected)?;

        self.outputs.retain(|id, _| graph.node(*id).is_some());

        for node_id in &order {
            self.evaluate_node(graph, *node_id)?;
        }

        self.ticks += 1;
        tracing::trace!(tick = self.ticks, nodes = order.len(), "tick complete");
        Ok(TickReport {
            tick: self.ticks,
            evaluated: order.len(),
        })
    }

    /// Evaluate a single node against the current output slots, outside the
    /// regular tick. Used to re-send a presentation on demand.
    pub fn trigger(&mut self, graph: &Graph, node_id: NodeId) -> Result<(), EvaluationError> {
        self.evaluate_node(graph, node_id)
    }

    fn evaluate_node(&mut self, graph: &Graph, node_id: NodeId) -> Result<(), EvaluationError> {
        let node = graph
            .node(node_id)
            .ok_or(EvaluationError::NodeNotFound(node_id))?;
        let inputs = self.gather_inputs(graph, node);
        let mut output = self.outputs.remove(&node_id).unwrap_or_default();

        let mut ctx = TickContext {
            markup: self.markup.as_ref(),
            presentation: &self.hub,
            node_id,
        };
        node.kind.evaluator().evaluate(&inputs, &mut output, &mut ctx);

        self.outputs.insert(node_id, output);
        Ok(())
    }

    fn gather_inputs(&self, graph: &Graph, node: &Node) -> NodeInputs {
        let values = node
            .inputs
            .iter()
            .map(|port| {
                let connection = graph.connections_to(port.id).next()?;
                let source = graph.node(connection.from.node)?;
                let index = source.output_index(&connection.from.port)?;
                self.outputs.get(&source.id)?.get(index).cloned()
            })
            .collect();
        NodeInputs::new(values)
    }

    /// Current value of output `index` of `node_id`
    pub fn output(&self, node_id: NodeId, index: usize) -> Option<&Arc<Value>> {
        self.outputs.get(&node_id)?.get(index)
    }

    /// Ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("nodes", &self.outputs.len())
            .field("hub", &self.hub)
            .field("ticks", &self.ticks)
            .finish()
    }
}

/// Error during evaluation
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// Graph contains a cycle
    #[error("Graph contains a cycle")]
    CycleDetected,

    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{
        create_registry, type_ids, MathOp, MathOperation, NodeKind, NumberInput, TextInput,
    };
    use crate::presentation::{Subscription, PRESENTATION_CHANNEL};
    use crate::protocol::{ContentKind, ProtocolMessage, RenderDescriptor};
    use tokio::sync::broadcast::error::TryRecvError;

    struct Fixture {
        graph: Graph,
        evaluator: Evaluator,
        rx: Subscription,
    }

    impl Fixture {
        fn new() -> Self {
            let hub = PresentationHub::new();
            let rx = hub.subscribe(PRESENTATION_CHANNEL);
            Self {
                graph: Graph::new("test"),
                evaluator: Evaluator::new(hub),
                rx,
            }
        }

        fn add(&mut self, type_id: &str) -> NodeId {
            let node = create_registry().create_node(type_id).unwrap();
            self.graph.add_node(node)
        }

        fn add_kind(&mut self, type_id: &str, kind: NodeKind) -> NodeId {
            let node = create_registry().create_node(type_id).unwrap().with_kind(kind);
            self.graph.add_node(node)
        }

        fn text(&mut self, text: &str) -> NodeId {
            self.add_kind(
                type_ids::TEXT,
                NodeKind::Text(TextInput {
                    text: text.to_string(),
                }),
            )
        }

        fn number(&mut self, value: f64) -> NodeId {
            self.add_kind(type_ids::NUMBER, NodeKind::Number(NumberInput { value }))
        }

        fn tick(&mut self) -> ProtocolMessage {
            self.evaluator.tick(&self.graph).unwrap();
            let message = self.rx.try_recv().unwrap();
            assert!(matches!(self.rx.try_recv(), Err(TryRecvError::Empty)));
            message
        }
    }

    fn rendered(message: ProtocolMessage) -> RenderDescriptor {
        match message {
            ProtocolMessage::Render { data } => data,
            ProtocolMessage::Clear => panic!("expected render, got clear"),
        }
    }

    #[test]
    fn test_text_reaches_surface_as_exact_json() {
        let mut fx = Fixture::new();
        let text = fx.text("Hello");
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(text, 0, out, 0).unwrap();

        let message = fx.tick();
        assert_eq!(
            message.to_json().unwrap(),
            r#"{"type":"render","data":{"content":{"kind":"text","val":"Hello"},"style":{}}}"#
        );
    }

    #[test]
    fn test_unconnected_output_publishes_clear() {
        let mut fx = Fixture::new();
        fx.add(type_ids::HTML_PRESENTATION);
        assert_eq!(fx.tick(), ProtocolMessage::Clear);
    }

    #[test]
    fn test_scene_of_two_texts() {
        let mut fx = Fixture::new();
        let a = fx.text("A");
        let b = fx.text("B");
        let combine = fx.add(type_ids::COMBINE_ELEMENTS);
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(a, 0, combine, 0).unwrap();
        fx.graph.connect_indices(b, 0, combine, 1).unwrap();
        fx.graph.connect_indices(combine, 0, out, 0).unwrap();

        let data = rendered(fx.tick());
        let vals: Vec<_> = data
            .elements()
            .unwrap()
            .iter()
            .map(|e| e.content().unwrap().val.clone())
            .collect();
        assert_eq!(vals, ["A", "B"]);
    }

    #[test]
    fn test_unconnected_composer_emits_empty_scene() {
        let mut fx = Fixture::new();
        let combine = fx.add(type_ids::COMBINE_ELEMENTS);
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(combine, 0, out, 0).unwrap();

        let data = rendered(fx.tick());
        assert_eq!(data.elements().unwrap().len(), 0);
    }

    #[test]
    fn test_composer_skips_holes() {
        let mut fx = Fixture::new();
        let a = fx.text("A");
        let combine = fx.add(type_ids::COMBINE_ELEMENTS);
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.add_input_port(combine).unwrap();
        fx.graph.connect_indices(a, 0, combine, 2).unwrap();
        fx.graph.connect_indices(combine, 0, out, 0).unwrap();

        let data = rendered(fx.tick());
        assert_eq!(data.elements().unwrap().len(), 1);
    }

    #[test]
    fn test_disconnecting_clears_the_surface() {
        let mut fx = Fixture::new();
        let text = fx.text("Hello");
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(text, 0, out, 0).unwrap();
        rendered(fx.tick());

        fx.graph.disconnect_input(out, 0).unwrap();
        assert_eq!(fx.tick(), ProtocolMessage::Clear);
    }

    #[test]
    fn test_style_transform_percent_opacity() {
        let mut fx = Fixture::new();
        let text = fx.text("hi");
        let opacity = fx.number(50.0);
        let style = fx.add(type_ids::STYLE_TRANSFORM);
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(text, 0, style, 0).unwrap();
        fx.graph.connect_indices(opacity, 0, style, 4).unwrap();
        fx.graph.connect_indices(style, 0, out, 0).unwrap();

        let RenderDescriptor::Leaf(leaf) = rendered(fx.tick()) else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.content.val, "hi");
        assert_eq!(leaf.style.opacity, Some(0.5));
        assert_eq!(leaf.style.transform.as_deref(), Some("translate(0px, 0px) scale(1)"));
    }

    #[test]
    fn test_style_transform_without_content_emits_nothing() {
        let mut fx = Fixture::new();
        let style = fx.add(type_ids::STYLE_TRANSFORM);
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(style, 0, out, 0).unwrap();
        assert_eq!(fx.tick(), ProtocolMessage::Clear);
    }

    #[test]
    fn test_math_keeps_last_result_when_operand_goes_away() {
        let mut fx = Fixture::new();
        let a = fx.number(6.0);
        let b = fx.number(7.0);
        let math = fx.add_kind(
            type_ids::MATH,
            NodeKind::Math(MathOperation {
                op: MathOp::Multiply,
                round: false,
            }),
        );
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(a, 0, math, 0).unwrap();
        fx.graph.connect_indices(math, 0, out, 0).unwrap();

        // One operand only: nothing computed yet
        assert_eq!(fx.tick(), ProtocolMessage::Clear);

        fx.graph.connect_indices(b, 0, math, 1).unwrap();
        assert_eq!(rendered(fx.tick()).content().unwrap().val, "42");

        fx.graph.disconnect_input(math, 1).unwrap();
        assert_eq!(rendered(fx.tick()).content().unwrap().val, "42");
    }

    #[test]
    fn test_markdown_renders_html_leaf() {
        let mut fx = Fixture::new();
        let text = fx.text("# Title");
        let markdown = fx.add(type_ids::MARKDOWN);
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(text, 0, markdown, 0).unwrap();
        fx.graph.connect_indices(markdown, 0, out, 0).unwrap();

        let data = rendered(fx.tick());
        let content = data.content().unwrap();
        assert_eq!(content.kind, ContentKind::Html);
        assert_eq!(content.val, "<h1>Title</h1>\n");
    }

    #[test]
    fn test_combine_text_stringifies_numbers() {
        let mut fx = Fixture::new();
        let text = fx.text("Count:");
        let number = fx.number(3.0);
        let combine = fx.add(type_ids::COMBINE_TEXT);
        fx.graph.connect_indices(text, 0, combine, 0).unwrap();
        fx.graph.connect_indices(number, 0, combine, 1).unwrap();

        fx.evaluator.tick(&fx.graph).unwrap();
        let value = fx.evaluator.output(combine, 0).unwrap();
        assert_eq!(value.as_str(), Some("Count: 3"));
    }

    #[test]
    fn test_manual_trigger_resends() {
        let mut fx = Fixture::new();
        let text = fx.text("again");
        let out = fx.add(type_ids::HTML_PRESENTATION);
        fx.graph.connect_indices(text, 0, out, 0).unwrap();
        let first = fx.tick();

        fx.evaluator.trigger(&fx.graph, out).unwrap();
        assert_eq!(fx.rx.try_recv().unwrap(), first);
        assert_eq!(fx.evaluator.tick_count(), 1);
    }

    #[test]
    fn test_removed_nodes_drop_their_outputs() {
        let mut fx = Fixture::new();
        let text = fx.text("gone");
        fx.evaluator.tick(&fx.graph).unwrap();
        assert!(fx.evaluator.output(text, 0).is_some());

        fx.graph.remove_node(text);
        fx.evaluator.tick(&fx.graph).unwrap();
        assert!(fx.evaluator.output(text, 0).is_none());
    }

    #[test]
    fn test_node_output_resizes() {
        let mut output = NodeOutput::new();
        output.set(2, 1.0);
        assert!(output.get(0).is_none());
        assert_eq!(output.get(2).unwrap().as_number(), Some(1.0));
        output.set_opt(2, None);
        assert!(output.get(2).is_none());
    }
}
