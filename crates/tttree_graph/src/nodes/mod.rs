// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds and the registry that exposes them to the editor.

pub mod inputs;
pub mod operators;
pub mod outputs;

use crate::evaluation::NodeEvaluator;
use crate::media::{LoadKind, Loaded, MediaError};
use crate::node::{NodeCategory, NodeRegistry, NodeType};
use crate::port::{Port, PortType};
use serde::{Deserialize, Serialize};

pub use inputs::{BooleanInput, DataInput, MediaInput, Note, NumberInput, TextInput, ThemeColors};
pub use operators::{
    CombineElements, CombineText, MarkdownNode, MathOp, MathOperation, StyleTransform,
};
pub use outputs::HtmlPresentation;

/// Configuration of a node, one variant per node kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Text constant
    Text(TextInput),
    /// Boolean constant
    Boolean(BooleanInput),
    /// Number constant
    Number(NumberInput),
    /// Five-color palette
    ThemeColors(ThemeColors),
    /// Loaded image
    Image(MediaInput),
    /// Loaded video
    Video(MediaInput),
    /// Loaded text file
    Data(DataInput),
    /// Scratchpad
    Note(Note),
    /// Arithmetic
    Math(MathOperation),
    /// String concatenation
    CombineText(CombineText),
    /// Markdown to markup
    Markdown(MarkdownNode),
    /// Style attachment
    StyleTransform(StyleTransform),
    /// Scene composer
    CombineElements(CombineElements),
    /// Presentation emitter
    HtmlPresentation(HtmlPresentation),
}

/// Growth rules for nodes whose input list can change at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicInputs {
    /// Inputs that can never be removed
    pub min: usize,
    /// Port name prefix; ports are numbered from 1
    pub prefix: &'static str,
}

impl NodeKind {
    /// Evaluation behavior for this kind
    pub fn evaluator(&self) -> &dyn NodeEvaluator {
        match self {
            Self::Text(n) => n,
            Self::Boolean(n) => n,
            Self::Number(n) => n,
            Self::ThemeColors(n) => n,
            Self::Image(n) | Self::Video(n) => n,
            Self::Data(n) => n,
            Self::Note(n) => n,
            Self::Math(n) => n,
            Self::CombineText(n) => n,
            Self::Markdown(n) => n,
            Self::StyleTransform(n) => n,
            Self::CombineElements(n) => n,
            Self::HtmlPresentation(n) => n,
        }
    }

    /// Loader path used by this kind, if it loads files at all
    pub fn load_kind(&self) -> Option<LoadKind> {
        match self {
            Self::Image(_) => Some(LoadKind::Image),
            Self::Video(_) => Some(LoadKind::Video),
            Self::Data(_) => Some(LoadKind::Text),
            _ => None,
        }
    }

    /// Persisted source that has to be decoded again after a restore
    pub fn restorable_source(&self) -> Option<&str> {
        match self {
            Self::Image(m) | Self::Video(m) if !m.url.is_empty() => Some(m.url.as_str()),
            _ => None,
        }
    }

    /// Input growth rules, for kinds with a variable number of inputs
    pub fn dynamic_inputs(&self) -> Option<DynamicInputs> {
        match self {
            Self::CombineElements(_) => Some(DynamicInputs {
                min: CombineElements::MIN_INPUTS,
                prefix: "element",
            }),
            _ => None,
        }
    }

    pub(crate) fn begin_load(&mut self, source: &str) -> bool {
        match self {
            Self::Image(m) | Self::Video(m) => m.begin_load(source),
            Self::Data(d) => d.begin_load(source),
            _ => return false,
        }
        true
    }

    pub(crate) fn finish_load(
        &mut self,
        source: &str,
        result: Result<Loaded, MediaError>,
    ) -> Result<bool, MediaError> {
        match self {
            Self::Image(m) | Self::Video(m) => m.finish_load(source, result),
            Self::Data(d) => d.finish_load(source, result),
            _ => Ok(false),
        }
    }
}

/// Type IDs of the built-in nodes
pub mod type_ids {
    /// Text input
    pub const TEXT: &str = "tttree/inputs/text";
    /// Boolean input
    pub const BOOLEAN: &str = "tttree/inputs/boolean";
    /// Number input
    pub const NUMBER: &str = "tttree/inputs/number";
    /// Image input
    pub const IMAGE: &str = "tttree/inputs/image";
    /// Video input
    pub const VIDEO: &str = "tttree/inputs/video";
    /// Text/data file input
    pub const DATA: &str = "tttree/inputs/data";
    /// Note
    pub const NOTE: &str = "tttree/inputs/note";
    /// Theme colors
    pub const THEME_COLORS: &str = "tttree/inputs/theme_colors";
    /// Math operation
    pub const MATH: &str = "tttree/operators/math";
    /// Combine text
    pub const COMBINE_TEXT: &str = "tttree/operators/combine_text";
    /// Style transform
    pub const STYLE_TRANSFORM: &str = "tttree/operators/style_transform";
    /// Combine elements
    pub const COMBINE_ELEMENTS: &str = "tttree/operators/combine_elements";
    /// Markdown
    pub const MARKDOWN: &str = "tttree/operators/markdown";
    /// HTML presentation output
    pub const HTML_PRESENTATION: &str = "tttree/outputs/html_presentation";
}

/// Create the node registry with every built-in node type
pub fn create_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // ========================================================================
    // Inputs
    // ========================================================================

    registry.register(NodeType {
        id: type_ids::TEXT.to_string(),
        name: "Text Input".to_string(),
        category: NodeCategory::Input,
        description: "Basic string input node".to_string(),
        inputs: vec![],
        outputs: vec![Port::output("string", PortType::String)],
        kind: NodeKind::Text(TextInput::default()),
    });

    registry.register(NodeType {
        id: type_ids::BOOLEAN.to_string(),
        name: "Boolean (Checkbox)".to_string(),
        category: NodeCategory::Input,
        description: "Toggle true or false".to_string(),
        inputs: vec![],
        outputs: vec![Port::output("boolean", PortType::Boolean)],
        kind: NodeKind::Boolean(BooleanInput::default()),
    });

    registry.register(NodeType {
        id: type_ids::NUMBER.to_string(),
        name: "Number Input".to_string(),
        category: NodeCategory::Input,
        description: "Standard numerical input".to_string(),
        inputs: vec![],
        outputs: vec![Port::output("number", PortType::Number)],
        kind: NodeKind::Number(NumberInput::default()),
    });

    registry.register(NodeType {
        id: type_ids::IMAGE.to_string(),
        name: "Image Input".to_string(),
        category: NodeCategory::Input,
        description: "Load a local image file".to_string(),
        inputs: vec![],
        outputs: vec![Port::output("image", PortType::Image)],
        kind: NodeKind::Image(MediaInput::default()),
    });

    registry.register(NodeType {
        id: type_ids::VIDEO.to_string(),
        name: "Video Input".to_string(),
        category: NodeCategory::Input,
        description: "Load a local video file".to_string(),
        inputs: vec![],
        outputs: vec![Port::output("video", PortType::Video)],
        kind: NodeKind::Video(MediaInput::default()),
    });

    registry.register(NodeType {
        id: type_ids::DATA.to_string(),
        name: "Load Text/Data".to_string(),
        category: NodeCategory::Input,
        description: "Load .txt, .csv, .json or .md file".to_string(),
        inputs: vec![],
        outputs: vec![Port::output("data (str)", PortType::String)],
        kind: NodeKind::Data(DataInput::default()),
    });

    registry.register(NodeType {
        id: type_ids::THEME_COLORS.to_string(),
        name: "Theme Colors".to_string(),
        category: NodeCategory::Input,
        description: "Outputs brand hex colors".to_string(),
        inputs: vec![],
        outputs: vec![
            Port::output("Primary", PortType::String),
            Port::output("Secondary", PortType::String),
            Port::output("Accent", PortType::String),
            Port::output("Dark BG", PortType::String),
            Port::output("Light Text", PortType::String),
        ],
        kind: NodeKind::ThemeColors(ThemeColors::default()),
    });

    registry.register(NodeType {
        id: type_ids::NOTE.to_string(),
        name: "Note".to_string(),
        category: NodeCategory::Utility,
        description: "A simple text scratchpad".to_string(),
        inputs: vec![],
        outputs: vec![],
        kind: NodeKind::Note(Note::default()),
    });

    // ========================================================================
    // Operators
    // ========================================================================

    registry.register(NodeType {
        id: type_ids::MATH.to_string(),
        name: "Math Operation".to_string(),
        category: NodeCategory::Operator,
        description: "Basic A and B math".to_string(),
        inputs: vec![
            Port::input("A", PortType::Number),
            Port::input("B", PortType::Number),
        ],
        outputs: vec![Port::output("result", PortType::Number)],
        kind: NodeKind::Math(MathOperation::default()),
    });

    registry.register(NodeType {
        id: type_ids::COMBINE_TEXT.to_string(),
        name: "Combine Text".to_string(),
        category: NodeCategory::Operator,
        description: "Concatenate two strings".to_string(),
        inputs: vec![
            Port::input("str1", PortType::String),
            Port::input("str2", PortType::String),
        ],
        outputs: vec![Port::output("combined", PortType::String)],
        kind: NodeKind::CombineText(CombineText::default()),
    });

    registry.register(NodeType {
        id: type_ids::STYLE_TRANSFORM.to_string(),
        name: "Style Transform (PSR)".to_string(),
        category: NodeCategory::Operator,
        description: "Applies Position, Scale, Opacity (CSS)".to_string(),
        inputs: vec![
            Port::input("element", PortType::Any),
            Port::input("x", PortType::Number),
            Port::input("y", PortType::Number),
            Port::input("scale", PortType::Number),
            Port::input("opacity", PortType::Number),
        ],
        outputs: vec![Port::output("styled_object", PortType::Any)],
        kind: NodeKind::StyleTransform(StyleTransform::default()),
    });

    registry.register(NodeType {
        id: type_ids::COMBINE_ELEMENTS.to_string(),
        name: "Combine Elements".to_string(),
        category: NodeCategory::Operator,
        description: "Stacks multiple elements together".to_string(),
        inputs: vec![
            Port::input("element 1", PortType::Any),
            Port::input("element 2", PortType::Any),
        ],
        outputs: vec![Port::output("scene", PortType::Any)],
        kind: NodeKind::CombineElements(CombineElements::default()),
    });

    registry.register(NodeType {
        id: type_ids::MARKDOWN.to_string(),
        name: "Markdown".to_string(),
        category: NodeCategory::Operator,
        description: "Converts markdown text to HTML".to_string(),
        inputs: vec![Port::input("markdown", PortType::String)],
        outputs: vec![Port::output("html", PortType::Markup)],
        kind: NodeKind::Markdown(MarkdownNode::default()),
    });

    // ========================================================================
    // Outputs
    // ========================================================================

    registry.register(NodeType {
        id: type_ids::HTML_PRESENTATION.to_string(),
        name: "HTML Output (Present)".to_string(),
        category: NodeCategory::Output,
        description: "Broadcasts to the Presentation window".to_string(),
        inputs: vec![Port::input("scene_data", PortType::Any)],
        outputs: vec![],
        kind: NodeKind::HtmlPresentation(HtmlPresentation::default()),
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let registry = create_registry();
        assert_eq!(registry.types().count(), 14);
        assert_eq!(registry.types_in_category(NodeCategory::Output).count(), 1);

        let theme = registry.create_node(type_ids::THEME_COLORS).unwrap();
        assert_eq!(theme.outputs.len(), 5);
        assert!(theme.inputs.is_empty());
    }

    #[test]
    fn test_nodes_of_same_type_have_distinct_ports() {
        let registry = create_registry();
        let a = registry.create_node(type_ids::COMBINE_ELEMENTS).unwrap();
        let b = registry.create_node(type_ids::COMBINE_ELEMENTS).unwrap();
        assert_ne!(a.inputs[0].id, b.inputs[0].id);
    }

    #[test]
    fn test_kind_serializes_with_tag() {
        let kind = NodeKind::Math(MathOperation {
            op: MathOp::Divide,
            round: true,
        });
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "math", "op": "/", "round": true }));
    }

    #[test]
    fn test_media_runtime_state_is_not_persisted() {
        let mut kind = NodeKind::Image(MediaInput::default());
        assert!(kind.begin_load("/tmp/pic.png"));
        let json = serde_json::to_string(&kind).unwrap();
        assert!(!json.contains("pending"));

        let restored: NodeKind = serde_json::from_str(r#"{"kind":"image","url":"/tmp/pic.png"}"#).unwrap();
        assert_eq!(restored.restorable_source(), Some("/tmp/pic.png"));
        assert_eq!(restored.load_kind(), Some(LoadKind::Image));
    }

    #[test]
    fn test_only_the_composer_has_dynamic_inputs() {
        let registry = create_registry();
        for node_type in registry.types() {
            let dynamic = node_type.kind.dynamic_inputs();
            assert_eq!(dynamic.is_some(), node_type.id == type_ids::COMBINE_ELEMENTS);
        }
    }
}
