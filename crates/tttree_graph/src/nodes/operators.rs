// SPDX-License-Identifier: MIT OR Apache-2.0
//! Operators: arithmetic, text, markup, styling and scene composition.
//!
//! Each operator decides for itself what a missing input means. Returning
//! without touching `output` skips the tick, and downstream keeps seeing
//! whatever the operator emitted last.

use crate::evaluation::{NodeEvaluator, NodeInputs, NodeOutput, TickContext};
use crate::payload::{Markup, Scene, Style, StyledWrapper, Value};
use serde::{Deserialize, Serialize};

/// Binary arithmetic operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MathOp {
    /// `a + b`
    #[default]
    #[serde(rename = "+")]
    Add,
    /// `a - b`
    #[serde(rename = "-")]
    Subtract,
    /// `a * b`
    #[serde(rename = "*")]
    Multiply,
    /// `a / b`, zero when `b` is zero
    #[serde(rename = "/")]
    Divide,
}

impl MathOp {
    /// Apply the operation
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
        }
    }
}

/// Round half up (towards positive infinity), so `-2.5` becomes `-2`.
fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// `A op B`, optionally rounded. Skips the tick unless both inputs are numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathOperation {
    /// Selected operation
    pub op: MathOp,
    /// Round the result to the nearest integer
    pub round: bool,
}

impl MathOperation {
    /// Compute the result for two operands
    pub fn compute(&self, a: f64, b: f64) -> f64 {
        let result = self.op.apply(a, b);
        if self.round {
            round_half_up(result)
        } else {
            result
        }
    }
}

impl NodeEvaluator for MathOperation {
    fn evaluate(&self, inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        let (Some(a), Some(b)) = (inputs.number(0), inputs.number(1)) else {
            return;
        };
        output.set(0, self.compute(a, b));
    }
}

/// `str1 + separator + str2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombineText {
    /// Inserted between the two strings
    pub separator: String,
}

impl Default for CombineText {
    fn default() -> Self {
        Self {
            separator: " ".to_string(),
        }
    }
}

impl CombineText {
    /// Join two optional operands; `None` only when both are missing
    pub fn combine(&self, first: Option<String>, second: Option<String>) -> Option<String> {
        if first.is_none() && second.is_none() {
            return None;
        }
        Some(format!(
            "{}{}{}",
            first.unwrap_or_default(),
            self.separator,
            second.unwrap_or_default()
        ))
    }
}

impl NodeEvaluator for CombineText {
    fn evaluate(&self, inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        if let Some(combined) = self.combine(inputs.text(0), inputs.text(1)) {
            output.set(0, combined);
        }
    }
}

/// Markdown to rendered markup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownNode {
    /// Used when the input is unconnected
    pub text: String,
}

impl Default for MarkdownNode {
    fn default() -> Self {
        Self {
            text: "# Markdown Title\nType your markdown here...".to_string(),
        }
    }
}

impl NodeEvaluator for MarkdownNode {
    fn evaluate(&self, inputs: &NodeInputs, output: &mut NodeOutput, ctx: &mut TickContext<'_>) {
        let source = inputs.text(0).unwrap_or_else(|| self.text.clone());
        let html = ctx.markup.to_html(&source);
        output.set(0, Markup::new(html));
    }
}

/// Attach position, scale and opacity to any content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleTransform {
    /// X offset when `x` is unconnected
    pub default_x: f64,
    /// Y offset when `y` is unconnected
    pub default_y: f64,
    /// Scale when `scale` is unconnected
    pub default_scale: f64,
    /// Opacity when `opacity` is unconnected
    pub default_opacity: f64,
}

impl Default for StyleTransform {
    fn default() -> Self {
        Self {
            default_x: 0.0,
            default_y: 0.0,
            default_scale: 1.0,
            default_opacity: 1.0,
        }
    }
}

impl NodeEvaluator for StyleTransform {
    fn evaluate(&self, inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        let Some(content) = inputs.get(0) else {
            return;
        };
        let style = Style::new(
            inputs.number(1).unwrap_or(self.default_x),
            inputs.number(2).unwrap_or(self.default_y),
            inputs.number(3).unwrap_or(self.default_scale),
            inputs.number(4).unwrap_or(self.default_opacity),
        );
        output.set(0, StyledWrapper::new(content.clone(), style));
    }
}

/// Stacks every connected input into a scene, in port order.
///
/// Starts with two inputs; more can be added through
/// [`crate::Graph::add_input_port`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombineElements {}

impl CombineElements {
    /// Inputs the node can never go below
    pub const MIN_INPUTS: usize = 2;
}

impl NodeEvaluator for CombineElements {
    fn evaluate(&self, inputs: &NodeInputs, output: &mut NodeOutput, _ctx: &mut TickContext<'_>) {
        let elements = inputs.iter().flatten().cloned().collect();
        output.set(0, Value::Scene(Scene::new(elements)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_by_zero_is_zero() {
        let node = MathOperation {
            op: MathOp::Divide,
            round: false,
        };
        assert_eq!(node.compute(10.0, 0.0), 0.0);
        assert_eq!(node.compute(10.0, 4.0), 2.5);
    }

    #[test]
    fn test_rounding_happens_after_the_operation() {
        let node = MathOperation {
            op: MathOp::Divide,
            round: true,
        };
        assert_eq!(node.compute(10.0, 4.0), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
    }

    #[test]
    fn test_math_op_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&MathOp::Multiply).unwrap(), "\"*\"");
        let op: MathOp = serde_json::from_str("\"/\"").unwrap();
        assert_eq!(op, MathOp::Divide);
    }

    #[test]
    fn test_combine_text_with_missing_operand() {
        let node = CombineText {
            separator: "-".to_string(),
        };
        assert_eq!(node.combine(None, Some("hi".to_string())).as_deref(), Some("-hi"));
        assert_eq!(node.combine(Some("a".to_string()), None).as_deref(), Some("a-"));
        assert_eq!(node.combine(None, None), None);
    }
}
