// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values that flow along connections.
//!
//! Every output slot carries an `Arc<Value>`. Operators that wrap or group
//! upstream values hold on to those `Arc`s instead of copying what they point
//! at, so a styled image and the image node's own output share one resource.

use crate::media::{MediaKind, MediaResource};
use crate::port::PortType;
use std::sync::Arc;

/// A value produced by a node output.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text
    String(String),
    /// Number (the host has a single numeric type)
    Number(f64),
    /// Boolean
    Boolean(bool),
    /// Loaded image or video, owned by the producing node
    Media(Arc<MediaResource>),
    /// Already-rendered markup
    Markup(Markup),
    /// Content paired with positional/opacity metadata
    Styled(StyledWrapper),
    /// Ordered group of elements
    Scene(Scene),
    /// Any other structured value
    Object(serde_json::Value),
}

impl Value {
    /// Numeric read. Anything that is not a number reads as missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrowed string read. Anything that is not a string reads as missing.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Stringified form of a primitive, `None` for composite values.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The port type this value naturally travels on.
    pub fn port_type(&self) -> PortType {
        match self {
            Self::String(_) => PortType::String,
            Self::Number(_) => PortType::Number,
            Self::Boolean(_) => PortType::Boolean,
            Self::Media(resource) => match resource.kind {
                MediaKind::Image => PortType::Image,
                MediaKind::Video => PortType::Video,
            },
            Self::Markup(_) => PortType::Markup,
            Self::Styled(_) | Self::Scene(_) | Self::Object(_) => PortType::Any,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Markup> for Value {
    fn from(value: Markup) -> Self {
        Self::Markup(value)
    }
}

impl From<StyledWrapper> for Value {
    fn from(value: StyledWrapper) -> Self {
        Self::Styled(value)
    }
}

impl From<Scene> for Value {
    fn from(value: Scene) -> Self {
        Self::Scene(value)
    }
}

/// Markup that has already been rendered and must not be escaped again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup {
    /// Rendered HTML
    pub html: String,
}

impl Markup {
    /// Wrap rendered HTML
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

/// Position, scale and opacity attached to a piece of content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    /// Horizontal offset in pixels
    pub translate_x: f64,
    /// Vertical offset in pixels
    pub translate_y: f64,
    /// Uniform scale factor
    pub scale: f64,
    /// Opacity, already normalized
    pub opacity: f64,
}

impl Style {
    /// Build a style, normalizing `opacity` exactly once.
    pub fn new(translate_x: f64, translate_y: f64, scale: f64, opacity: f64) -> Self {
        Self {
            translate_x,
            translate_y,
            scale,
            opacity: normalize_opacity(opacity),
        }
    }

    /// CSS transform string for this style
    pub fn transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            format_number(self.translate_x),
            format_number(self.translate_y),
            format_number(self.scale)
        )
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

/// Treat opacities above 1 as percentages.
///
/// A raw value of `1.5` becomes `0.015`; callers wanting a fraction must pass
/// one.
pub fn normalize_opacity(opacity: f64) -> f64 {
    if opacity > 1.0 {
        opacity / 100.0
    } else {
        opacity
    }
}

/// Content plus style. The content is shared, never copied or modified.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledWrapper {
    /// Wrapped content
    pub content: Arc<Value>,
    /// Style applied to that content
    pub style: Style,
}

impl StyledWrapper {
    /// Wrap `content` with `style`
    pub fn new(content: Arc<Value>, style: Style) -> Self {
        Self { content, style }
    }
}

/// Ordered, nestable group of values. Element order is render order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Elements in port order
    pub elements: Vec<Arc<Value>>,
}

impl Scene {
    /// Scene from elements
    pub fn new(elements: Vec<Arc<Value>>) -> Self {
        Self { elements }
    }

    /// Number of direct elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the scene has no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Format a number the way the presentation surface expects (`5`, not `5.0`).
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        // covers -0
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // Exponent form with an explicit sign on positive exponents: `1e+21`.
        let formatted = format!("{n:e}");
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        }
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opacity_percentage_is_divided_once() {
        assert_eq!(Style::new(0.0, 0.0, 1.0, 50.0).opacity, 0.5);
        assert_eq!(Style::new(0.0, 0.0, 1.0, 0.5).opacity, 0.5);
        assert_eq!(Style::new(0.0, 0.0, 1.0, 150.0).opacity, 1.5);
        assert_eq!(Style::new(0.0, 0.0, 1.0, 1.0).opacity, 1.0);
    }

    #[test]
    fn test_opacity_between_one_and_hundred_is_a_percentage() {
        // 1.5 meant as a raw factor still becomes 1.5%
        assert!((normalize_opacity(1.5) - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_transform_string() {
        let style = Style::new(10.0, -5.5, 2.0, 1.0);
        assert_eq!(style.transform(), "translate(10px, -5.5px) scale(2)");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(123456.0), "123456");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2e22), "-2e+22");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
    }

    #[test]
    fn test_primitive_reads() {
        assert_eq!(Value::from(3.0).as_number(), Some(3.0));
        assert_eq!(Value::from("3").as_number(), None);
        assert_eq!(Value::from(true).to_text().as_deref(), Some("true"));
        assert_eq!(Value::Scene(Scene::default()).to_text(), None);
    }

    #[test]
    fn test_wrapping_shares_content() {
        let content = Arc::new(Value::from("hello"));
        let wrapper = StyledWrapper::new(Arc::clone(&content), Style::default());
        assert!(Arc::ptr_eq(&content, &wrapper.content));
        assert_eq!(*content, Value::from("hello"));
    }
}
