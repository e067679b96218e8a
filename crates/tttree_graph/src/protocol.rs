// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire format shared with presentation surfaces.
//!
//! ```json
//! { "type": "clear" }
//! { "type": "render", "data": { "content": { "kind": "text", "val": "Hi" }, "style": {} } }
//! { "type": "render", "data": { "type": "scene", "elements": [ ... ] } }
//! ```

use crate::payload::Style;
use serde::{Deserialize, Serialize};

/// Message published on a presentation channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProtocolMessage {
    /// Remove whatever is displayed
    Clear,
    /// Replace the display with `data`
    Render {
        /// Descriptor tree to display
        data: RenderDescriptor,
    },
}

impl ProtocolMessage {
    /// Encode as a single JSON line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a message received from a channel
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Normalized, self-contained description of something to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderDescriptor {
    /// Ordered composite
    Scene(SceneDescriptor),
    /// Single piece of content
    Leaf(LeafDescriptor),
}

impl RenderDescriptor {
    /// Composite descriptor
    pub fn scene(elements: Vec<RenderDescriptor>) -> Self {
        Self::Scene(SceneDescriptor {
            tag: SceneTag::Scene,
            elements,
        })
    }

    /// Leaf descriptor
    pub fn leaf(kind: ContentKind, val: impl Into<String>, style: RenderStyle) -> Self {
        Self::Leaf(LeafDescriptor {
            content: Content {
                kind,
                val: val.into(),
            },
            style,
        })
    }

    /// Leaf content, if this is a leaf
    pub fn content(&self) -> Option<&Content> {
        match self {
            Self::Leaf(leaf) => Some(&leaf.content),
            Self::Scene(_) => None,
        }
    }

    /// Scene elements, if this is a scene
    pub fn elements(&self) -> Option<&[RenderDescriptor]> {
        match self {
            Self::Scene(scene) => Some(&scene.elements),
            Self::Leaf(_) => None,
        }
    }
}

/// Only value of a scene's `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneTag {
    /// `"scene"`
    Scene,
}

/// `{ "type": "scene", "elements": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescriptor {
    /// Always `"scene"`
    #[serde(rename = "type")]
    pub tag: SceneTag,
    /// Children in render order
    pub elements: Vec<RenderDescriptor>,
}

/// `{ "content": {...}, "style": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafDescriptor {
    /// What to display
    pub content: Content,
    /// How to place it
    #[serde(default)]
    pub style: RenderStyle,
}

/// Kind of leaf content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Plain text, escaped by the surface
    Text,
    /// Image source locator
    Image,
    /// Video source locator
    Video,
    /// Pre-rendered markup, inserted verbatim
    Html,
    /// JSON text of an unrecognized value
    Json,
}

/// Leaf content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Content kind
    pub kind: ContentKind,
    /// Text, markup, locator or JSON, depending on `kind`
    pub val: String,
}

/// CSS-ready style. Empty style serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStyle {
    /// CSS transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    /// Opacity in `[0, 1]` for sensible inputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl RenderStyle {
    /// Whether nothing is set
    pub fn is_empty(&self) -> bool {
        self.transform.is_none() && self.opacity.is_none()
    }
}

impl From<&Style> for RenderStyle {
    fn from(style: &Style) -> Self {
        Self {
            transform: Some(style.transform()),
            opacity: Some(style.opacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clear_shape() {
        assert_eq!(ProtocolMessage::Clear.to_json().unwrap(), r#"{"type":"clear"}"#);
    }

    #[test]
    fn test_scene_shape() {
        let message = ProtocolMessage::Render {
            data: RenderDescriptor::scene(vec![RenderDescriptor::leaf(
                ContentKind::Html,
                "<p>x</p>",
                RenderStyle {
                    transform: Some("translate(1px, 2px) scale(1)".to_string()),
                    opacity: Some(0.5),
                },
            )]),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "render",
                "data": {
                    "type": "scene",
                    "elements": [{
                        "content": { "kind": "html", "val": "<p>x</p>" },
                        "style": { "transform": "translate(1px, 2px) scale(1)", "opacity": 0.5 }
                    }]
                }
            })
        );
    }

    #[test]
    fn test_decode_from_surface_json() {
        let text = r#"{"type":"render","data":{"type":"scene","elements":[{"content":{"kind":"image","val":"file:///a.png"},"style":{}}]}}"#;
        let message = ProtocolMessage::from_json(text).unwrap();
        let ProtocolMessage::Render { data } = message else {
            panic!("expected render");
        };
        let elements = data.elements().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].content().unwrap().kind, ContentKind::Image);
    }
}
