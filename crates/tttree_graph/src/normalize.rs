// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reduction of any payload to a [`RenderDescriptor`] tree.
//!
//! Precedence, first match wins:
//! 1. scene: recurse over the elements, keep their order
//! 2. styled wrapper: keep the style, continue with the wrapped content
//!    (rules 3-6 only, so the style never reaches nested children)
//! 3. markup: `html`, verbatim
//! 4. media: `image` / `video` with the resolved locator
//! 5. primitive: `text`
//! 6. anything else: `json`
//!
//! Normalization is total and has no error path.

use crate::media::MediaKind;
use crate::payload::{format_number, Style, Value};
use crate::protocol::{ContentKind, RenderDescriptor, RenderStyle};
use serde_json::json;

/// Normalize a payload into a descriptor tree.
pub fn normalize(value: &Value) -> RenderDescriptor {
    match value {
        Value::Scene(scene) => {
            RenderDescriptor::scene(scene.elements.iter().map(|e| normalize(e)).collect())
        }
        Value::Styled(wrapper) => leaf(&wrapper.content, Some(&wrapper.style)),
        other => leaf(other, None),
    }
}

fn leaf(value: &Value, style: Option<&Style>) -> RenderDescriptor {
    let style = style.map(RenderStyle::from).unwrap_or_default();
    let (kind, val) = match value {
        Value::Markup(markup) => (ContentKind::Html, markup.html.clone()),
        Value::Media(resource) if resource.is_ready() => {
            let kind = match resource.kind {
                MediaKind::Image => ContentKind::Image,
                MediaKind::Video => ContentKind::Video,
            };
            (kind, resource.locator.clone())
        }
        // Half-constructed media falls back to its primitive form
        Value::Media(_) => (ContentKind::Text, String::new()),
        Value::String(s) => (ContentKind::Text, s.clone()),
        Value::Number(n) => (ContentKind::Text, format_number(*n)),
        Value::Boolean(b) => (ContentKind::Text, b.to_string()),
        Value::Styled(_) | Value::Scene(_) | Value::Object(_) => {
            (ContentKind::Json, to_json(value).to_string())
        }
    };
    RenderDescriptor::leaf(kind, val, style)
}

/// Best-effort JSON form of any value.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => json!(s),
        // NaN and infinities have no JSON form
        Value::Number(n) if n.is_finite() => json!(n),
        Value::Number(_) => serde_json::Value::Null,
        Value::Boolean(b) => json!(b),
        Value::Media(resource) => json!({
            "type": match resource.kind {
                MediaKind::Image => "image",
                MediaKind::Video => "video",
            },
            "src": resource.locator,
        }),
        Value::Markup(markup) => json!({ "isHtml": true, "val": markup.html }),
        Value::Styled(wrapper) => json!({
            "content": to_json(&wrapper.content),
            "style": RenderStyle::from(&wrapper.style),
        }),
        Value::Scene(scene) => json!({
            "isScene": true,
            "elements": scene.elements.iter().map(|e| to_json(e)).collect::<Vec<_>>(),
        }),
        Value::Object(object) => object.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaResource;
    use crate::payload::{Markup, Scene, StyledWrapper};
    use crate::protocol::ProtocolMessage;
    use std::sync::Arc;

    fn text(s: &str) -> Arc<Value> {
        Arc::new(Value::from(s))
    }

    #[test]
    fn test_primitives_become_text() {
        assert_eq!(normalize(&Value::from("Hello")), RenderDescriptor::leaf(ContentKind::Text, "Hello", RenderStyle::default()));
        assert_eq!(normalize(&Value::from(5.0)).content().unwrap().val, "5");
        assert_eq!(normalize(&Value::from(false)).content().unwrap().val, "false");
    }

    #[test]
    fn test_scene_preserves_order_and_count() {
        let scene = Value::Scene(Scene::new(vec![text("A"), text("B"), Arc::new(Value::from(3.0))]));
        let descriptor = normalize(&scene);
        let vals: Vec<_> = descriptor
            .elements()
            .unwrap()
            .iter()
            .map(|e| e.content().unwrap().val.clone())
            .collect();
        assert_eq!(vals, ["A", "B", "3"]);
    }

    #[test]
    fn test_nested_scenes() {
        let inner = Arc::new(Value::Scene(Scene::new(vec![text("inner")])));
        let outer = Value::Scene(Scene::new(vec![inner, text("outer")]));
        let descriptor = normalize(&outer);
        let elements = descriptor.elements().unwrap();
        assert_eq!(elements[0].elements().unwrap().len(), 1);
        assert_eq!(elements[1].content().unwrap().val, "outer");
    }

    #[test]
    fn test_styled_leaf_carries_style() {
        let style = Style::new(10.0, 20.0, 2.0, 50.0);
        let styled = Value::Styled(StyledWrapper::new(text("hi"), style));
        let RenderDescriptor::Leaf(leaf) = normalize(&styled) else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.content.kind, ContentKind::Text);
        assert_eq!(leaf.content.val, "hi");
        assert_eq!(leaf.style.transform.as_deref(), Some("translate(10px, 20px) scale(2)"));
        assert_eq!(leaf.style.opacity, Some(0.5));
    }

    #[test]
    fn test_styled_markup_keeps_style() {
        let styled = Value::Styled(StyledWrapper::new(
            Arc::new(Value::Markup(Markup::new("<h1>T</h1>"))),
            Style::default(),
        ));
        let RenderDescriptor::Leaf(leaf) = normalize(&styled) else {
            panic!("expected leaf");
        };
        assert_eq!(leaf.content.kind, ContentKind::Html);
        assert_eq!(leaf.content.val, "<h1>T</h1>");
        assert!(!leaf.style.is_empty());
    }

    #[test]
    fn test_style_never_reaches_scene_children() {
        let scene = Arc::new(Value::Scene(Scene::new(vec![text("child")])));
        let styled = Value::Styled(StyledWrapper::new(scene, Style::new(5.0, 5.0, 1.0, 1.0)));
        let descriptor = normalize(&styled);

        // The wrapped scene is not re-entered, so no child descriptor exists to inherit anything
        let content = descriptor.content().unwrap();
        assert_eq!(content.kind, ContentKind::Json);
        let parsed: serde_json::Value = serde_json::from_str(&content.val).unwrap();
        assert_eq!(parsed, json!({ "isScene": true, "elements": ["child"] }));
    }

    #[test]
    fn test_media_leaves() {
        let image = Value::Media(Arc::new(MediaResource::with_locator(MediaKind::Image, "file:///a.png")));
        let content = normalize(&image).content().cloned().unwrap();
        assert_eq!(content.kind, ContentKind::Image);
        assert_eq!(content.val, "file:///a.png");

        let video = Value::Media(Arc::new(MediaResource::with_locator(MediaKind::Video, "file:///a.mp4")));
        assert_eq!(normalize(&video).content().unwrap().kind, ContentKind::Video);

        let unready = Value::Media(Arc::new(MediaResource::with_locator(MediaKind::Image, "")));
        let content = normalize(&unready).content().cloned().unwrap();
        assert_eq!(content.kind, ContentKind::Text);
        assert_eq!(content.val, "");
    }

    #[test]
    fn test_object_falls_back_to_json() {
        let object = Value::Object(json!({ "a": [1, 2] }));
        let content = normalize(&object).content().cloned().unwrap();
        assert_eq!(content.kind, ContentKind::Json);
        assert_eq!(content.val, r#"{"a":[1,2]}"#);
    }

    #[test]
    fn test_normalizing_a_descriptor_is_json_fallback() {
        let first = normalize(&Value::Scene(Scene::new(vec![text("A")])));
        let as_object = Value::Object(serde_json::to_value(&first).unwrap());
        let second = normalize(&as_object);
        assert_eq!(second.content().unwrap().kind, ContentKind::Json);

        // And the result is still a valid message
        let message = ProtocolMessage::Render { data: second };
        assert!(message.to_json().is_ok());
    }

    #[test]
    fn test_non_finite_numbers() {
        assert_eq!(normalize(&Value::from(f64::INFINITY)).content().unwrap().val, "Infinity");
        assert_eq!(to_json(&Value::from(f64::NAN)), serde_json::Value::Null);
    }
}
