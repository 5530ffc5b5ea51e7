use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod bounds;
pub mod extract;

pub use self::bounds::parse_bounds;
pub use self::extract::{
    extract_components, extract_components_from_str, parse_tree, resolve_screen_size,
    resolve_screen_size_from_str,
};

pub const DEFAULT_COMPONENT_TYPE: &str = "component";
pub const ROOT_COMPONENT_TYPE: &str = "root";

/// Axis-aligned rectangle in source device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BoundingBox {
    /// Builds a box from a top-left / bottom-right corner pair. Inverted spans
    /// clamp to zero.
    pub fn from_corners(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1).max(0),
            height: y2.saturating_sub(y1).max(0),
        }
    }

    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn from_bounding_box(bounding_box: &BoundingBox) -> Self {
        Self {
            width: clamp_to_u32(bounding_box.width),
            height: clamp_to_u32(bounding_box.height),
        }
    }
}

impl Display for ScreenSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn clamp_to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// One renderable UI element extracted from a tree dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Dynamically shaped tree input, normalized into the two nestable shapes the
/// extractor walks. Scalars and `null` become `Opaque` and contribute nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum UiNode {
    Sequence(Vec<UiNode>),
    Leaf {
        attributes: Option<NodeAttributes>,
    },
    Composite {
        attributes: Option<NodeAttributes>,
        children: Vec<UiNode>,
    },
    Opaque,
}

impl UiNode {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Sequence(items.iter().map(Self::from_value).collect()),
            Value::Object(object) => {
                let attributes = object
                    .get("attributes")
                    .and_then(Value::as_object)
                    .cloned()
                    .map(NodeAttributes);
                match object.get("children").and_then(Value::as_array) {
                    Some(children) => Self::Composite {
                        attributes,
                        children: children.iter().map(Self::from_value).collect(),
                    },
                    None => Self::Leaf { attributes },
                }
            }
            _ => Self::Opaque,
        }
    }

    pub fn attributes(&self) -> Option<&NodeAttributes> {
        match self {
            Self::Leaf { attributes } | Self::Composite { attributes, .. } => attributes.as_ref(),
            Self::Sequence(_) | Self::Opaque => None,
        }
    }

    pub fn children(&self) -> &[UiNode] {
        match self {
            Self::Sequence(items) => items,
            Self::Composite { children, .. } => children,
            Self::Leaf { .. } | Self::Opaque => &[],
        }
    }
}

/// The `attributes` object of a tree node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeAttributes(pub Map<String, Value>);

impl NodeAttributes {
    /// Textual form of the `bounds` field. Numbers and arrays are rendered to
    /// text so the permissive token scan can still find their digits.
    pub fn bounds_text(&self) -> Option<String> {
        match self.0.get("bounds")? {
            Value::String(text) => Some(text.clone()),
            Value::Null | Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn kind(&self) -> Option<String> {
        self.0.get("type").and_then(truthy_text)
    }

    pub fn resolved_kind(&self) -> String {
        self.kind()
            .unwrap_or_else(|| DEFAULT_COMPONENT_TYPE.to_owned())
    }

    /// Accessibility identifier, falling back to the hash code.
    pub fn identifier(&self) -> Option<String> {
        self.0
            .get("accessibilityId")
            .and_then(truthy_text)
            .or_else(|| self.0.get("hashcode").and_then(truthy_text))
    }

    pub fn text(&self) -> Option<String> {
        match self.0.get("text") {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        }
    }
}

/// Empty strings, zero, `false` and `null` count as absent. Composite values
/// are never used as identifiers or types.
fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) if number.as_f64().is_some_and(|n| n != 0.0) => {
            Some(number.to_string())
        }
        Value::Bool(true) => Some("true".to_owned()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BoundingBox, NodeAttributes, ScreenSize, UiNode};

    #[test]
    fn from_corners_clamps_inverted_spans() {
        let bounding_box = BoundingBox::from_corners(50, 50, 40, 80);
        assert_eq!(bounding_box.width, 0);
        assert_eq!(bounding_box.height, 30);
        assert!(!bounding_box.has_area());
    }

    #[test]
    fn node_shapes_follow_children_field() {
        let value = json!({
            "attributes": {"type": "root"},
            "children": [
                {"attributes": {"type": "Button"}},
                42,
                [{"attributes": {}}]
            ]
        });

        let node = UiNode::from_value(&value);
        let UiNode::Composite { children, .. } = &node else {
            panic!("expected composite node, got {node:?}");
        };
        assert!(matches!(children[0], UiNode::Leaf { .. }));
        assert_eq!(children[1], UiNode::Opaque);
        assert!(matches!(children[2], UiNode::Sequence(_)));
        assert_eq!(
            node.attributes().and_then(NodeAttributes::kind).as_deref(),
            Some("root")
        );
    }

    #[test]
    fn non_array_children_are_ignored() {
        let node = UiNode::from_value(&json!({"attributes": {}, "children": {"a": 1}}));
        assert!(matches!(node, UiNode::Leaf { .. }));
        assert!(node.children().is_empty());
    }

    #[test]
    fn identifier_prefers_accessibility_id_and_skips_falsy_values() {
        let attributes = |value: serde_json::Value| {
            NodeAttributes(value.as_object().cloned().unwrap_or_default())
        };

        assert_eq!(
            attributes(json!({"accessibilityId": "login", "hashcode": 7})).identifier(),
            Some("login".to_owned())
        );
        assert_eq!(
            attributes(json!({"accessibilityId": "", "hashcode": 7})).identifier(),
            Some("7".to_owned())
        );
        assert_eq!(
            attributes(json!({"accessibilityId": null, "hashcode": 0})).identifier(),
            None
        );
    }

    #[test]
    fn bounds_text_renders_non_string_values() {
        let attributes = NodeAttributes(
            json!({"bounds": [0, 0, 100, 50]})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        assert_eq!(attributes.bounds_text().as_deref(), Some("[0,0,100,50]"));
    }

    #[test]
    fn screen_size_display_uses_width_by_height() {
        let screen = ScreenSize {
            width: 1080,
            height: 1920,
        };
        assert_eq!(screen.to_string(), "1080x1920");
    }
}
