use serde_json::Value;
use tracing::debug;

use super::bounds::parse_bounds;
use super::{Component, ROOT_COMPONENT_TYPE, ScreenSize, UiNode};

/// Parses raw tree text. Malformed JSON is not an error here: callers treat
/// it as an empty tree.
pub fn parse_tree(raw: &str) -> Option<UiNode> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some(UiNode::from_value(&value)),
        Err(error) => {
            debug!(error = %error, bytes = raw.len(), "tree text is not valid JSON");
            None
        }
    }
}

pub fn extract_components_from_str(raw: &str) -> Vec<Component> {
    parse_tree(raw)
        .map(|tree| extract_components(&tree))
        .unwrap_or_default()
}

pub fn resolve_screen_size_from_str(raw: &str) -> Option<ScreenSize> {
    if raw.trim().is_empty() {
        return None;
    }
    parse_tree(raw).and_then(|tree| resolve_screen_size(&tree))
}

/// Full source viewport, read from the top-level node's bounds only.
pub fn resolve_screen_size(tree: &UiNode) -> Option<ScreenSize> {
    let bounds = tree.attributes()?.bounds_text()?;
    parse_bounds(&bounds).map(|bounding_box| ScreenSize::from_bounding_box(&bounding_box))
}

/// Flattens a tree into components in depth-first pre-order.
///
/// A node that does not qualify (the root, a zero-area container, a node
/// without bounds) still contributes its descendants.
pub fn extract_components(tree: &UiNode) -> Vec<Component> {
    let mut components = Vec::new();
    let mut pending = vec![tree];

    while let Some(node) = pending.pop() {
        if let Some(component) = qualify_node(node, components.len()) {
            components.push(component);
        }
        pending.extend(node.children().iter().rev());
    }

    debug!(components = components.len(), "extracted components from tree");
    components
}

/// `next_index` is the number of components accepted so far; it becomes the
/// identifier when the node carries neither an accessibility id nor a hash code.
fn qualify_node(node: &UiNode, next_index: usize) -> Option<Component> {
    let attributes = node.attributes()?;
    let bounding_box = parse_bounds(&attributes.bounds_text()?)?;
    let kind = attributes.resolved_kind();
    if kind == ROOT_COMPONENT_TYPE || !bounding_box.has_area() {
        return None;
    }

    Some(Component {
        id: attributes
            .identifier()
            .unwrap_or_else(|| next_index.to_string()),
        kind,
        bounding_box,
        confidence: None,
        text: attributes.text(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_components, extract_components_from_str, resolve_screen_size_from_str};
    use crate::tree::{BoundingBox, ScreenSize, UiNode};

    #[test]
    fn extracts_in_depth_first_pre_order() {
        let tree = json!({
            "attributes": {"type": "root", "bounds": "[0,0][1080,1920]"},
            "children": [
                {
                    "attributes": {"type": "Column", "bounds": "[0,0][1080,960]", "hashcode": 11},
                    "children": [
                        {"attributes": {"type": "Text", "bounds": "[0,0][540,100]", "text": "Title"}}
                    ]
                },
                {"attributes": {"type": "Button", "bounds": "[0,960][1080,1100]", "accessibilityId": "submit"}}
            ]
        });

        let components = extract_components(&UiNode::from_value(&tree));
        let ids = components
            .iter()
            .map(|component| component.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["11", "1", "submit"]);
        assert_eq!(components[1].text.as_deref(), Some("Title"));
        assert_eq!(components[2].kind, "Button");
    }

    #[test]
    fn excludes_root_typed_nodes_regardless_of_bounds() {
        let tree = json!([
            {"attributes": {"type": "root", "bounds": "[0,0][100,100]"}},
            {"attributes": {"type": "Image", "bounds": "[0,0][10,10]"}}
        ]);

        let components = extract_components(&UiNode::from_value(&tree));
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].kind, "Image");
        assert_eq!(components[0].id, "0");
    }

    #[test]
    fn zero_area_nodes_are_skipped_but_children_are_visited() {
        let tree = json!({
            "attributes": {"type": "Stack", "bounds": "[10,10][10,500]"},
            "children": [
                {"attributes": {"bounds": "[10,10][60,60]"}}
            ]
        });

        let components = extract_components(&UiNode::from_value(&tree));
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].kind, "component");
        assert_eq!(
            components[0].bounding_box,
            BoundingBox {
                x: 10,
                y: 10,
                width: 50,
                height: 50,
            }
        );
    }

    #[test]
    fn fallback_ids_count_only_accepted_components() {
        let tree = json!([
            {"attributes": {"type": "A", "bounds": "[0,0][0,0]"}},
            {"attributes": {"type": "B", "bounds": "[0,0][5,5]"}},
            {"attributes": {"type": "C"}},
            {"attributes": {"type": "D", "bounds": "[0,0][5,5]", "hashcode": "abc"}},
            {"attributes": {"type": "E", "bounds": "[0,0][5,5]"}}
        ]);

        let ids = extract_components(&UiNode::from_value(&tree))
            .into_iter()
            .map(|component| component.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["0", "abc", "2"]);
    }

    #[test]
    fn malformed_json_yields_empty_list() {
        assert!(extract_components_from_str("{not json").is_empty());
        assert!(extract_components_from_str("").is_empty());
        assert!(extract_components_from_str("42").is_empty());
    }

    #[test]
    fn screen_size_reads_top_level_bounds_only() {
        let raw = r#"{"attributes": {"type": "root", "bounds": "[0,0][1080,2340]"}, "children": []}"#;
        assert_eq!(
            resolve_screen_size_from_str(raw),
            Some(ScreenSize {
                width: 1080,
                height: 2340,
            })
        );

        let nested_only = r#"{"children": [{"attributes": {"bounds": "[0,0][10,10]"}}]}"#;
        assert_eq!(resolve_screen_size_from_str(nested_only), None);
        assert_eq!(resolve_screen_size_from_str(r#"[{"attributes": {"bounds": "[0,0][10,10]"}}]"#), None);
        assert_eq!(resolve_screen_size_from_str("not json"), None);
        assert_eq!(resolve_screen_size_from_str("   "), None);
    }

    #[test]
    fn one_qualifying_design_component_and_empty_code_tree() {
        let design = r#"{"attributes": {"type": "root", "bounds": "[0,0][1080,1920]"},
            "children": [{"attributes": {"type": "Button", "bounds": "[0,0][100,50]"}}]}"#;
        let code = r#"{"attributes": {"type": "root", "bounds": "[0,0][1080,1920]"}, "children": []}"#;

        let design_components = extract_components_from_str(design);
        assert_eq!(design_components.len(), 1);
        assert_eq!(
            design_components[0].bounding_box,
            BoundingBox {
                x: 0,
                y: 0,
                width: 100,
                height: 50,
            }
        );
        assert!(extract_components_from_str(code).is_empty());
    }
}
