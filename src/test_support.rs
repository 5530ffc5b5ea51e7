use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use crate::tree::{BoundingBox, Component};

pub fn temp_path(prefix: &str) -> PathBuf {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "layout_overlay_{prefix}_{}_{}",
        std::process::id(),
        now_ns
    ))
}

pub fn remove_dir_if_exists(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}

/// Tree dump with a `root` node spanning the screen and one child per entry
/// of `(accessibilityId, type, [x1, y1, x2, y2])`.
pub fn fixture_tree(width: u32, height: u32, children: &[(&str, &str, [i64; 4])]) -> String {
    let children = children
        .iter()
        .map(|(id, kind, [x1, y1, x2, y2])| {
            json!({
                "attributes": {
                    "accessibilityId": id,
                    "type": kind,
                    "bounds": format!("[{x1},{y1}][{x2},{y2}]"),
                },
                "children": []
            })
        })
        .collect::<Vec<_>>();

    json!({
        "attributes": {
            "type": "root",
            "bounds": format!("[0,0][{width},{height}]"),
        },
        "children": children
    })
    .to_string()
}

pub fn fixture_component(id: &str, [x1, y1, x2, y2]: [i64; 4]) -> Component {
    Component {
        id: id.to_owned(),
        kind: "Button".to_owned(),
        bounding_box: BoundingBox::from_corners(x1, y1, x2, y2),
        confidence: None,
        text: None,
    }
}

pub fn apply_overlay_test_env(command: &mut Command, compare_base_url: &str, log_dir: &Path) {
    command.env("COMPARE_BASE_URL", compare_base_url);
    command.env("COMPARE_TIMEOUT_MS", "2000");
    command.env("OVERLAY_CONTAINER_WIDTH", "640");
    command.env("OVERLAY_VIEWPORT_HEIGHT", "800");
    command.env("OVERLAY_DEVICE_PIXEL_RATIO", "1");
    command.env_remove("OVERLAY_STYLE_PATH");
    command.env("RUST_LOG", "error");
    command.env("OVERLAY_FILE_LOG", "error");
    command.env("OVERLAY_LOG_DIR", log_dir.as_os_str());
}
