use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use image::GenericImageView;
use layout_overlay::test_support::{
    apply_overlay_test_env, fixture_tree, remove_dir_if_exists, temp_path,
};
use serde_json::Value;

// Nothing listens on the discard port; none of these commands reach the service.
const UNUSED_SERVICE_URL: &str = "http://127.0.0.1:9";

#[test]
fn render_writes_scaled_overlays_for_both_slots() {
    let work_dir = temp_path("cli-render");
    let out_dir = work_dir.join("out");
    fs::create_dir_all(&work_dir).expect("work dir should be creatable");
    let design_path = work_dir.join("design.json");
    fs::write(
        &design_path,
        fixture_tree(1000, 2000, &[("hero", "Image", [0, 0, 1000, 600])]),
    )
    .expect("design tree should be writable");

    let design_arg = design_path.display().to_string();
    let out_arg = out_dir.display().to_string();
    let output = run_cli(
        &[
            "render",
            "--design",
            &design_arg,
            "--out-dir",
            &out_arg,
            "--container-width",
            "500",
            "--viewport-height",
            "1240",
            "--dpr",
            "2",
        ],
        &work_dir,
    );

    let design = image::open(out_dir.join("design.png"));
    let code = image::open(out_dir.join("code.png"));
    remove_dir_if_exists(&work_dir);

    assert!(
        output.status.success(),
        "render should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    // 1000x2000 at scale 0.5, doubled for the backing store.
    assert_eq!(
        design.expect("design overlay should decode").dimensions(),
        (1000, 2000)
    );
    // Empty code slot falls back to a 640x420 frame at scale 0.78125.
    assert_eq!(
        code.expect("code overlay should decode").dimensions(),
        (1000, 656)
    );
}

#[test]
fn extract_json_lists_components_and_screen() {
    let work_dir = temp_path("cli-extract");
    fs::create_dir_all(&work_dir).expect("work dir should be creatable");
    let tree_path = work_dir.join("tree.json");
    fs::write(
        &tree_path,
        fixture_tree(
            1080,
            1920,
            &[
                ("submit", "Button", [10, 20, 110, 220]),
                ("flat", "Divider", [0, 300, 1080, 300]),
            ],
        ),
    )
    .expect("tree should be writable");

    let tree_arg = tree_path.display().to_string();
    let output = run_cli(&["extract", &tree_arg, "--json"], &work_dir);
    remove_dir_if_exists(&work_dir);

    assert!(
        output.status.success(),
        "extract should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let body: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(body["screen"]["width"], 1080);
    let components = body["components"]
        .as_array()
        .expect("components should be an array");
    assert_eq!(components.len(), 1);
    assert_eq!(components[0]["id"], "submit");
    assert_eq!(components[0]["type"], "Button");
    assert_eq!(components[0]["bounding_box"]["width"], 100);
    assert_eq!(components[0]["bounding_box"]["height"], 200);
}

#[test]
fn extract_tolerates_malformed_json() {
    let work_dir = temp_path("cli-extract-malformed");
    fs::create_dir_all(&work_dir).expect("work dir should be creatable");
    let tree_path = work_dir.join("tree.json");
    fs::write(&tree_path, "{\"attributes\": ").expect("tree should be writable");

    let tree_arg = tree_path.display().to_string();
    let output = run_cli(&["extract", &tree_arg, "--json"], &work_dir);
    remove_dir_if_exists(&work_dir);

    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(body["screen"], Value::Null);
    assert_eq!(body["components"], serde_json::json!([]));
}

#[test]
fn compare_requires_both_trees_before_contacting_service() {
    let work_dir = temp_path("cli-compare-missing");
    fs::create_dir_all(&work_dir).expect("work dir should be creatable");
    let design_path = work_dir.join("design.json");
    let code_path = work_dir.join("code.json");
    fs::write(&design_path, fixture_tree(100, 100, &[])).expect("design tree should be writable");
    fs::write(&code_path, "").expect("code tree should be writable");

    let design_arg = design_path.display().to_string();
    let code_arg = code_path.display().to_string();
    let output = run_cli(
        &["compare", "--design", &design_arg, "--code", &code_arg],
        &work_dir,
    );
    remove_dir_if_exists(&work_dir);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("missing: code"),
        "expected missing-dataset error, got: {stderr}"
    );
}

#[test]
fn invalid_environment_configuration_fails_before_running() {
    let work_dir = temp_path("cli-bad-config");
    fs::create_dir_all(&work_dir).expect("work dir should be creatable");
    let tree_path = work_dir.join("tree.json");
    fs::write(&tree_path, fixture_tree(100, 100, &[])).expect("tree should be writable");

    let tree_arg = tree_path.display().to_string();
    let mut command = Command::new(bin_path());
    command.args(["extract", &tree_arg]);
    apply_overlay_test_env(&mut command, UNUSED_SERVICE_URL, &work_dir.join("logs"));
    command.env("OVERLAY_DEVICE_PIXEL_RATIO", "0");
    let output = command.output().expect("CLI command should execute");
    remove_dir_if_exists(&work_dir);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("OVERLAY_DEVICE_PIXEL_RATIO must be greater than 0"),
        "expected configuration error, got: {stderr}"
    );
}

fn run_cli(args: &[&str], work_dir: &Path) -> Output {
    let mut command = Command::new(bin_path());
    command.args(args);
    apply_overlay_test_env(&mut command, UNUSED_SERVICE_URL, &work_dir.join("logs"));
    command.output().expect("CLI command should execute")
}

fn bin_path() -> &'static str {
    env!("CARGO_BIN_EXE_layout_overlay")
}
