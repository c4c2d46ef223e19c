//! Robot-mode end-to-end tests.

use serde_json::Value;

use crate::common::assertions::assert_json_has_fields;
use crate::common::cli::CliRunner;
use crate::common::fixtures::{TestConfig, TestScene};
use crate::common::init_test_logging;

fn parse_json(text: &str) -> Value {
    serde_json::from_str(text)
        .unwrap_or_else(|_| panic!("Failed to parse JSON:\n{text}"))
}

#[test]
fn robot_quick_start_outputs_json() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["--robot"]);
    result.assert_success();

    let json = parse_json(result.stdout.trim());
    assert_eq!(json.get("tool").and_then(|v| v.as_str()), Some("tapbot"));
    assert!(json.get("automation").is_some());
    assert!(json.get("ledger").is_some());
    assert!(json.get("output_modes").is_some());
}

#[test]
fn robot_format_flag_outputs_json() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["version", "--format=json"]);
    result.assert_success();

    let json = assert_json_has_fields(result.stdout.trim(), &["version", "git_sha", "build_time"]);
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn robot_locate_reports_center() {
    init_test_logging();
    let scene = TestScene::new(120, 90, 4);
    let template = scene.add_icon("icon.png", 50, 30, 20, 16);
    let debug_out = scene.work_dir().join("debug.png");

    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run_robot(&[
        "locate",
        scene.screen_path().to_str().unwrap(),
        template.to_str().unwrap(),
        "--threshold",
        "0.9",
        "--debug-out",
        debug_out.to_str().unwrap(),
    ]);
    result
        .assert_success()
        .assert_json_field("/found", &Value::Bool(true))
        .assert_json_field("/center", &serde_json::json!([60, 38]))
        .assert_json_field("/match/x", &serde_json::json!(50))
        .assert_json_field_exists("/debug_image");
    assert!(debug_out.exists());
}

#[test]
fn robot_locate_miss_is_not_an_error() {
    init_test_logging();
    let scene = TestScene::new(64, 64, 4);
    let template = scene.add_foreign_icon("other.png", 10, 10, 321);

    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run_robot(&[
        "locate",
        scene.screen_path().to_str().unwrap(),
        template.to_str().unwrap(),
    ]);
    result.assert_success();

    let json = parse_json(result.stdout.trim());
    assert_eq!(json["found"], false);
    assert!(json.get("center").is_none());
}

#[test]
fn robot_locate_missing_image_is_error_json_on_stderr() {
    init_test_logging();
    let scene = TestScene::new(16, 16, 4);
    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run_robot(&[
        "locate",
        scene.screen_path().to_str().unwrap(),
        "/nonexistent/icon.png",
        "--threshold",
        "0.8",
    ]);
    result.assert_failure().assert_stdout_is_empty();

    let json = parse_json(result.stderr.trim());
    assert_eq!(json.get("error").and_then(Value::as_bool), Some(true));
    assert!(json.get("message").is_some());
    assert!(json.get("suggestion").is_some());
}

#[test]
fn robot_error_for_missing_config_file() {
    init_test_logging();
    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run_robot(&["--config", "/nonexistent/tapbot.toml", "config"]);
    result.assert_failure();

    let json = parse_json(result.stderr.trim());
    assert_eq!(json["error"], true);
    assert_eq!(json["recoverable"], true);
    assert_eq!(json["suggestion"], "Create tapbot.toml or pass --config");
}

#[test]
fn robot_config_shows_source_and_values() {
    init_test_logging();
    let config = TestConfig::toml("[server]\nport = 5123\n");
    let cli = CliRunner::new()
        .with_env("RUST_LOG", "off")
        .with_config(&config.config_path);
    let result = cli.run_robot(&["config"]);
    result
        .assert_success()
        .assert_json_field("/config/server/port", &serde_json::json!(5123))
        .assert_json_field("/config/automation/threshold", &serde_json::json!(0.8))
        .assert_json_field_exists("/source");
}

#[test]
fn robot_locate_unwritable_debug_out_is_error() {
    init_test_logging();
    let scene = TestScene::new(80, 60, 4);
    let template = scene.add_icon("icon.png", 20, 10, 16, 12);
    let debug_out = scene.work_dir().join("missing-dir").join("debug.png");

    let cli = CliRunner::new().with_env("RUST_LOG", "off");
    let result = cli.run_robot(&[
        "locate",
        scene.screen_path().to_str().unwrap(),
        template.to_str().unwrap(),
        "--debug-out",
        debug_out.to_str().unwrap(),
    ]);
    result.assert_failure().assert_stdout_is_empty();

    let json = parse_json(result.stderr.trim());
    assert_eq!(json["error"], true);
    assert!(json["message"].as_str().unwrap().contains("debug.png"));
    assert!(!debug_out.exists());
}
