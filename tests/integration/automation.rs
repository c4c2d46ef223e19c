//! Integration tests for the automation run using MockBridge.
//!
//! Screens served by the mock are generated textures; templates are cut out
//! of them, so matches are exact.

use std::sync::Arc;

use image::DynamicImage;

use tapbot::automation::{AutomationRequest, AutomationRun, IconOutcome};
use tapbot::config::{AutomationConfig, Timings};
use tapbot::device::mock::{MockBridge, MockConfig, Operation};
use tapbot::device::sanitize_serial;

use crate::common::assertions::assert_safe_serial;
use crate::common::fixtures::{TestScene, crop, noise};

fn config_for(scene: &TestScene, icons: &[&str]) -> AutomationConfig {
    AutomationConfig {
        template_dir: scene.template_dir(),
        work_dir: scene.work_dir(),
        icons: icons.iter().map(|s| (*s).to_string()).collect(),
        ..AutomationConfig::default()
    }
}

fn request(serial: &str, package: &str) -> AutomationRequest {
    AutomationRequest {
        serial: serial.to_string(),
        package: package.to_string(),
        url: "https://vt.tiktok.com/ZSBHqRUCM/".to_string(),
    }
}

fn run(
    bridge: &Arc<MockBridge>,
    req: &AutomationRequest,
    config: &AutomationConfig,
) -> AutomationRun {
    AutomationRun::new(bridge.clone(), req, config)
        .unwrap()
        .with_timings(Timings::none())
}

#[test]
fn test_tap_issued_at_center_of_matched_icon() {
    let scene = TestScene::new(180, 260, 42);
    scene.add_icon("gioHang.png", 100, 200, 40, 40);

    let bridge = Arc::new(MockBridge::new().with_screens(vec![scene.screen_image()]));
    let config = config_for(&scene, &["gioHang.png"]);
    let report = run(&bridge, &request("R58W30MXC7T", ""), &config)
        .run_with_report()
        .unwrap();

    assert_eq!(bridge.taps(), vec![(120, 220)]);
    match report.icons[0].outcome {
        IconOutcome::Tapped { x, y, score } => {
            assert_eq!((x, y), (120, 220));
            assert!((score - 1.0).abs() < 1e-6, "score {score}");
        }
        IconOutcome::Missed => panic!("icon should have been tapped"),
    }
    assert!(scene.work_dir().join("debug_R58W30MXC7T.png").exists());
}

#[test]
fn test_each_icon_is_located_on_the_latest_screenshot() {
    // First screen shows only icon A; after the tap, the second screen shows
    // only icon B.
    let first = noise(120, 120, 1);
    let second = noise(120, 120, 2);

    let scene = TestScene::new(8, 8, 0);
    crop(&first, 10, 10, 20, 20)
        .save(scene.template_dir().join("a.png"))
        .unwrap();
    crop(&second, 70, 50, 24, 16)
        .save(scene.template_dir().join("b.png"))
        .unwrap();

    let bridge = Arc::new(MockBridge::new().with_screens(vec![
        DynamicImage::ImageLuma8(first),
        DynamicImage::ImageLuma8(second),
    ]));
    let config = config_for(&scene, &["a.png", "b.png"]);
    let report = run(&bridge, &request("dev", ""), &config)
        .run_with_report()
        .unwrap();

    assert_eq!(bridge.taps(), vec![(20, 20), (82, 58)]);
    assert_eq!(report.screenshots, 3);
    assert_eq!(report.taps(), 2);
}

#[test]
fn test_miss_keeps_screenshot_and_moves_on() {
    let scene = TestScene::new(100, 100, 7);
    scene.add_foreign_icon("gioHang.png", 12, 12, 900);
    scene.add_icon("moRong.png", 60, 30, 16, 16);

    let bridge = Arc::new(MockBridge::new().with_screens(vec![scene.screen_image()]));
    let config = config_for(&scene, &["gioHang.png", "moRong.png", "them.png"]);
    let report = run(&bridge, &request("dev", ""), &config)
        .run_with_report()
        .unwrap();

    assert_eq!(report.icons[0].outcome, IconOutcome::Missed);
    assert!(matches!(
        report.icons[1].outcome,
        IconOutcome::Tapped { x: 68, y: 38, .. }
    ));
    assert_eq!(report.icons[2].outcome, IconOutcome::Missed);
    // One initial capture plus one after the single tap.
    assert_eq!(bridge.pull_count(), 2);
}

#[test]
fn test_empty_package_skips_launch() {
    let scene = TestScene::new(16, 16, 3);
    let bridge = Arc::new(MockBridge::new().with_screens(vec![scene.screen_image()]));
    let config = config_for(&scene, &["missing.png"]);

    assert!(run(&bridge, &request("dev", ""), &config).run());
    assert!(
        !bridge
            .operations()
            .iter()
            .any(|op| matches!(op, Operation::LaunchApp { .. }))
    );
    assert!(matches!(bridge.operations()[0], Operation::OpenUrl { .. }));
}

#[test]
fn test_bridge_failures_do_not_fail_the_run() {
    let scene = TestScene::new(16, 16, 3);
    let bridge = Arc::new(MockBridge::new().with_config(MockConfig {
        fail_commands: true,
        ..MockConfig::default()
    }));
    let config = config_for(&scene, &["gioHang.png"]);

    let report = run(&bridge, &request("dev", "com.example"), &config)
        .run_with_report()
        .unwrap();
    assert!(report.launched);
    assert_eq!(report.taps(), 0);
}

#[test]
fn test_serial_is_sanitized_for_commands_and_files() {
    let scene = TestScene::new(16, 16, 3);
    let bridge = Arc::new(MockBridge::new().with_screens(vec![scene.screen_image()]));
    let config = config_for(&scene, &["missing.png"]);
    let raw = "192.168.1.5:5555/../x";

    let mut automation = run(&bridge, &request(raw, ""), &config);
    assert_safe_serial(automation.serial());
    assert!(automation.run());

    let expected = sanitize_serial(raw);
    assert_eq!(expected, "192.168.1.5_5555_.._x");
    for op in bridge.operations() {
        match op {
            Operation::OpenUrl { serial, .. }
            | Operation::CaptureScreen { serial, .. }
            | Operation::Pull { serial, .. } => assert_eq!(serial, expected),
            other => panic!("unexpected operation {other:?}"),
        }
    }
    assert!(
        scene
            .work_dir()
            .join(format!("screen_{expected}_1.png"))
            .exists()
    );
}

#[test]
fn test_sanitize_serial_property() {
    for raw in ["emulator-5554", "a b\tc", "ü:ß/\\*?", "", "R58W30MXC7T"] {
        assert_safe_serial(&sanitize_serial(raw));
        assert_eq!(sanitize_serial(raw).chars().count(), raw.chars().count());
    }
}
