//! Integration tests for the HTTP trigger.
//!
//! Requests go through the router with `tower::ServiceExt::oneshot`; runs
//! execute against `MockBridge` with no settle delays.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use tapbot::config::{AppConfig, AutomationConfig};
use tapbot::device::mock::{MockBridge, Operation};
use tapbot::server::{AppContext, RunStatus, router};

use crate::common::fixtures::TestScene;

fn test_config(scene: &TestScene) -> AppConfig {
    AppConfig {
        automation: AutomationConfig {
            template_dir: scene.template_dir(),
            work_dir: scene.work_dir(),
            icons: vec!["gioHang.png".to_string()],
            launch_wait_ms: 0,
            open_wait_ms: 0,
            tap_wait_ms: 0,
            ..AutomationConfig::default()
        },
        ..AppConfig::default()
    }
}

fn context(scene: &TestScene, bridge: Arc<MockBridge>) -> AppContext {
    AppContext::new(test_config(scene), bridge)
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/run_bot")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_until_finished(ctx: &AppContext, id: uuid::Uuid) -> RunStatus {
    for _ in 0..200 {
        if let Some(record) = ctx.registry.get(id)
            && record.status != RunStatus::Running
        {
            return record.status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {id} did not finish");
}

#[tokio::test]
async fn test_missing_field_returns_400_and_starts_nothing() {
    let scene = TestScene::new(32, 32, 1);
    let bridge = Arc::new(MockBridge::new());
    let ctx = context(&scene, bridge.clone());

    let response = router(ctx.clone())
        .oneshot(post_json(r#"{"device_name":"R58W30MXC7T","package_name":""}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Missing required field: video_url");
    assert!(ctx.registry.is_empty());
    assert!(bridge.operations().is_empty());
}

#[tokio::test]
async fn test_invalid_json_returns_400() {
    let scene = TestScene::new(32, 32, 1);
    let ctx = context(&scene, Arc::new(MockBridge::new()));

    let response = router(ctx.clone())
        .oneshot(post_json("device_name=R58"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.registry.is_empty());
}

#[tokio::test]
async fn test_valid_request_is_acknowledged_and_runs() {
    let scene = TestScene::new(32, 32, 1);
    let bridge = Arc::new(MockBridge::new().with_screens(vec![scene.screen_image()]));
    let ctx = context(&scene, bridge.clone());

    let body = json!({
        "device_name": "R58W30MXC7T",
        "package_name": "com.zhiliaoapp.musically",
        "video_url": "https://vt.tiktok.com/ZSBHqRUCM/",
    });
    let response = router(ctx.clone())
        .oneshot(post_json(&body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "started");
    assert_eq!(json["device"], "R58W30MXC7T");
    assert_eq!(json["package"], "com.zhiliaoapp.musically");
    assert_eq!(json["video"], "https://vt.tiktok.com/ZSBHqRUCM/");
    assert_eq!(ctx.registry.len(), 1);

    let id: uuid::Uuid = json["run_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(wait_until_finished(&ctx, id).await, RunStatus::Succeeded);
    assert!(bridge.operations().contains(&Operation::LaunchApp {
        serial: "R58W30MXC7T".to_string(),
        package: "com.zhiliaoapp.musically".to_string(),
    }));
}

#[tokio::test]
async fn test_concurrent_requests_each_get_a_run() {
    let scene = TestScene::new(32, 32, 1);
    let bridge = Arc::new(MockBridge::new().with_screens(vec![scene.screen_image()]));
    let ctx = context(&scene, bridge);
    let app = router(ctx.clone());

    let mut ids = Vec::new();
    for serial in ["dev-a", "dev-b", "dev-c"] {
        let body = json!({ "device_name": serial, "package_name": "", "video_url": "u" });
        let response = app
            .clone()
            .oneshot(post_json(&body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        ids.push(body_json(response).await["run_id"].as_str().unwrap().to_string());
    }

    assert_eq!(ctx.registry.len(), 3);
    for id in &ids {
        wait_until_finished(&ctx, id.parse().unwrap()).await;
    }

    let response = app.oneshot(get("/runs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 3);
    let devices: Vec<&str> = json["runs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["device"].as_str().unwrap())
        .collect();
    for serial in ["dev-a", "dev-b", "dev-c"] {
        assert!(devices.contains(&serial));
    }
}

#[tokio::test]
async fn test_failed_run_is_recorded() {
    let scene = TestScene::new(32, 32, 1);
    // A file where the work directory should be makes every screenshot fail.
    let blocker = TempDir::new().unwrap();
    let file = blocker.path().join("not-a-dir");
    std::fs::write(&file, "x").unwrap();
    let mut config = test_config(&scene);
    config.automation.work_dir = file;
    let ctx = AppContext::new(config, Arc::new(MockBridge::new()));

    let body = json!({ "device_name": "dev", "package_name": "", "video_url": "u" });
    let response = router(ctx.clone())
        .oneshot(post_json(&body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let id = body_json(response).await["run_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(wait_until_finished(&ctx, id).await, RunStatus::Failed);
}

#[tokio::test]
async fn test_get_run_by_id() {
    let scene = TestScene::new(32, 32, 1);
    let ctx = context(&scene, Arc::new(MockBridge::new()));
    let app = router(ctx.clone());

    let response = app
        .clone()
        .oneshot(get("/runs/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get(&format!("/runs/{}", uuid::Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json!({ "device_name": "dev", "package_name": "", "video_url": "u" });
    let response = app
        .clone()
        .oneshot(post_json(&body.to_string()))
        .await
        .unwrap();
    let id = body_json(response).await["run_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.oneshot(get(&format!("/runs/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["device"], "dev");
}

#[tokio::test]
async fn test_health() {
    let scene = TestScene::new(8, 8, 1);
    let response = router(context(&scene, Arc::new(MockBridge::new())))
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_run_bot_rejects_get() {
    let scene = TestScene::new(8, 8, 1);
    let response = router(context(&scene, Arc::new(MockBridge::new())))
        .oneshot(get("/run_bot"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
