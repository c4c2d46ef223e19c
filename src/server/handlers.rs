//! HTTP route handlers.
//!
//! - POST /run_bot    - Trigger an automation run
//! - GET  /runs       - List runs
//! - GET  /runs/{id}  - Get run
//! - GET  /health     - Liveness

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::AppContext;
use super::registry::{RunRecord, spawn_run};
use crate::automation::AutomationRequest;

/// Body of `POST /run_bot`. A field that is absent or `null` is missing.
#[derive(Debug, Default, Deserialize)]
pub struct RunBotRequest {
    pub device_name: Option<String>,
    pub package_name: Option<String>,
    pub video_url: Option<String>,
}

impl RunBotRequest {
    /// Convert into a run request, or name the first missing field.
    pub fn into_request(self) -> Result<AutomationRequest, &'static str> {
        match (self.device_name, self.package_name, self.video_url) {
            (Some(serial), Some(package), Some(url)) => Ok(AutomationRequest {
                serial,
                package,
                url,
            }),
            (None, _, _) => Err("device_name"),
            (_, None, _) => Err("package_name"),
            (_, _, None) => Err("video_url"),
        }
    }
}

/// Acknowledgment returned once a run is started.
#[derive(Debug, Serialize)]
pub struct RunStarted {
    pub status: &'static str,
    pub device: String,
    pub package: String,
    pub video: String,
    pub run_id: Uuid,
}

/// Response for listing runs.
#[derive(Debug, Serialize)]
pub struct RunListResponse {
    pub count: usize,
    pub runs: Vec<RunRecord>,
}

fn bad_request(message: String) -> (StatusCode, Json<serde_json::Value>) {
    warn!(%message, "Rejected run request");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// Start a run in the background and acknowledge immediately.
///
/// POST /run_bot
pub async fn run_bot(State(ctx): State<AppContext>, body: Bytes) -> impl IntoResponse {
    let parsed: RunBotRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => return bad_request(format!("Invalid JSON body: {e}")),
    };
    let request = match parsed.into_request() {
        Ok(request) => request,
        Err(field) => return bad_request(format!("Missing required field: {field}")),
    };

    info!(
        device = %request.serial,
        package = %request.package,
        video = %request.url,
        "Starting run"
    );

    let ack = (
        request.serial.clone(),
        request.package.clone(),
        request.url.clone(),
    );
    match spawn_run(
        &ctx.registry,
        ctx.bridge.clone(),
        &ctx.config.automation,
        request,
    ) {
        Ok(run_id) => {
            let (device, package, video) = ack;
            let body = RunStarted {
                status: "started",
                device,
                package,
                video,
                run_id,
            };
            (StatusCode::OK, Json(json!(body)))
        }
        Err(e) => {
            error!(error = %e, "Failed to start run thread");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

/// List all runs.
///
/// GET /runs
pub async fn list_runs(State(ctx): State<AppContext>) -> impl IntoResponse {
    let runs = ctx.registry.list();
    Json(json!(RunListResponse {
        count: runs.len(),
        runs,
    }))
}

/// Get a run by id.
///
/// GET /runs/{id}
pub async fn get_run(State(ctx): State<AppContext>, Path(id): Path<String>) -> impl IntoResponse {
    let record = Uuid::parse_str(&id).ok().and_then(|id| ctx.registry.get(id));
    match record {
        Some(record) => (StatusCode::OK, Json(json!(record))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Run '{id}' not found") })),
        ),
    }
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
