//! HTTP trigger for automation runs.
//!
//! The router owns an [`AppContext`] built at startup; every accepted
//! `POST /run_bot` starts one run on its own thread and returns at once.

mod handlers;
mod registry;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::device::{AdbBridge, DeviceBridge};
use crate::error::{Result, TapError};

pub use handlers::{RunBotRequest, RunListResponse, RunStarted};
pub use registry::{DEFAULT_RUN_HISTORY, RunRecord, RunRegistry, RunStatus, spawn_run};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub bridge: Arc<dyn DeviceBridge>,
    pub registry: RunRegistry,
}

impl AppContext {
    pub fn new(config: AppConfig, bridge: Arc<dyn DeviceBridge>) -> Self {
        Self {
            registry: RunRegistry::with_history(config.server.run_history),
            config: Arc::new(config),
            bridge,
        }
    }

    /// Context using the adb binary named in the configuration.
    pub fn with_adb(config: AppConfig) -> Self {
        let bridge = Arc::new(AdbBridge::new(config.automation.adb_path.clone()));
        Self::new(config, bridge)
    }
}

/// Build the router.
///
/// ```text
/// POST /run_bot    - Start a run
/// GET  /runs       - List runs
/// GET  /runs/{id}  - Get run
/// GET  /health     - Liveness
/// ```
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/run_bot", post(handlers::run_bot))
        .route("/runs", get(handlers::list_runs))
        .route("/runs/{id}", get(handlers::get_run))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Bind the listening socket.
///
/// # Errors
///
/// Returns [`TapError::WebServerFailed`] if the address cannot be bound.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|e| TapError::WebServerFailed {
            addr,
            reason: e.to_string(),
        })
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server stops on an I/O failure.
pub async fn serve(listener: TcpListener, ctx: AppContext) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_or_else(|_| "unknown".to_string(), |a| a.to_string());
    info!(%addr, "Trigger server listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TapError::WebServerFailed {
            addr,
            reason: e.to_string(),
        })?;

    info!("Trigger server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
