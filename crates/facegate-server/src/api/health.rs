//! Liveness and readiness endpoints

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::error;

use crate::AppState;

pub const SERVICE_NAME: &str = "Face Recognition Service";

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub db_connected: bool,
}

/// GET /
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

/// GET /health
///
/// The embedding pipeline has no model to load, so liveness is unconditional.
pub async fn health_check() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy".to_string(),
        model_loaded: true,
    })
}

/// GET /api/face/health
pub async fn face_health(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let service = state.service.clone();
    let db_connected = match tokio::task::spawn_blocking(move || service.health()).await {
        Ok(report) => report.store_connected,
        Err(err) => {
            error!(error = %err, "store health check task failed");
            false
        }
    };

    Json(ReadinessResponse {
        status: if db_connected { "ok" } else { "degraded" }.to_string(),
        db_connected,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/face/health", get(face_health))
}
