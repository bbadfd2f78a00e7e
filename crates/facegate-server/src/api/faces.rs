//! Enroll and verify endpoints

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use facegate_face_core::errors::AppResult;
use facegate_face_core::runtime::SharedFaceService;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, Operation};
use crate::AppState;

pub const ENROLL_MESSAGE: &str = "Face enrolled successfully";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRequest {
    pub user_id: String,
    pub image_base64: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub success: bool,
    pub message: String,
    pub embedding_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    #[serde(rename = "match")]
    pub matched: bool,
    pub confidence: f64,
    pub auto_enrolled: bool,
    pub message: String,
}

/// POST /api/face/enroll
pub async fn enroll_face(
    State(state): State<AppState>,
    body: Result<Json<FaceRequest>, JsonRejection>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let request = accept(body)?;
    let outcome = run_blocking(&state, Operation::Enrollment, move |service| {
        service.enroll(&request.user_id, &request.image_base64)
    })
    .await?;

    Ok(Json(EnrollResponse {
        success: true,
        message: ENROLL_MESSAGE.to_string(),
        embedding_id: outcome.fingerprint_id,
    }))
}

/// POST /api/face/verify
///
/// The first verification for an identity enrolls the submitted face.
pub async fn verify_face(
    State(state): State<AppState>,
    body: Result<Json<FaceRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let request = accept(body)?;
    let outcome = run_blocking(&state, Operation::Verification, move |service| {
        service.verify(&request.user_id, &request.image_base64)
    })
    .await?;

    Ok(Json(VerifyResponse {
        matched: outcome.matched,
        confidence: outcome.confidence,
        auto_enrolled: outcome.auto_enrolled,
        message: outcome.message,
    }))
}

fn accept(body: Result<Json<FaceRequest>, JsonRejection>) -> Result<FaceRequest, ApiError> {
    match body {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => Err(ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }),
    }
}

/// Decoding, embedding and store I/O block, so they run off the async workers.
async fn run_blocking<T, F>(state: &AppState, operation: Operation, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SharedFaceService) -> AppResult<T> + Send + 'static,
{
    let service = Arc::clone(&state.service);
    tokio::task::spawn_blocking(move || work(&service))
        .await
        .map_err(|err| ApiError::worker(operation, err))?
        .map_err(|err| ApiError::core(operation, err))
}
