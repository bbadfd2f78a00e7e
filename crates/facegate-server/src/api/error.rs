use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facegate_face_core::errors::AppError;
use serde_json::json;
use tokio::task::JoinError;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Enrollment,
    Verification,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Enrollment => "enrollment",
            Operation::Verification => "verification",
        }
    }
}

/// Failures of a face operation; internal causes are logged and never sent to the client.
#[derive(Debug)]
pub enum ApiError {
    /// The request body never reached the core (bad JSON, wrong content type, missing field).
    Rejected { status: StatusCode, detail: String },
    Core {
        operation: Operation,
        source: AppError,
    },
    Worker {
        operation: Operation,
        source: JoinError,
    },
}

impl ApiError {
    pub fn core(operation: Operation, source: AppError) -> Self {
        ApiError::Core { operation, source }
    }

    pub fn worker(operation: Operation, source: JoinError) -> Self {
        ApiError::Worker { operation, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejected { status, .. } => *status,
            ApiError::Core { source, .. } if source.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Core { .. } | ApiError::Worker { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::Rejected { detail, .. } => detail,
            ApiError::Core { operation, source } if source.is_client_error() => {
                info!(operation = operation.as_str(), error = %source, "rejected face request");
                source.to_string()
            }
            ApiError::Core { operation, source } => {
                error!(operation = operation.as_str(), error = %source, "face {} failed", operation.as_str());
                internal_detail(operation)
            }
            ApiError::Worker { operation, source } => {
                error!(operation = operation.as_str(), error = %source, "face worker task failed");
                internal_detail(operation)
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

fn internal_detail(operation: Operation) -> String {
    format!("Internal server error during face {}", operation.as_str())
}
