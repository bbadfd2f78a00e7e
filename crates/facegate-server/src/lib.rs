//! HTTP boundary for face enrollment and verification.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use facegate_config::DEFAULT_MAX_BODY_BYTES;
use facegate_face_core::runtime::SharedFaceService;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SharedFaceService>,
    pub allowed_origins: Arc<Vec<String>>,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(service: SharedFaceService, allowed_origins: Vec<String>) -> Self {
        Self {
            service: Arc::new(service),
            allowed_origins: Arc::new(allowed_origins),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let cors = cors_layer(&state.allowed_origins);
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);

    Router::new()
        .route("/", get(api::service_info))
        .route("/api/face/enroll", post(api::enroll_face))
        .route("/api/face/verify", post(api::verify_face))
        .merge(api::health_routes())
        .with_state(state)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Any method and header from the listed origins. A `*` entry allows every origin,
/// without credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    if origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin = %origin, error = %err, "skipping invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(parsed))
        .allow_credentials(true)
}
