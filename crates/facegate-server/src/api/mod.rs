//! HTTP API handlers

pub mod error;
pub mod faces;
pub mod health;

pub use error::{ApiError, Operation};
pub use faces::{enroll_face, verify_face};
pub use health::{health_routes, service_info};
