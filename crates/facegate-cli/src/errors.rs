pub use facegate_face_core::errors::{AppError, AppResult, ErrorKind};
