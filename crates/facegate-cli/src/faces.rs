use std::fs;
use std::io;
use std::path::Path;

use facegate_config::{load_resolved_config, ResolvedConfig};
use facegate_face_core::faces::encode_image_payload;
use facegate_face_core::runtime::build_service;
use tracing::debug;

pub use facegate_face_core::faces::{EnrollmentOutcome, VerificationOutcome};

use crate::cli::FaceArgs;
use crate::errors::{AppError, AppResult};

const PAYLOAD_TEXT_EXTENSIONS: [&str; 2] = ["b64", "txt"];

pub fn run_enroll(args: &FaceArgs) -> AppResult<EnrollmentOutcome> {
    let config = resolve_config(args)?;
    let payload = read_image_payload(&args.image)?;
    let service = build_service(&config)?;
    service.enroll(&args.user, &payload)
}

pub fn run_verify(args: &FaceArgs) -> AppResult<VerificationOutcome> {
    let config = resolve_config(args)?;
    let payload = read_image_payload(&args.image)?;
    let service = build_service(&config)?;
    service.verify(&args.user, &payload)
}

/// Config file, then `FACEGATE_STORE_DIR`, then `--store-dir`.
pub fn resolve_config(args: &FaceArgs) -> AppResult<ResolvedConfig> {
    let loaded = load_resolved_config(args.config.as_deref())?;
    match &loaded.source {
        Some(source) => debug!(path = %source.display(), "loaded configuration"),
        None => debug!("no configuration file found; using defaults"),
    }
    Ok(loaded.resolved.with_store_dir_override(args.store_dir.clone()))
}

/// Raw image files are base64-encoded; `.b64`/`.txt` files already hold payload text.
pub fn read_image_payload(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => AppError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => AppError::Io(err),
    })?;

    let is_payload_text = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PAYLOAD_TEXT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false);

    if is_payload_text {
        String::from_utf8(bytes).map_err(|_| AppError::InvalidPayload {
            message: format!("{} is not UTF-8 text", path.display()),
        })
    } else {
        Ok(encode_image_payload(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn raw_files_are_base64_encoded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("face.png");
        fs::write(&path, b"ABC").unwrap();
        assert_eq!(read_image_payload(&path).unwrap(), "QUJD");
    }

    #[test]
    fn payload_text_files_are_passed_through() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("face.B64");
        fs::write(&path, "data:image/png;base64,QUJD\n").unwrap();
        assert_eq!(
            read_image_payload(&path).unwrap(),
            "data:image/png;base64,QUJD\n"
        );
    }

    #[test]
    fn missing_image_is_a_client_error() {
        let tmp = TempDir::new().unwrap();
        let err = read_image_payload(&tmp.path().join("absent.png")).unwrap_err();
        assert!(matches!(err, AppError::MissingInput { .. }));
        assert!(err.is_client_error());
    }
}
