use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use image::ImageError;
use thiserror::Error;

/// Who is responsible for a failure: the caller's input, or the service itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ClientInput,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid identity: {message}")]
    InvalidIdentity { message: String },

    #[error("invalid image payload: {message}")]
    InvalidPayload { message: String },

    #[error("failed to decode image: {source}")]
    ImageDecode {
        #[source]
        source: ImageError,
    },

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("input file not found or unreadable: {path}")]
    MissingInput { path: PathBuf },

    #[error("embedding dimensions don't match: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("failed to read fingerprint store {path}: {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write fingerprint store {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fingerprint file {path} is invalid: {message}")]
    InvalidStoreFile { path: PathBuf, message: String },

    #[error("fingerprint store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidIdentity { .. }
            | AppError::InvalidPayload { .. }
            | AppError::ImageDecode { .. }
            | AppError::EmptyImage { .. }
            | AppError::MissingInput { .. } => ErrorKind::ClientInput,
            _ => ErrorKind::Internal,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::ClientInput
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            AppError::ConfigRead { .. }
            | AppError::ConfigParse { .. }
            | AppError::InvalidConfig(_) => ExitCode::from(3),
            err if err.is_client_error() => ExitCode::from(2),
            _ => ExitCode::from(1),
        }
    }

    pub fn human_message(&self) -> String {
        self.to_string()
    }
}

pub type AppResult<T> = Result<T, AppError>;
