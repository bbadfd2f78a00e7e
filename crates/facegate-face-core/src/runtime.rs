use facegate_config::{ConfigError, ResolvedConfig, StoreBackend};
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};
use crate::faces::{
    FaceService, FilesystemFingerprintStore, FingerprintStore, InMemoryFingerprintStore,
    MatchSettings,
};

pub type SharedFaceService = FaceService<Box<dyn FingerprintStore>>;

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Read { path, source } => AppError::ConfigRead { path, source },
            ConfigError::Parse { path, message } => AppError::ConfigParse { path, message },
            ConfigError::Invalid { key, message } => {
                AppError::InvalidConfig(format!("{key}: {message}"))
            }
        }
    }
}

impl TryFrom<&ResolvedConfig> for MatchSettings {
    type Error = AppError;

    fn try_from(config: &ResolvedConfig) -> AppResult<Self> {
        MatchSettings::new(config.match_threshold, config.image_size)
    }
}

pub fn open_store(config: &ResolvedConfig) -> AppResult<Box<dyn FingerprintStore>> {
    match config.store_backend {
        StoreBackend::Filesystem => {
            let store = FilesystemFingerprintStore::open(&config.store_dir)?;
            info!(dir = %config.store_dir.display(), "opened filesystem fingerprint store");
            Ok(Box::new(store))
        }
        StoreBackend::Memory => {
            warn!("using in-memory fingerprint store; enrollments are lost on exit");
            Ok(Box::new(InMemoryFingerprintStore::new()))
        }
    }
}

pub fn build_service(config: &ResolvedConfig) -> AppResult<SharedFaceService> {
    let settings = MatchSettings::try_from(config)?;
    let store = open_store(config)?;
    Ok(FaceService::new(settings, store))
}
