use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const PRIMARY_CONFIG_PATH: &str = "/etc/facegate/config.toml";
pub const SECONDARY_CONFIG_PATH: &str = "/usr/local/etc/facegate/config.toml";
pub const STORE_DIR_ENV: &str = "FACEGATE_STORE_DIR";
pub const DEFAULT_MATCH_THRESHOLD: f64 = 25.0;
pub const DEFAULT_IMAGE_SIZE: u32 = 64;
/// Largest accepted grid side; embeddings stay at or below one million values.
pub const MAX_IMAGE_SIZE: u32 = 1024;
pub const DEFAULT_STORE_DIR: &str = "/var/lib/facegate/fingerprints";
pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 8001;
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:8080"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Filesystem,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Filesystem => "filesystem",
            StoreBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub match_threshold: Option<f64>,
    pub image_size: Option<u32>,
    pub store_backend: Option<StoreBackend>,
    pub store_dir: Option<PathBuf>,
    pub listen_host: Option<String>,
    pub listen_port: Option<u16>,
    pub allowed_origins: Option<Vec<String>>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub match_threshold: f64,
    pub image_size: u32,
    pub store_backend: StoreBackend,
    pub store_dir: PathBuf,
    pub listen_host: String,
    pub listen_port: u16,
    pub allowed_origins: Vec<String>,
    /// Request body ceiling for the HTTP surface.
    pub max_body_bytes: usize,
}

impl ResolvedConfig {
    pub fn from_raw(raw: ConfigFile) -> Result<Self, ConfigError> {
        let match_threshold = raw.match_threshold.unwrap_or(DEFAULT_MATCH_THRESHOLD);
        if !match_threshold.is_finite() || match_threshold <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "match_threshold",
                message: format!("must be a positive number, found {match_threshold}"),
            });
        }

        let image_size = raw.image_size.unwrap_or(DEFAULT_IMAGE_SIZE);
        if image_size == 0 || image_size > MAX_IMAGE_SIZE {
            return Err(ConfigError::Invalid {
                key: "image_size",
                message: format!("must be between 1 and {MAX_IMAGE_SIZE}, found {image_size}"),
            });
        }

        let max_body_bytes = raw.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        if max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_body_bytes",
                message: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            match_threshold,
            image_size,
            store_backend: raw.store_backend.unwrap_or_default(),
            store_dir: raw
                .store_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
            listen_host: raw
                .listen_host
                .unwrap_or_else(|| DEFAULT_LISTEN_HOST.to_string()),
            listen_port: raw.listen_port.unwrap_or(DEFAULT_LISTEN_PORT),
            allowed_origins: raw.allowed_origins.unwrap_or_else(|| {
                DEFAULT_ALLOWED_ORIGINS
                    .iter()
                    .map(|origin| origin.to_string())
                    .collect()
            }),
            max_body_bytes,
        })
    }

    /// Replaces `store_dir` when an override is present.
    pub fn with_store_dir_override(mut self, store_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = store_dir {
            self.store_dir = dir;
        }
        self
    }

    /// Length of every embedding produced under this configuration.
    pub fn embedding_len(&self) -> usize {
        let side = self.image_size as usize;
        side * side
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            image_size: DEFAULT_IMAGE_SIZE,
            store_backend: StoreBackend::Filesystem,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            listen_host: DEFAULT_LISTEN_HOST.to_string(),
            listen_port: DEFAULT_LISTEN_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| origin.to_string())
                .collect(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub contents: ConfigFile,
    pub source: PathBuf,
}

impl LoadedConfig {
    pub fn new(contents: ConfigFile, source: PathBuf) -> Self {
        Self { contents, source }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfigWithSource {
    pub resolved: ResolvedConfig,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

pub fn default_config_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(PRIMARY_CONFIG_PATH),
        PathBuf::from(SECONDARY_CONFIG_PATH),
    ]
}

/// Search list for a binary: an explicit `--config` path replaces the defaults.
pub fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => default_config_paths(),
    }
}

pub fn load_resolved_config(explicit: Option<&Path>) -> Result<ResolvedConfigWithSource, ConfigError> {
    let resolved = load_resolved_from_paths(&config_paths(explicit))?;
    let env_dir = env::var_os(STORE_DIR_ENV).map(PathBuf::from);
    Ok(ResolvedConfigWithSource {
        resolved: resolved.resolved.with_store_dir_override(env_dir),
        source: resolved.source,
    })
}

pub fn load_from_paths(paths: &[PathBuf]) -> Result<Option<LoadedConfig>, ConfigError> {
    for path in paths {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let parsed =
                    toml::from_str::<ConfigFile>(&contents).map_err(|err| ConfigError::Parse {
                        path: path.clone(),
                        message: err.to_string(),
                    })?;
                return Ok(Some(LoadedConfig::new(parsed, path.clone())));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(ConfigError::Read {
                    path: path.clone(),
                    source: err,
                })
            }
        }
    }

    Ok(None)
}

pub fn load_resolved_from_paths(
    paths: &[PathBuf],
) -> Result<ResolvedConfigWithSource, ConfigError> {
    match load_from_paths(paths)? {
        Some(entry) => Ok(ResolvedConfigWithSource {
            resolved: ResolvedConfig::from_raw(entry.contents)?,
            source: Some(entry.source),
        }),
        None => Ok(ResolvedConfigWithSource {
            resolved: ResolvedConfig::default(),
            source: None,
        }),
    }
}
