use std::fs;
use std::path::{Path, PathBuf};

use facegate_config::{
    self, config_paths, ConfigError, ResolvedConfig, ResolvedConfigWithSource, StoreBackend,
    STORE_DIR_ENV,
};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::cli::DoctorArgs;
use crate::errors::AppResult;

const CHECK_CONFIG: &str = "config";
const CHECK_MATCHING: &str = "matching";
const CHECK_STORE: &str = "fingerprint_store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorOutcome {
    pub ok: bool,
    pub checks: Vec<DoctorCheck>,
}

#[derive(Debug, Clone)]
pub struct DoctorContext {
    pub config_paths: Vec<PathBuf>,
    pub store_dir_override: Option<PathBuf>,
    pub fallback_config: ResolvedConfig,
}

impl DoctorContext {
    pub fn from_args(args: &DoctorArgs) -> Self {
        Self {
            config_paths: config_paths(args.config.as_deref()),
            store_dir_override: std::env::var_os(STORE_DIR_ENV).map(PathBuf::from),
            fallback_config: ResolvedConfig::default(),
        }
    }
}

pub fn run_doctor(args: &DoctorArgs) -> AppResult<DoctorOutcome> {
    run_doctor_with(&DoctorContext::from_args(args))
}

/// Warnings do not fail the run; only `Fail` checks do.
pub fn run_doctor_with(ctx: &DoctorContext) -> AppResult<DoctorOutcome> {
    let (config_check, loaded) = check_config(&ctx.config_paths, &ctx.fallback_config);
    let resolved = loaded
        .resolved
        .with_store_dir_override(ctx.store_dir_override.clone());

    let checks = vec![
        config_check,
        check_matching(&resolved),
        check_store(&resolved),
    ];
    let ok = checks.iter().all(|c| c.status != CheckStatus::Fail);

    Ok(DoctorOutcome { ok, checks })
}

fn check_config(
    paths: &[PathBuf],
    fallback: &ResolvedConfig,
) -> (DoctorCheck, ResolvedConfigWithSource) {
    let fallback_entry = || ResolvedConfigWithSource {
        resolved: fallback.clone(),
        source: None,
    };

    match facegate_config::load_resolved_from_paths(paths) {
        Ok(loaded) => match loaded.source.clone() {
            Some(source) => (
                DoctorCheck {
                    name: CHECK_CONFIG.into(),
                    status: CheckStatus::Pass,
                    message: format!("Loaded config from {}", source.display()),
                    path: Some(source.display().to_string()),
                },
                loaded,
            ),
            None => (
                DoctorCheck {
                    name: CHECK_CONFIG.into(),
                    status: CheckStatus::Warn,
                    message: format!(
                        "Config file missing; using built-in defaults (tried {})",
                        display_paths(paths)
                    ),
                    path: None,
                },
                loaded,
            ),
        },
        Err(ConfigError::Parse { path, message }) => (
            DoctorCheck {
                name: CHECK_CONFIG.into(),
                status: CheckStatus::Fail,
                message: format!("Failed to parse {}: {}", path.display(), message),
                path: Some(path.display().to_string()),
            },
            fallback_entry(),
        ),
        Err(ConfigError::Read { path, source }) => (
            DoctorCheck {
                name: CHECK_CONFIG.into(),
                status: CheckStatus::Fail,
                message: format!("Failed to read {}: {}", path.display(), source),
                path: Some(path.display().to_string()),
            },
            fallback_entry(),
        ),
        Err(err @ ConfigError::Invalid { .. }) => (
            DoctorCheck {
                name: CHECK_CONFIG.into(),
                status: CheckStatus::Fail,
                message: err.to_string(),
                path: None,
            },
            fallback_entry(),
        ),
    }
}

fn check_matching(cfg: &ResolvedConfig) -> DoctorCheck {
    DoctorCheck {
        name: CHECK_MATCHING.into(),
        status: CheckStatus::Pass,
        message: format!(
            "Match threshold {} over {}x{} grids ({} values per embedding)",
            cfg.match_threshold,
            cfg.image_size,
            cfg.image_size,
            cfg.embedding_len()
        ),
        path: None,
    }
}

fn check_store(cfg: &ResolvedConfig) -> DoctorCheck {
    if cfg.store_backend == StoreBackend::Memory {
        return DoctorCheck {
            name: CHECK_STORE.into(),
            status: CheckStatus::Warn,
            message: "In-memory store configured; enrollments do not survive restarts".into(),
            path: None,
        };
    }

    let path = &cfg.store_dir;
    let fail = |message: String| DoctorCheck {
        name: CHECK_STORE.into(),
        status: CheckStatus::Fail,
        message,
        path: Some(path.display().to_string()),
    };

    match (path.exists(), path.is_dir()) {
        (false, _) => fail(format!(
            "Fingerprint store {} missing (created on first enrollment)",
            path.display()
        )),
        (true, false) => fail(format!(
            "Fingerprint store {} is not a directory",
            path.display()
        )),
        (true, true) => {
            let entries = fs::read_dir(path).ok().map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            });
            let writeable = is_writeable_dir(path);
            match (entries, writeable) {
                (Some(count), true) => DoctorCheck {
                    name: CHECK_STORE.into(),
                    status: CheckStatus::Pass,
                    message: format!(
                        "Fingerprint store {} is readable/writable ({} fingerprint(s))",
                        path.display(),
                        count
                    ),
                    path: Some(path.display().to_string()),
                },
                (readable, writeable) => fail(format!(
                    "Fingerprint store {} lacks {} permissions",
                    path.display(),
                    match (readable.is_some(), writeable) {
                        (false, false) => "read/write",
                        (false, true) => "read",
                        _ => "write",
                    }
                )),
            }
        }
    }
}

fn is_writeable_dir(path: &Path) -> bool {
    NamedTempFile::new_in(path).is_ok()
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
