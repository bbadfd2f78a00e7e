use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

const LOCK_STRIPES: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    pub id: String,
    pub identity: String,
    pub vector: Vec<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Fingerprint {
    fn new(identity: &str, vector: &[f64]) -> Self {
        let now = timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            vector: vector.to_vec(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    fn replace_vector(&mut self, vector: &[f64]) {
        self.vector = vector.to_vec();
        self.updated_at = timestamp();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Created(Fingerprint),
    Updated(Fingerprint),
}

impl UpsertOutcome {
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            UpsertOutcome::Created(fp) | UpsertOutcome::Updated(fp) => fp,
        }
    }

    pub fn into_fingerprint(self) -> Fingerprint {
        match self {
            UpsertOutcome::Created(fp) | UpsertOutcome::Updated(fp) => fp,
        }
    }

    pub fn created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Fingerprint),
    /// Another writer got there first; its fingerprint is returned untouched.
    Existing(Fingerprint),
}

/// Persists at most one fingerprint per identity.
///
/// `upsert` and `insert_if_absent` are atomic per identity: concurrent writers for the
/// same identity are serialized and readers never observe a partially written record.
pub trait FingerprintStore: Send + Sync {
    fn get(&self, identity: &str) -> AppResult<Option<Fingerprint>>;
    fn upsert(&self, identity: &str, vector: &[f64]) -> AppResult<UpsertOutcome>;
    fn insert_if_absent(&self, identity: &str, vector: &[f64]) -> AppResult<InsertOutcome>;
    fn ping(&self) -> AppResult<()>;
}

impl<S: FingerprintStore + ?Sized> FingerprintStore for Box<S> {
    fn get(&self, identity: &str) -> AppResult<Option<Fingerprint>> {
        (**self).get(identity)
    }

    fn upsert(&self, identity: &str, vector: &[f64]) -> AppResult<UpsertOutcome> {
        (**self).upsert(identity, vector)
    }

    fn insert_if_absent(&self, identity: &str, vector: &[f64]) -> AppResult<InsertOutcome> {
        (**self).insert_if_absent(identity, vector)
    }

    fn ping(&self) -> AppResult<()> {
        (**self).ping()
    }
}

impl<S: FingerprintStore + ?Sized> FingerprintStore for Arc<S> {
    fn get(&self, identity: &str) -> AppResult<Option<Fingerprint>> {
        (**self).get(identity)
    }

    fn upsert(&self, identity: &str, vector: &[f64]) -> AppResult<UpsertOutcome> {
        (**self).upsert(identity, vector)
    }

    fn insert_if_absent(&self, identity: &str, vector: &[f64]) -> AppResult<InsertOutcome> {
        (**self).insert_if_absent(identity, vector)
    }

    fn ping(&self) -> AppResult<()> {
        (**self).ping()
    }
}

/// One JSON file per identity, named by the SHA-256 of the identity.
#[derive(Debug)]
pub struct FilesystemFingerprintStore {
    dir: PathBuf,
    stripes: [Mutex<()>; LOCK_STRIPES],
}

impl FilesystemFingerprintStore {
    pub fn open(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| AppError::StoreWrite {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            stripes: std::array::from_fn(|_| Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fingerprint_path(&self, identity: &str) -> PathBuf {
        self.dir
            .join(format!("{:x}.json", Sha256::digest(identity.as_bytes())))
    }

    fn lock(&self, identity: &str) -> MutexGuard<'_, ()> {
        let digest = Sha256::digest(identity.as_bytes());
        let stripe = usize::from(digest[0]) % LOCK_STRIPES;
        self.stripes[stripe]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl FingerprintStore for FilesystemFingerprintStore {
    fn get(&self, identity: &str) -> AppResult<Option<Fingerprint>> {
        read_fingerprint(&self.fingerprint_path(identity), identity)
    }

    fn upsert(&self, identity: &str, vector: &[f64]) -> AppResult<UpsertOutcome> {
        let path = self.fingerprint_path(identity);
        let _guard = self.lock(identity);

        let outcome = match read_fingerprint(&path, identity)? {
            Some(mut existing) => {
                existing.replace_vector(vector);
                UpsertOutcome::Updated(existing)
            }
            None => UpsertOutcome::Created(Fingerprint::new(identity, vector)),
        };
        write_fingerprint(&path, outcome.fingerprint())?;

        info!(
            identity,
            fingerprint_id = %outcome.fingerprint().id,
            created = outcome.created(),
            "stored fingerprint"
        );
        Ok(outcome)
    }

    fn insert_if_absent(&self, identity: &str, vector: &[f64]) -> AppResult<InsertOutcome> {
        let path = self.fingerprint_path(identity);
        let _guard = self.lock(identity);

        if let Some(existing) = read_fingerprint(&path, identity)? {
            return Ok(InsertOutcome::Existing(existing));
        }

        let fingerprint = Fingerprint::new(identity, vector);
        write_fingerprint(&path, &fingerprint)?;
        info!(identity, fingerprint_id = %fingerprint.id, "stored fingerprint");
        Ok(InsertOutcome::Inserted(fingerprint))
    }

    fn ping(&self) -> AppResult<()> {
        if !self.dir.is_dir() {
            return Err(AppError::StoreUnavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        fs::read_dir(&self.dir).map_err(|source| AppError::StoreRead {
            path: self.dir.clone(),
            source,
        })?;
        NamedTempFile::new_in(&self.dir).map_err(|source| AppError::StoreWrite {
            path: self.dir.clone(),
            source,
        })?;
        Ok(())
    }
}

fn read_fingerprint(path: &Path, identity: &str) -> AppResult<Option<Fingerprint>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AppError::StoreRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let fingerprint: Fingerprint =
        serde_json::from_slice(&data).map_err(|err| AppError::InvalidStoreFile {
            path: path.to_path_buf(),
            message: format!("invalid fingerprint contents: {err}"),
        })?;
    if fingerprint.identity != identity {
        return Err(AppError::InvalidStoreFile {
            path: path.to_path_buf(),
            message: "stored identity does not match file name".into(),
        });
    }
    Ok(Some(fingerprint))
}

fn write_fingerprint(path: &Path, fingerprint: &Fingerprint) -> AppResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent).map_err(|source| AppError::StoreWrite {
        path: path.to_path_buf(),
        source,
    })?;

    {
        let file = tmp.as_file_mut();
        {
            let mut writer = BufWriter::new(&mut *file);
            let serialized = serde_json::to_vec_pretty(fingerprint)?;
            write_line(&mut writer, &serialized).map_err(|source| AppError::StoreWrite {
                path: path.to_path_buf(),
                source,
            })?;
        }
        file.sync_all().map_err(|source| AppError::StoreWrite {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let file = tmp.persist(path).map_err(|err| AppError::StoreWrite {
        path: path.to_path_buf(),
        source: err.error,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file
            .metadata()
            .map_err(|source| AppError::StoreWrite {
                path: path.to_path_buf(),
                source,
            })?
            .permissions();
        perms.set_mode(0o600);
        file.set_permissions(perms)
            .map_err(|source| AppError::StoreWrite {
                path: path.to_path_buf(),
                source,
            })?;
    }
    #[cfg(not(unix))]
    drop(file);

    Ok(())
}

fn write_line<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Non-persistent backend; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryFingerprintStore {
    entries: Mutex<HashMap<String, Fingerprint>>,
}

impl InMemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Fingerprint>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FingerprintStore for InMemoryFingerprintStore {
    fn get(&self, identity: &str) -> AppResult<Option<Fingerprint>> {
        Ok(self.entries().get(identity).cloned())
    }

    fn upsert(&self, identity: &str, vector: &[f64]) -> AppResult<UpsertOutcome> {
        let mut entries = self.entries();
        let outcome = match entries.get_mut(identity) {
            Some(existing) => {
                existing.replace_vector(vector);
                UpsertOutcome::Updated(existing.clone())
            }
            None => {
                let fingerprint = Fingerprint::new(identity, vector);
                entries.insert(identity.to_string(), fingerprint.clone());
                UpsertOutcome::Created(fingerprint)
            }
        };
        Ok(outcome)
    }

    fn insert_if_absent(&self, identity: &str, vector: &[f64]) -> AppResult<InsertOutcome> {
        let mut entries = self.entries();
        if let Some(existing) = entries.get(identity) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        let fingerprint = Fingerprint::new(identity, vector);
        entries.insert(identity.to_string(), fingerprint.clone());
        Ok(InsertOutcome::Inserted(fingerprint))
    }

    fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
