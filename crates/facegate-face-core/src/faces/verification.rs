use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::errors::{AppError, AppResult};
use crate::faces::comparer::score_embeddings;
use crate::faces::decoder::decode_payload;
use crate::faces::embedding::{generate_embedding, EmbeddingConfig};
use crate::faces::store::{Fingerprint, FingerprintStore, InsertOutcome};

pub use facegate_config::{DEFAULT_IMAGE_SIZE, DEFAULT_MATCH_THRESHOLD, MAX_IMAGE_SIZE};

pub const AUTO_ENROLL_MESSAGE: &str = "First face enrolled and verified for this user.";

/// Immutable matching parameters shared by every request of a deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    pub threshold: f64,
    pub image_size: u32,
}

impl MatchSettings {
    pub fn new(threshold: f64, image_size: u32) -> AppResult<Self> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(AppError::InvalidConfig(format!(
                "match threshold must be a positive number, found {threshold}"
            )));
        }
        if image_size == 0 || image_size > MAX_IMAGE_SIZE {
            return Err(AppError::InvalidConfig(format!(
                "image size must be between 1 and {MAX_IMAGE_SIZE}, found {image_size}"
            )));
        }
        Ok(Self {
            threshold,
            image_size,
        })
    }

    pub fn embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig::new(self.image_size)
    }

    pub fn embedding_len(&self) -> usize {
        self.embedding_config().embedding_len()
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            image_size: DEFAULT_IMAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentOutcome {
    pub identity: String,
    pub fingerprint_id: String,
    /// False when an existing fingerprint was replaced.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub identity: String,
    pub matched: bool,
    pub confidence: f64,
    pub auto_enrolled: bool,
    /// Absent on auto-enrollment, where nothing was compared.
    pub distance: Option<f64>,
    pub message: String,
    pub fingerprint_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub store_connected: bool,
}

pub struct FaceService<S> {
    settings: MatchSettings,
    store: S,
}

impl<S: FingerprintStore> FaceService<S> {
    pub fn new(settings: MatchSettings, store: S) -> Self {
        Self { settings, store }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode and embed a transport payload without touching the store.
    pub fn embed_payload(&self, payload: &str) -> AppResult<Vec<f64>> {
        let grid = decode_payload(payload)?;
        generate_embedding(&grid, &self.settings.embedding_config())
    }

    pub fn enroll(&self, identity: &str, payload: &str) -> AppResult<EnrollmentOutcome> {
        validate_identity(identity)?;
        let vector = self.embed_payload(payload)?;

        let outcome = self.store.upsert(identity, &vector)?;
        let created = outcome.created();
        let fingerprint = outcome.into_fingerprint();
        info!(
            identity,
            fingerprint_id = %fingerprint.id,
            created,
            "{} face fingerprint",
            if created { "created" } else { "updated" }
        );

        Ok(EnrollmentOutcome {
            identity: identity.to_string(),
            fingerprint_id: fingerprint.id,
            created,
        })
    }

    /// Compare against the stored reference, enrolling the face when none exists yet.
    pub fn verify(&self, identity: &str, payload: &str) -> AppResult<VerificationOutcome> {
        validate_identity(identity)?;
        let existing = self.store.get(identity)?;
        let vector = self.embed_payload(payload)?;

        let reference = match existing {
            Some(fingerprint) => fingerprint,
            None => match self.store.insert_if_absent(identity, &vector)? {
                InsertOutcome::Inserted(fingerprint) => {
                    info!(
                        identity,
                        fingerprint_id = %fingerprint.id,
                        "no face enrolled; auto-enrolled first sample"
                    );
                    return Ok(VerificationOutcome {
                        identity: identity.to_string(),
                        matched: true,
                        confidence: 1.0,
                        auto_enrolled: true,
                        distance: None,
                        message: AUTO_ENROLL_MESSAGE.to_string(),
                        fingerprint_id: fingerprint.id,
                    });
                }
                InsertOutcome::Existing(fingerprint) => {
                    debug!(identity, "concurrent enrollment won; comparing against it");
                    fingerprint
                }
            },
        };

        self.compare(identity, &vector, &reference)
    }

    pub fn health(&self) -> HealthReport {
        match self.store.ping() {
            Ok(()) => HealthReport {
                store_connected: true,
            },
            Err(err) => {
                warn!(error = %err, "fingerprint store ping failed");
                HealthReport {
                    store_connected: false,
                }
            }
        }
    }

    fn compare(
        &self,
        identity: &str,
        candidate: &[f64],
        reference: &Fingerprint,
    ) -> AppResult<VerificationOutcome> {
        let expected = self.settings.embedding_len();
        for found in [candidate.len(), reference.vector.len()] {
            if found != expected {
                error!(
                    identity,
                    fingerprint_id = %reference.id,
                    expected,
                    found,
                    "embedding length invariant violated"
                );
                return Err(AppError::DimensionMismatch { expected, found });
            }
        }

        let score = score_embeddings(candidate, &reference.vector, self.settings.threshold)?;
        let message = if score.matched {
            format!(
                "Face verified successfully (distance: {:.4}, confidence: {:.2})",
                score.distance, score.confidence
            )
        } else {
            format!(
                "Face does not match stored embedding (distance: {:.4}, confidence: {:.2})",
                score.distance, score.confidence
            )
        };
        info!(
            identity,
            matched = score.matched,
            distance = score.distance,
            confidence = score.confidence,
            "face verification finished"
        );

        Ok(VerificationOutcome {
            identity: identity.to_string(),
            matched: score.matched,
            confidence: score.confidence,
            auto_enrolled: false,
            distance: Some(score.distance),
            message,
            fingerprint_id: reference.id.clone(),
        })
    }
}

pub fn validate_identity(identity: &str) -> AppResult<()> {
    if identity.is_empty() {
        return Err(AppError::InvalidIdentity {
            message: "identity cannot be empty".into(),
        });
    }
    Ok(())
}
