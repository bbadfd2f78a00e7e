pub mod comparer;
pub mod decoder;
pub mod embedding;
pub mod store;
pub mod verification;

pub use comparer::{
    compute_confidence, euclidean_distance, is_match, score_embeddings, FaceComparisonScore,
};

pub use decoder::{decode_payload, encode_image_payload, strip_payload_header, PixelGrid};

pub use embedding::{generate_embedding, EmbeddingConfig, MAX_INTENSITY};

pub use store::{
    FilesystemFingerprintStore, Fingerprint, FingerprintStore, InMemoryFingerprintStore,
    InsertOutcome, UpsertOutcome,
};

pub use verification::{
    validate_identity, EnrollmentOutcome, FaceService, HealthReport, MatchSettings,
    VerificationOutcome, AUTO_ENROLL_MESSAGE, DEFAULT_IMAGE_SIZE, DEFAULT_MATCH_THRESHOLD,
    MAX_IMAGE_SIZE,
};
