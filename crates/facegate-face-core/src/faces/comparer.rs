use serde::Serialize;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceComparisonScore {
    pub distance: f64,
    pub confidence: f64,
    pub matched: bool,
}

pub fn score_embeddings(
    candidate: &[f64],
    reference: &[f64],
    threshold: f64,
) -> AppResult<FaceComparisonScore> {
    let distance = euclidean_distance(candidate, reference)?;
    Ok(FaceComparisonScore {
        distance,
        confidence: compute_confidence(distance, threshold),
        matched: is_match(distance, threshold),
    })
}

pub fn euclidean_distance(lhs: &[f64], rhs: &[f64]) -> AppResult<f64> {
    if lhs.len() != rhs.len() {
        return Err(AppError::DimensionMismatch {
            expected: rhs.len(),
            found: lhs.len(),
        });
    }

    let sum = lhs
        .iter()
        .zip(rhs.iter())
        .map(|(l, r)| (l - r) * (l - r))
        .sum::<f64>();
    Ok(sum.sqrt())
}

/// Exponential decay: 1.0 at distance zero, `e^-2` at the threshold.
pub fn compute_confidence(distance: f64, threshold: f64) -> f64 {
    let confidence = (-distance / (threshold / 2.0)).exp();
    confidence.clamp(0.0, 1.0)
}

/// A distance equal to the threshold does not match.
pub fn is_match(distance: f64, threshold: f64) -> bool {
    distance < threshold
}
