use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FaceprintError;

/// A face embedding produced by an external descriptor model.
///
/// Immutable once created. The length is fixed by the model (typically 128)
/// and is expected to be uniform across a store, but only distance
/// computation enforces it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Wraps a raw vector.
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks that the embedding can be stored and persisted:
    /// non-empty, every component finite.
    pub fn validate(&self) -> Result<(), FaceprintError> {
        if self.0.is_empty() {
            return Err(FaceprintError::InvalidEmbedding("empty vector".into()));
        }
        if let Some(i) = self.0.iter().position(|v| !v.is_finite()) {
            return Err(FaceprintError::InvalidEmbedding(format!(
                "non-finite value at index {i}"
            )));
        }
        Ok(())
    }

    /// Euclidean distance to another embedding.
    pub fn distance(&self, other: &Embedding) -> Result<f32, FaceprintError> {
        euclidean_distance(&self.0, &other.0)
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedding").field("len", &self.0.len()).finish()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl From<&[f32]> for Embedding {
    fn from(values: &[f32]) -> Self {
        Self(values.to_vec())
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// Compute the Euclidean distance between two vectors.
///
/// Accumulates in f64. Vectors of different length are a caller error and
/// are reported, never truncated or padded.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, FaceprintError> {
    if a.len() != b.len() {
        return Err(FaceprintError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }

    let mut sum: f64 = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = *x as f64 - *y as f64;
        sum += d * d;
    }
    Ok(sum.sqrt() as f32)
}

/// Map a distance to a confidence score in `[0, 1]`.
///
/// `exp(-2 * distance)`: 1.0 at distance 0, about 0.30 at 0.6, strictly
/// decreasing toward 0.
pub fn confidence_from_distance(distance: f32) -> f32 {
    let c = (-2.0 * distance as f64).exp();
    c.clamp(0.0, 1.0) as f32
}
