use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::extractor::{BoundingBox, DescriptorExtractor, FaceDetector};
use crate::identity::identity_id;
use crate::store::DescriptorStore;
use crate::Embedding;

/// Training stops appending once an identity holds this many embeddings.
pub const MAX_SAMPLES_PER_IDENTITY: usize = 10;

/// Fewest embeddings for an identity to be considered reliably trained.
pub const MIN_TRAINING_SAMPLES: usize = 3;

/// Below this count validation suggests capturing more samples.
pub const RECOMMENDED_SAMPLES: usize = 5;

/// Progress callback: `(sample_index_one_based, total_samples)`.
pub type Progress<'a> = &'a mut (dyn FnMut(usize, usize) + Send);

/// Result of a training run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingOutcome {
    /// True if at least one sample was stored.
    pub success: bool,
    pub samples_added: usize,
    /// Embedding count of the identity after training.
    pub total_samples: usize,
    pub message: String,
}

/// Advice returned by [`TrainingController::validate_training`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "count")]
pub enum Recommendation {
    /// The identity does not exist.
    NotFound,
    /// Needs this many more samples to reach the minimum.
    AddMore(usize),
    /// Meets the minimum but more samples would improve accuracy.
    ConsiderMore,
    /// The per-identity cap is reached.
    MaximumReached,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "identity not found"),
            Self::AddMore(n) => write!(f, "add {n} more sample(s) for reliable recognition"),
            Self::ConsiderMore => write!(f, "consider adding more samples for better accuracy"),
            Self::MaximumReached => write!(f, "maximum number of samples reached"),
        }
    }
}

/// Result of [`TrainingController::validate_training`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub sample_count: usize,
    pub recommendations: Vec<Recommendation>,
}

/// Adds training samples to identities, bounding each identity to
/// [`MAX_SAMPLES_PER_IDENTITY`].
///
/// The cap is a policy of this controller, not of the store:
/// [`TrainingController::add_single_sample`] bypasses it.
pub struct TrainingController {
    store: Arc<DescriptorStore>,
}

impl TrainingController {
    pub fn new(store: Arc<DescriptorStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DescriptorStore> {
        &self.store
    }

    /// Stores the given embeddings for `display_name` in order, stopping
    /// as soon as the identity reaches the cap.
    ///
    /// Samples the store rejects are skipped without aborting the run.
    pub fn train_identity(
        &self,
        display_name: &str,
        embeddings: &[Embedding],
        mut progress: Option<Progress<'_>>,
    ) -> TrainingOutcome {
        if embeddings.is_empty() {
            return no_samples(display_name);
        }

        let total = embeddings.len();
        let mut run = TrainingRun::new(&self.store, display_name);
        for (i, emb) in embeddings.iter().enumerate() {
            if let Some(cb) = progress.as_mut() {
                cb(i + 1, total);
            }
            if run.attempt(Some(emb.clone())) {
                break;
            }
        }
        run.finish()
    }

    /// Like [`TrainingController::train_identity`], extracting each sample
    /// from a frame with `extractor`.
    ///
    /// Extraction happens without holding the store lock, so the identity
    /// may be removed between samples; the next stored sample recreates it.
    pub async fn train_from_frames<D: FaceDetector>(
        &self,
        display_name: &str,
        frames: &[(&D::Frame, BoundingBox)],
        extractor: &DescriptorExtractor<D>,
        mut progress: Option<Progress<'_>>,
    ) -> TrainingOutcome {
        if frames.is_empty() {
            return no_samples(display_name);
        }

        let total = frames.len();
        let mut run = TrainingRun::new(&self.store, display_name);
        for (i, (frame, bbox)) in frames.iter().enumerate() {
            if let Some(cb) = progress.as_mut() {
                cb(i + 1, total);
            }
            let sample = extractor.extract(frame, bbox).await;
            if run.attempt(sample) {
                break;
            }
        }
        run.finish()
    }

    /// Stores one embedding without the cap check.
    pub fn add_single_sample(&self, display_name: &str, embedding: Embedding) -> bool {
        match self.store.add(display_name, embedding) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(name = display_name, error = %e, "sample rejected");
                false
            }
        }
    }

    /// Reports whether `display_name` has enough samples, with advice.
    pub fn validate_training(&self, display_name: &str) -> ValidationReport {
        let Some(count) = self.store.embedding_count(&identity_id(display_name)) else {
            return ValidationReport {
                is_valid: false,
                sample_count: 0,
                recommendations: vec![Recommendation::NotFound],
            };
        };

        let mut recommendations = Vec::new();
        if count < MIN_TRAINING_SAMPLES {
            recommendations.push(Recommendation::AddMore(MIN_TRAINING_SAMPLES - count));
        }
        if count < RECOMMENDED_SAMPLES {
            recommendations.push(Recommendation::ConsiderMore);
        }
        if count == MAX_SAMPLES_PER_IDENTITY {
            recommendations.push(Recommendation::MaximumReached);
        }

        ValidationReport {
            is_valid: count >= MIN_TRAINING_SAMPLES,
            sample_count: count,
            recommendations,
        }
    }
}

struct TrainingRun<'a> {
    store: &'a DescriptorStore,
    name: &'a str,
    id: String,
    added: usize,
}

impl<'a> TrainingRun<'a> {
    fn new(store: &'a DescriptorStore, name: &'a str) -> Self {
        Self {
            store,
            name,
            id: identity_id(name),
            added: 0,
        }
    }

    /// Stores one sample if present. Returns true once the cap is reached.
    fn attempt(&mut self, sample: Option<Embedding>) -> bool {
        match sample {
            Some(emb) => match self.store.add(self.name, emb) {
                Ok(count) => {
                    self.added += 1;
                    tracing::debug!(identity = %self.id, count, "training sample stored");
                }
                Err(e) => tracing::debug!(identity = %self.id, error = %e, "training sample rejected"),
            },
            None => tracing::debug!(identity = %self.id, "no usable embedding for sample"),
        }
        self.count() >= MAX_SAMPLES_PER_IDENTITY
    }

    fn count(&self) -> usize {
        self.store.embedding_count(&self.id).unwrap_or(0)
    }

    fn finish(self) -> TrainingOutcome {
        let total = self.count();
        let message = if total >= MIN_TRAINING_SAMPLES {
            format!(
                "added {} sample(s) for {}; {} stored, well trained",
                self.added, self.name, total
            )
        } else {
            format!(
                "added {} sample(s) for {}; {} stored, need {} more for reliable recognition",
                self.added,
                self.name,
                total,
                MIN_TRAINING_SAMPLES - total
            )
        };
        tracing::info!(identity = %self.id, added = self.added, total, "training finished");
        TrainingOutcome {
            success: self.added > 0,
            samples_added: self.added,
            total_samples: total,
            message,
        }
    }
}

fn no_samples(display_name: &str) -> TrainingOutcome {
    TrainingOutcome {
        success: false,
        samples_added: 0,
        total_samples: 0,
        message: format!("no samples provided for {display_name}"),
    }
}
