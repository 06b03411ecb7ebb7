//! Face identification by nearest-neighbor search over face embeddings.
//!
//! # Architecture
//!
//! An external model turns a video frame into face boxes and embeddings.
//! This crate takes it from there:
//!
//! 1. [`DescriptorStore`]: the authoritative identity → embeddings map
//! 2. [`TrainingController`]: adds samples, at most
//!    [`MAX_SAMPLES_PER_IDENTITY`] per identity
//! 3. [`Matcher`]: finds the closest stored embedding and scores it
//! 4. [`PersistenceGateway`]: JSON snapshot of the store in a [`KVStore`]
//! 5. [`view`]: read-only projections (training progress, stats)
//!
//! [`FaceRecognizer`] ties these together and saves after every change.
//!
//! # Scoring
//!
//! Distance is Euclidean. Confidence is `exp(-2 * distance)`, so with the
//! default `max_distance = 0.6` and `min_confidence = 0.5` a match needs a
//! distance of at most `ln 2 / 2 ≈ 0.35`.
//!
//! ```text
//! distance   confidence
//!   0.0        1.00
//!   0.2        0.67
//!   0.35       0.50   <- default acceptance limit
//!   0.6        0.30   <- default candidate limit
//! ```
//!
//! # Identity keys
//!
//! Identities are keyed by a normalized form of the display name (see
//! [`identity_id`]), so "Jane Doe" and "jane doe" are the same person.
//!
//! [`KVStore`]: faceprint_kv::KVStore

mod embedding;
mod error;
mod extractor;
mod identity;
mod matcher;
mod persistence;
mod recognizer;
mod store;
mod training;
pub mod view;

pub use embedding::{confidence_from_distance, euclidean_distance, Embedding};
pub use error::FaceprintError;
pub use extractor::{
    select_by_overlap, BoundingBox, DescriptorExtractor, Detection, FaceDetector, MIN_OVERLAP,
};
pub use identity::{identity_id, Identity};
pub use matcher::{Decision, MatchResult, Matcher, MatcherConfig};
pub use persistence::{
    DatabaseDocument, FaceRecord, ImportOutcome, PersistenceGateway, DEFAULT_STORAGE_KEY,
    INVALID_FORMAT,
};
pub use recognizer::{FaceRecognizer, RecognizerConfig};
pub use store::{DescriptorStore, StoreSnapshot, StoreStats};
pub use training::{
    Progress, Recommendation, TrainingController, TrainingOutcome, ValidationReport,
    MAX_SAMPLES_PER_IDENTITY, MIN_TRAINING_SAMPLES, RECOMMENDED_SAMPLES,
};
pub use view::{DatabaseStats, IdentityView};
