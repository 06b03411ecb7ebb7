use thiserror::Error;

/// Errors returned by faceprint operations.
#[derive(Debug, Error)]
pub enum FaceprintError {
    #[error("faceprint: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("faceprint: invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("faceprint: invalid name: {0:?}")]
    InvalidName(String),

    #[error("faceprint: detector error: {0}")]
    Detector(String),

    #[error("faceprint: storage error: {0}")]
    Storage(String),

    #[error("faceprint: serialization error: {0}")]
    Serialization(String),
}

impl From<faceprint_kv::KVError> for FaceprintError {
    fn from(e: faceprint_kv::KVError) -> Self {
        FaceprintError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for FaceprintError {
    fn from(e: serde_json::Error) -> Self {
        FaceprintError::Serialization(e.to_string())
    }
}
