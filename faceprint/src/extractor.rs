use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Embedding, FaceprintError};

/// Minimum intersection-over-union for a detection to be attributed to a
/// requested box. A detection must strictly exceed it.
pub const MIN_OVERLAP: f32 = 0.5;

/// Axis-aligned box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area, treating negative extents as empty.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection-over-union with another box, in `[0, 1]`.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0)
    }
}

/// One face found by the detection model, with its descriptor.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub descriptor: Embedding,
}

/// Detection model producing face boxes and descriptors for a frame.
///
/// Implemented outside this crate (camera pipeline, ONNX runtime, ...).
/// Calls may suspend; no store lock is held while they do.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Source frame type (decoded image, frame handle, ...).
    type Frame: ?Sized + Sync;

    /// Runs detection and descriptor computation on a frame.
    async fn detect(&self, frame: &Self::Frame) -> Result<Vec<Detection>, FaceprintError>;
}

/// Picks the detection with the highest overlap with `target`.
///
/// Returns `None` unless that overlap strictly exceeds `min_overlap`.
/// Ties keep the first detection.
pub fn select_by_overlap<'a>(
    detections: &'a [Detection],
    target: &BoundingBox,
    min_overlap: f32,
) -> Option<&'a Detection> {
    let mut best: Option<(&Detection, f32)> = None;
    for det in detections {
        let overlap = det.bbox.iou(target);
        if best.is_none_or(|(_, b)| overlap > b) {
            best = Some((det, overlap));
        }
    }
    best.filter(|(_, overlap)| *overlap > min_overlap)
        .map(|(det, _)| det)
}

/// Obtains the embedding for a face box the caller already located.
///
/// The detector is re-run on the frame and the detection overlapping the
/// requested box is used. Detector failures and missing overlaps are
/// ordinary negative results.
pub struct DescriptorExtractor<D> {
    detector: D,
    min_overlap: f32,
}

impl<D: FaceDetector> DescriptorExtractor<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            min_overlap: MIN_OVERLAP,
        }
    }

    /// Overrides the overlap threshold (clamped to `[0, 1]`).
    pub fn with_min_overlap(mut self, min_overlap: f32) -> Self {
        self.min_overlap = min_overlap.clamp(0.0, 1.0);
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Returns the descriptor of the face in `target`, if one can be confirmed.
    pub async fn extract(&self, frame: &D::Frame, target: &BoundingBox) -> Option<Embedding> {
        let detections = match self.detector.detect(frame).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "face detection failed");
                return None;
            }
        };
        match select_by_overlap(&detections, target, self.min_overlap) {
            Some(det) => Some(det.descriptor.clone()),
            None => {
                tracing::debug!(
                    candidates = detections.len(),
                    "no detection overlaps the requested box"
                );
                None
            }
        }
    }
}
