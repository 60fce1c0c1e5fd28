//! Detection results returned by the remote model.
//!
//! These types are ephemeral: they exist per request and are never persisted
//! directly. Only the aggregated per-class counts survive into the session
//! ledger.

use serde::Serialize;
use utoipa::ToSchema;

/// Axis-aligned bounding box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One recognised object instance.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Detection {
    /// Model class identifier; mapped to an internal tool id by the
    /// reconciliation engine.
    pub class_id: u32,
    pub class_name: String,
    /// Confidence score in `[0, 1]`, already filtered server-side against
    /// the deployment's confidence threshold.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Source-image metadata echoed by the detection service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    /// Colour mode the service normalised the image to before inference.
    pub mode: String,
}

/// Per-image detection result.
///
/// `success == false` means the service accepted the request but could not
/// produce detections; the workflow treats this as a retryable failure and
/// persists nothing.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DetectionBatch {
    pub success: bool,
    pub detections: Vec<Detection>,
    pub total: u32,
    /// Absent when the detection worker omits metadata; the workflow never
    /// depends on it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageMeta>,
}
