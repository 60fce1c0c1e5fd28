//! Wire DTOs for the detection provider.
//!
//! Both transports speak the same response shape. Adapters decode into these
//! DTOs first, then map into domain batches in one validating pass.

use serde::{Deserialize, Serialize};

use crate::domain::detection::{BoundingBox, Detection, DetectionBatch, ImageMeta};

/// Broker-RPC request payload: one image, base64 encoded in transit.
#[derive(Debug, Serialize)]
pub(super) struct DetectRequestDto {
    pub(super) image_bytes: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct DetectResponseDto {
    #[serde(default = "default_success")]
    pub(super) success: bool,
    #[serde(default)]
    pub(super) detections: Vec<DetectionDto>,
    #[serde(default)]
    pub(super) total_detections: u32,
    /// The broker worker omits metadata; the HTTP endpoint includes it.
    pub(super) image_info: Option<ImageInfoDto>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(super) struct DetectionDto {
    pub(super) class_id: u32,
    pub(super) class_name: String,
    pub(super) confidence: f32,
    pub(super) bbox: BBoxDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct BBoxDto {
    pub(super) x1: f32,
    pub(super) y1: f32,
    pub(super) x2: f32,
    pub(super) y2: f32,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageInfoDto {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) mode: String,
}

impl DetectResponseDto {
    pub(super) fn into_domain(self) -> Result<DetectionBatch, String> {
        let detections = self
            .detections
            .into_iter()
            .map(DetectionDto::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DetectionBatch {
            success: self.success,
            total: self.total_detections,
            detections,
            image: self.image_info.map(|info| ImageMeta {
                width: info.width,
                height: info.height,
                mode: info.mode,
            }),
        })
    }
}

impl DetectionDto {
    fn into_domain(self) -> Result<Detection, String> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "detection of class {} carries confidence {} outside [0, 1]",
                self.class_id, self.confidence
            ));
        }
        Ok(Detection {
            class_id: self.class_id,
            class_name: self.class_name,
            confidence: self.confidence,
            bbox: BoundingBox {
                x1: self.bbox.x1,
                y1: self.bbox.y1,
                x2: self.bbox.x2,
                y2: self.bbox.y2,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use super::*;

    #[test]
    fn full_response_decodes_into_a_domain_batch() {
        let body = serde_json::json!({
            "success": true,
            "detections": [{
                "class_id": 1,
                "class_name": "brace",
                "confidence": 0.99,
                "bbox": { "x1": 10.0, "y1": 20.0, "x2": 110.0, "y2": 120.0 }
            }],
            "total_detections": 1,
            "image_info": { "width": 640, "height": 480, "mode": "RGB" }
        });

        let dto: DetectResponseDto = serde_json::from_value(body).expect("decode");
        let batch = dto.into_domain().expect("map");
        assert!(batch.success);
        assert_eq!(batch.total, 1);
        assert_eq!(batch.detections[0].class_id, 1);
        assert_eq!(batch.image.as_ref().map(|meta| meta.width), Some(640));
    }

    #[test]
    fn success_defaults_to_true_and_metadata_is_optional() {
        let body = serde_json::json!({
            "detections": [],
            "total_detections": 0
        });

        let dto: DetectResponseDto = serde_json::from_value(body).expect("decode");
        let batch = dto.into_domain().expect("map");
        assert!(batch.success);
        assert!(batch.image.is_none());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let body = serde_json::json!({
            "detections": [{
                "class_id": 3,
                "class_name": "hammer",
                "confidence": 1.5,
                "bbox": { "x1": 0.0, "y1": 0.0, "x2": 1.0, "y2": 1.0 }
            }],
            "total_detections": 1
        });

        let dto: DetectResponseDto = serde_json::from_value(body).expect("decode");
        let err = dto.into_domain().expect_err("confidence out of range");
        assert!(err.contains("outside [0, 1]"));
    }
}
