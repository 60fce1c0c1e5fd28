//! Evidence image annotation.
//!
//! Before an evidence image is uploaded, the detections that drove the
//! ledger are burned into it as red bounding boxes so a reviewer can see
//! what the model saw. Pure byte-in/byte-out transformation, no I/O.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use thiserror::Error;

use super::detection::Detection;

const BOX_COLOUR: Rgb<u8> = Rgb([220, 30, 30]);
const BOX_THICKNESS: i32 = 3;

/// Failures while decoding or re-encoding an evidence image.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// The submitted bytes are not a decodable image.
    #[error("evidence image could not be decoded: {0}")]
    Decode(image::ImageError),
    /// JPEG re-encoding failed.
    #[error("evidence image could not be encoded: {0}")]
    Encode(image::ImageError),
}

/// Draw detection boxes onto the captured image and return it as JPEG.
///
/// Boxes are clamped to the image bounds; detections whose clamped box is
/// empty are skipped rather than rejected, since the counts they contributed
/// are already in the ledger.
pub fn draw_detections(
    image_bytes: &[u8],
    detections: &[Detection],
) -> Result<Vec<u8>, EvidenceError> {
    let mut canvas: RgbImage = image::load_from_memory(image_bytes)
        .map_err(EvidenceError::Decode)?
        .to_rgb8();

    for detection in detections {
        if let Some(rect) = clamped_rect(detection, canvas.width(), canvas.height()) {
            draw_thick_rect(&mut canvas, rect);
        }
    }

    let mut encoded = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .map_err(EvidenceError::Encode)?;
    Ok(encoded.into_inner())
}

fn clamped_rect(detection: &Detection, width: u32, height: u32) -> Option<Rect> {
    let bbox = &detection.bbox;
    let x1 = bbox.x1.max(0.0).min(width as f32) as i32;
    let y1 = bbox.y1.max(0.0).min(height as f32) as i32;
    let x2 = bbox.x2.max(0.0).min(width as f32) as i32;
    let y2 = bbox.y2.max(0.0).min(height as f32) as i32;

    let w = (x2 - x1).max(0) as u32;
    let h = (y2 - y1).max(0) as u32;
    if w == 0 || h == 0 {
        return None;
    }
    Some(Rect::at(x1, y1).of_size(w, h))
}

fn draw_thick_rect(canvas: &mut RgbImage, rect: Rect) {
    for inset in 0..BOX_THICKNESS {
        let width = rect.width() as i32 - 2 * inset;
        let height = rect.height() as i32 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let inner = Rect::at(rect.left() + inset, rect.top() + inset)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, inner, BOX_COLOUR);
    }
}
