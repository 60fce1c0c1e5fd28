//! Detection passthrough endpoint.
//!
//! Diagnostic surface: sends uploaded images to the detection service and
//! returns what it saw, with the boxes drawn in. Persists nothing.

use actix_multipart::form::MultipartForm;
use actix_multipart::form::bytes::Bytes;
use actix_web::{HttpResponse, post, web};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use utoipa::ToSchema;

use super::error::{ApiError, ApiResult};
use crate::domain::{DetectionBatch, DomainError, SessionWorkflow};

/// Multipart payload with one or more images to recognise.
#[derive(MultipartForm)]
pub struct RecognizeForm {
    #[multipart(rename = "images")]
    images: Vec<Bytes>,
}

/// One recognised image: the detection result plus the annotated JPEG.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedImageDto {
    #[serde(flatten)]
    pub batch: DetectionBatch,
    /// Base64-encoded JPEG with detection boxes drawn on the input image.
    pub annotated_image: String,
}

/// Recognise a batch of images without touching any session.
#[utoipa::path(
    post,
    path = "/recognize",
    tags = ["recognition"],
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-image detection results", body = [RecognizedImageDto]),
        (status = 400, description = "No images supplied or an image could not be decoded", body = ApiError),
        (status = 503, description = "Detection service failed or is unreachable", body = ApiError)
    )
)]
#[post("/recognize")]
pub async fn recognize(
    workflow: web::Data<SessionWorkflow>,
    MultipartForm(form): MultipartForm<RecognizeForm>,
) -> ApiResult<HttpResponse> {
    if form.images.is_empty() {
        return Err(ApiError::from_domain(DomainError::invalid_request(
            "at least one image is required",
        )));
    }
    let images = form
        .images
        .into_iter()
        .map(|part| part.data.to_vec())
        .collect();
    let results = workflow
        .recognize_batch(images)
        .await
        .map_err(ApiError::from_domain)?;
    let body: Vec<RecognizedImageDto> = results
        .into_iter()
        .map(|r| RecognizedImageDto {
            batch: r.batch,
            annotated_image: BASE64.encode(r.annotated_jpeg),
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}
