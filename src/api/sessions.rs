//! Checkout-session endpoints.
//!
//! All mutating operations delegate to [`SessionWorkflow`]; this module only
//! unpacks multipart payloads and shapes HTTP responses.

use actix_multipart::form::MultipartForm;
use actix_multipart::form::bytes::Bytes;
use actix_multipart::form::text::Text;
use actix_web::{HttpResponse, get, post, web};
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use crate::domain::{NewSessionDraft, SessionWorkflow};

/// Multipart payload opening a new checkout session.
#[derive(MultipartForm)]
pub struct CreateSessionForm {
    receiver_id: Text<Uuid>,
    location_id: Text<Uuid>,
    kit_id: Text<Uuid>,
    /// Hand-off photograph of the kit being given out.
    image: Bytes,
}

/// Multipart payload carrying the return-pass photograph.
#[derive(MultipartForm)]
pub struct EvidenceForm {
    image: Bytes,
}

/// Start a checkout session from a hand-off photograph.
///
/// The image is sent to the detection service; recognised tools become the
/// session's ledger with their given quantities. The session starts in
/// `open_waiting_for_approval` until a person confirms the hand-off.
#[utoipa::path(
    post,
    path = "/session",
    tags = ["sessions"],
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Session created", body = crate::domain::SessionDetails),
        (status = 400, description = "Malformed request or unknown receiver/location/kit", body = ApiError),
        (status = 503, description = "Detection service failed or is unreachable", body = ApiError)
    )
)]
#[post("/session")]
pub async fn create_session(
    workflow: web::Data<SessionWorkflow>,
    MultipartForm(form): MultipartForm<CreateSessionForm>,
) -> ApiResult<HttpResponse> {
    let draft = NewSessionDraft {
        receiver_id: form.receiver_id.into_inner(),
        location_id: form.location_id.into_inner(),
        kit_id: form.kit_id.into_inner(),
    };
    let details = workflow
        .initialize(draft, form.image.data.to_vec())
        .await
        .map_err(ApiError::from_domain)?;
    Ok(HttpResponse::Created().json(details))
}

/// Approve the hand-off, moving the session to `opened`.
#[utoipa::path(
    post,
    path = "/session/{id}/open",
    tags = ["sessions"],
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session opened", body = crate::domain::SessionDetails),
        (status = 400, description = "Session is not awaiting hand-off approval", body = ApiError),
        (status = 404, description = "Unknown session", body = ApiError)
    )
)]
#[post("/session/{id}/open")]
pub async fn open_session(
    workflow: web::Data<SessionWorkflow>,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let details = workflow
        .open(id.into_inner())
        .await
        .map_err(ApiError::from_domain)?;
    Ok(HttpResponse::Ok().json(details))
}

/// Record a return pass from a photograph of the returned kit.
///
/// Recognised quantities overwrite any counts from an earlier return pass;
/// tools absent from the photograph keep their previous count. The session
/// moves to `close_waiting_for_approval`.
#[utoipa::path(
    post,
    path = "/session/{id}/preclose",
    tags = ["sessions"],
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Return pass recorded", body = crate::domain::SessionDetails),
        (status = 400, description = "Session is not open for a return pass", body = ApiError),
        (status = 404, description = "Unknown session", body = ApiError),
        (status = 503, description = "Detection service failed or is unreachable", body = ApiError)
    )
)]
#[post("/session/{id}/preclose")]
pub async fn preclose_session(
    workflow: web::Data<SessionWorkflow>,
    id: web::Path<Uuid>,
    MultipartForm(form): MultipartForm<EvidenceForm>,
) -> ApiResult<HttpResponse> {
    let details = workflow
        .preclose(id.into_inner(), form.image.data.to_vec())
        .await
        .map_err(ApiError::from_domain)?;
    Ok(HttpResponse::Ok().json(details))
}

/// Approve the return, moving the session to `closed`.
#[utoipa::path(
    post,
    path = "/session/{id}/close",
    tags = ["sessions"],
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session closed", body = crate::domain::SessionDetails),
        (status = 400, description = "Session is not awaiting return approval", body = ApiError),
        (status = 404, description = "Unknown session", body = ApiError)
    )
)]
#[post("/session/{id}/close")]
pub async fn close_session(
    workflow: web::Data<SessionWorkflow>,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let details = workflow
        .close(id.into_inner())
        .await
        .map_err(ApiError::from_domain)?;
    Ok(HttpResponse::Ok().json(details))
}

/// Fetch session state plus the per-tool ledger and presigned evidence URLs.
#[utoipa::path(
    get,
    path = "/session/{id}",
    tags = ["sessions"],
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session details", body = crate::domain::SessionDetails),
        (status = 404, description = "Unknown session", body = ApiError)
    )
)]
#[get("/session/{id}")]
pub async fn session_details(
    workflow: web::Data<SessionWorkflow>,
    id: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let details = workflow
        .details(id.into_inner())
        .await
        .map_err(ApiError::from_domain)?;
    Ok(HttpResponse::Ok().json(details))
}
