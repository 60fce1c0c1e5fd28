//! OpenAPI documentation configuration.
//!
//! Generates the OpenAPI specification for the REST API, consumed by the
//! Swagger UI mounted in debug builds.

use utoipa::OpenApi;

use crate::api::error::ApiError;
use crate::api::recognize::RecognizedImageDto;
use crate::domain::{
    BoundingBox, Detection, DetectionBatch, ErrorCode, ImageMeta, LedgerLine, SessionDetails,
    SessionStatus,
};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Toolcrib API",
        description = "Checkout-session tracking for crib tools: photograph-driven \
                       hand-out and return reconciliation."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::api::sessions::create_session,
        crate::api::sessions::open_session,
        crate::api::sessions::preclose_session,
        crate::api::sessions::close_session,
        crate::api::sessions::session_details,
        crate::api::recognize::recognize,
        crate::api::health::ready,
        crate::api::health::live,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        SessionDetails,
        SessionStatus,
        LedgerLine,
        Detection,
        DetectionBatch,
        BoundingBox,
        ImageMeta,
        RecognizedImageDto,
    )),
    tags(
        (name = "sessions", description = "Checkout-session lifecycle"),
        (name = "recognition", description = "Detection passthrough"),
        (name = "health", description = "Orchestration probes")
    )
)]
pub struct ApiDoc;
