//! Checkout session workflow.
//!
//! Orchestrates the session lifecycle: dispatches captured images to the
//! detection transport, feeds results through the reconciliation engine,
//! persists outcomes via the session store and uploads annotated evidence
//! blobs. Recognition and annotation always happen before any persistence,
//! so a failed batch or an undecodable image leaves no partial session or
//! ledger rows behind.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::detection::DetectionBatch;
use super::error::DomainError;
use super::evidence::{self, EvidenceError};
use super::ports::{
    BlobStore, BlobStoreError, DetectionTransport, DetectionTransportError, NewLedgerEntry,
    SessionStore, SessionStoreError,
};
use super::reconcile::{self, ToolClassMap};
use super::session::{NewSessionDraft, SessionDetails, SessionRecord};

/// Per-image result of the detection passthrough: the raw batch plus the
/// captured image with boxes drawn in.
#[derive(Debug, Clone)]
pub struct RecognizedImage {
    pub batch: DetectionBatch,
    pub annotated_jpeg: Vec<u8>,
}

/// Session workflow service.
///
/// Ports are held as trait objects because the detection transport is chosen
/// at process start from configuration; the transport channel and HTTP
/// client behind it are long-lived and shared by all in-flight calls, while
/// store connections are scoped to a single call inside the adapter.
#[derive(Clone)]
pub struct SessionWorkflow {
    transport: Arc<dyn DetectionTransport>,
    store: Arc<dyn SessionStore>,
    blobs: Arc<dyn BlobStore>,
    class_map: ToolClassMap,
}

impl SessionWorkflow {
    /// Create a workflow over the injected ports and class mapping.
    pub fn new(
        transport: Arc<dyn DetectionTransport>,
        store: Arc<dyn SessionStore>,
        blobs: Arc<dyn BlobStore>,
        class_map: ToolClassMap,
    ) -> Self {
        Self {
            transport,
            store,
            blobs,
            class_map,
        }
    }

    /// Start a checkout: recognise the hand-off image, create the session in
    /// `OpenWaitingForApproval`, write one ledger row per recognised tool
    /// (undetected tools get no row) and upload the annotated evidence.
    pub async fn initialize(
        &self,
        draft: NewSessionDraft,
        image: Vec<u8>,
    ) -> Result<SessionDetails, DomainError> {
        let batch = self.recognize_one(&image).await?;
        let annotated = annotate(&image, &batch)?;
        let counts = reconcile::count_by_class(&batch.detections);
        let tool_counts = self.class_map.map_to_tools(&counts);

        let session = self
            .store
            .create_session(draft)
            .await
            .map_err(map_store_error)?;
        let entries = tool_counts
            .iter()
            .map(|(tool_id, quantity)| NewLedgerEntry {
                tool_id: *tool_id,
                quantity_given: *quantity,
            })
            .collect();
        self.store
            .insert_ledger(session.id, entries)
            .await
            .map_err(map_store_error)?;

        let key = evidence_key(session.id);
        self.blobs
            .upload(&key, annotated)
            .await
            .map_err(map_blob_error)?;
        let session = self
            .store
            .record_given_evidence(session.id, &key)
            .await
            .map_err(map_store_error)?;

        info!(
            session_id = %session.id,
            tools = tool_counts.len(),
            detections = batch.detections.len(),
            "session initialised"
        );
        self.assemble_details(session).await
    }

    /// Approve the hand-off: `OpenWaitingForApproval -> Opened`.
    pub async fn open(&self, id: Uuid) -> Result<SessionDetails, DomainError> {
        let session = self
            .store
            .mark_opened(id, chrono::Utc::now())
            .await
            .map_err(map_store_error)?;
        info!(session_id = %session.id, "session opened");
        self.assemble_details(session).await
    }

    /// Record a return pass: recognise the returned-tools image, overwrite
    /// `quantity_returned` for re-detected tools and move the session to
    /// `CloseWaitingForApproval`. Re-running replaces the previous counts.
    pub async fn preclose(&self, id: Uuid, image: Vec<u8>) -> Result<SessionDetails, DomainError> {
        let session = self.require_session(id).await?;
        if !session.status.allows_preclose() {
            return Err(
                DomainError::invalid_request("session is not open for a return pass")
                    .with_details(json!({ "status": session.status })),
            );
        }

        let batch = self.recognize_one(&image).await?;
        let annotated = annotate(&image, &batch)?;
        let counts = self
            .class_map
            .map_to_tools(&reconcile::count_by_class(&batch.detections));
        self.store
            .record_returned_quantities(id, &counts)
            .await
            .map_err(map_store_error)?;

        let key = evidence_key(id);
        self.blobs
            .upload(&key, annotated)
            .await
            .map_err(map_blob_error)?;
        let session = self
            .store
            .mark_preclosed(id, &key)
            .await
            .map_err(map_store_error)?;

        info!(
            session_id = %session.id,
            tools_returned = counts.len(),
            "session preclosed"
        );
        self.assemble_details(session).await
    }

    /// Approve the return: `CloseWaitingForApproval -> Closed`.
    pub async fn close(&self, id: Uuid) -> Result<SessionDetails, DomainError> {
        let session = self
            .store
            .mark_closed(id, chrono::Utc::now())
            .await
            .map_err(map_store_error)?;
        info!(session_id = %session.id, "session closed");
        self.assemble_details(session).await
    }

    /// Assemble the read view for a session.
    pub async fn details(&self, id: Uuid) -> Result<SessionDetails, DomainError> {
        let session = self.require_session(id).await?;
        self.assemble_details(session).await
    }

    /// Detection passthrough: recognise a batch of images and return each
    /// result alongside its annotated image. Per-image `success` flags are
    /// passed through untouched; this surface is diagnostic and mutates
    /// nothing.
    pub async fn recognize_batch(
        &self,
        images: Vec<Vec<u8>>,
    ) -> Result<Vec<RecognizedImage>, DomainError> {
        let batches = self
            .transport
            .recognize(&images)
            .await
            .map_err(map_transport_error)?;
        if batches.len() != images.len() {
            return Err(DomainError::internal(
                "detection transport returned a result list of the wrong length",
            ));
        }

        images
            .iter()
            .zip(batches)
            .map(|(image, batch)| {
                let annotated_jpeg = annotate(image, &batch)?;
                Ok(RecognizedImage {
                    batch,
                    annotated_jpeg,
                })
            })
            .collect()
    }

    async fn require_session(&self, id: Uuid) -> Result<SessionRecord, DomainError> {
        self.store
            .find_session(id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| DomainError::not_found("session not found"))
    }

    async fn recognize_one(&self, image: &[u8]) -> Result<DetectionBatch, DomainError> {
        let images = [image.to_vec()];
        let mut batches = self
            .transport
            .recognize(&images)
            .await
            .map_err(map_transport_error)?;
        let batch = match batches.len() {
            1 => batches.remove(0),
            other => {
                return Err(DomainError::internal(format!(
                    "detection transport returned {other} results for one image"
                )));
            }
        };
        if !batch.success {
            return Err(DomainError::recognition_failed(
                "detection service reported an unsuccessful batch",
            ));
        }
        Ok(batch)
    }

    async fn assemble_details(
        &self,
        session: SessionRecord,
    ) -> Result<SessionDetails, DomainError> {
        let tools = self
            .store
            .ledger(session.id)
            .await
            .map_err(map_store_error)?;
        let given_image_url = self.presign_if_set(session.given_image_key.as_deref()).await?;
        let returned_image_url = self
            .presign_if_set(session.returned_image_key.as_deref())
            .await?;

        Ok(SessionDetails {
            id: session.id,
            receiver_id: session.receiver_id,
            giver_id: session.giver_id,
            location_id: session.location_id,
            kit_id: session.kit_id,
            status: session.status,
            given_at: session.given_at,
            returned_at: session.returned_at,
            given_image_url,
            returned_image_url,
            tools,
        })
    }

    async fn presign_if_set(&self, key: Option<&str>) -> Result<Option<String>, DomainError> {
        match key {
            Some(key) => Ok(Some(
                self.blobs.presign(key).await.map_err(map_blob_error)?,
            )),
            None => Ok(None),
        }
    }
}

/// Blob keys are fresh per call so prior evidence is never overwritten.
fn evidence_key(session_id: Uuid) -> String {
    format!("sessions/{session_id}/{}.jpg", Uuid::new_v4())
}

fn annotate(image: &[u8], batch: &DetectionBatch) -> Result<Vec<u8>, DomainError> {
    evidence::draw_detections(image, &batch.detections).map_err(|err| match err {
        EvidenceError::Decode(cause) => {
            DomainError::invalid_request(format!("submitted image is not decodable: {cause}"))
        }
        EvidenceError::Encode(cause) => {
            DomainError::internal(format!("evidence image encoding failed: {cause}"))
        }
    })
}

fn map_transport_error(error: DetectionTransportError) -> DomainError {
    match error {
        DetectionTransportError::Timeout { message } => DomainError::recognition_failed(format!(
            "detection reply never arrived: {message}"
        )),
        DetectionTransportError::Connection { message } => {
            DomainError::detection_unavailable(format!("detection transport failed: {message}"))
        }
        DetectionTransportError::UpstreamStatus { status } => DomainError::detection_unavailable(
            format!("detection endpoint returned status {status}"),
        ),
        DetectionTransportError::Decode { message } => DomainError::detection_unavailable(format!(
            "detection reply could not be decoded: {message}"
        )),
    }
}

fn map_store_error(error: SessionStoreError) -> DomainError {
    match error {
        SessionStoreError::SessionNotFound { session_id } => {
            DomainError::not_found("session not found")
                .with_details(json!({ "sessionId": session_id }))
        }
        SessionStoreError::StaleStatus { actual } => {
            DomainError::invalid_request("session does not allow this transition")
                .with_details(json!({ "status": actual }))
        }
        SessionStoreError::MissingReference { message } => {
            DomainError::invalid_request(format!("unknown reference: {message}"))
        }
        SessionStoreError::Connection { message } => {
            DomainError::internal(format!("session store unavailable: {message}"))
        }
        SessionStoreError::Query { message } => {
            DomainError::internal(format!("session store error: {message}"))
        }
    }
}

fn map_blob_error(error: BlobStoreError) -> DomainError {
    DomainError::internal(format!("evidence storage failed: {error}"))
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod workflow_tests;
