//! Scenario tests for the session workflow.
//!
//! Ports are mockall doubles; mockall panics on unexpected calls, which is
//! what proves that recognition failures abort before any persistence.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use uuid::Uuid;

use super::SessionWorkflow;
use crate::domain::detection::{BoundingBox, Detection, DetectionBatch};
use crate::domain::error::ErrorCode;
use crate::domain::ports::{
    DetectionTransportError, MockBlobStore, MockDetectionTransport, MockSessionStore,
    SessionStoreError,
};
use crate::domain::reconcile::{LedgerLine, ToolClassMap};
use crate::domain::session::{NewSessionDraft, SessionRecord, SessionStatus};

fn sample_image() -> Vec<u8> {
    let canvas = image::RgbImage::from_pixel(32, 24, image::Rgb([180, 180, 180]));
    let mut encoded = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(canvas)
        .write_to(&mut encoded, image::ImageFormat::Png)
        .expect("encode fixture");
    encoded.into_inner()
}

fn detection(class_id: u32) -> Detection {
    Detection {
        class_id,
        class_name: format!("class-{class_id}"),
        confidence: 0.92,
        bbox: BoundingBox {
            x1: 1.0,
            y1: 1.0,
            x2: 9.0,
            y2: 9.0,
        },
    }
}

fn batch_of(detections: Vec<Detection>) -> DetectionBatch {
    let total = detections.len() as u32;
    DetectionBatch {
        success: true,
        detections,
        total,
        image: None,
    }
}

fn failed_batch() -> DetectionBatch {
    DetectionBatch {
        success: false,
        detections: Vec::new(),
        total: 0,
        image: None,
    }
}

fn record(id: Uuid, status: SessionStatus) -> SessionRecord {
    SessionRecord {
        id,
        receiver_id: Uuid::new_v4(),
        giver_id: None,
        location_id: Uuid::new_v4(),
        kit_id: Uuid::new_v4(),
        status,
        given_at: None,
        returned_at: None,
        given_image_key: None,
        returned_image_key: None,
    }
}

fn draft() -> NewSessionDraft {
    NewSessionDraft {
        receiver_id: Uuid::new_v4(),
        location_id: Uuid::new_v4(),
        kit_id: Uuid::new_v4(),
    }
}

fn transport_returning(batch: DetectionBatch) -> MockDetectionTransport {
    let mut transport = MockDetectionTransport::new();
    transport
        .expect_recognize()
        .times(1)
        .returning(move |images| {
            assert_eq!(images.len(), 1, "workflow dispatches one image per call");
            Ok(vec![batch.clone()])
        });
    transport
}

fn make_workflow(
    transport: MockDetectionTransport,
    store: MockSessionStore,
    blobs: MockBlobStore,
    class_map: ToolClassMap,
) -> SessionWorkflow {
    SessionWorkflow::new(
        Arc::new(transport),
        Arc::new(store),
        Arc::new(blobs),
        class_map,
    )
}

#[tokio::test]
async fn initialize_creates_ledger_rows_from_detected_counts() {
    // Scenario: detections {class 1: x2, class 2: x1}, mapping {1 -> tool_7, 2 -> tool_9}.
    let tool_7 = Uuid::new_v4();
    let tool_9 = Uuid::new_v4();
    let class_map = ToolClassMap::new([(1, tool_7), (2, tool_9)]);
    let session_id = Uuid::new_v4();

    let transport = transport_returning(batch_of(vec![detection(1), detection(2), detection(1)]));

    let mut store = MockSessionStore::new();
    let created = record(session_id, SessionStatus::OpenWaitingForApproval);
    let after_evidence = SessionRecord {
        given_image_key: Some("sessions/key".into()),
        ..created.clone()
    };
    store
        .expect_create_session()
        .times(1)
        .return_once(move |_| Ok(created));
    let mut expected_entries = vec![(tool_7, 2u32), (tool_9, 1u32)];
    expected_entries.sort();
    store
        .expect_insert_ledger()
        .times(1)
        .withf(move |sid, entries| {
            let mut given: Vec<(Uuid, u32)> = entries
                .iter()
                .map(|entry| (entry.tool_id, entry.quantity_given))
                .collect();
            given.sort();
            *sid == session_id && given == expected_entries
        })
        .returning(|_, _| Ok(()));
    store
        .expect_record_given_evidence()
        .times(1)
        .return_once(move |_, _| Ok(after_evidence));
    store.expect_ledger().times(1).returning(move |_| {
        Ok(vec![
            LedgerLine {
                tool_id: tool_7,
                tool_name: "brace".into(),
                quantity_required: 2,
                quantity_given: 2,
                quantity_returned: 0,
            },
            LedgerLine {
                tool_id: tool_9,
                tool_name: "screwdriver".into(),
                quantity_required: 1,
                quantity_given: 1,
                quantity_returned: 0,
            },
        ])
    });

    let mut blobs = MockBlobStore::new();
    blobs.expect_upload().times(1).returning(|_, _| Ok(()));
    blobs
        .expect_presign()
        .times(1)
        .returning(|key| Ok(format!("https://blobs.example/{key}")));

    let workflow = make_workflow(transport, store, blobs, class_map);
    let details = workflow
        .initialize(draft(), sample_image())
        .await
        .expect("initialize");

    assert_eq!(details.status, SessionStatus::OpenWaitingForApproval);
    assert_eq!(details.tools.len(), 2);
    assert!(details.given_image_url.is_some());
    assert!(details.returned_image_url.is_none());
}

#[tokio::test]
async fn preclose_overwrites_returned_counts_for_redetected_tools_only() {
    // Scenario: only class 1 (x1) re-detected; tool_9's row must stay untouched.
    let tool_7 = Uuid::new_v4();
    let tool_9 = Uuid::new_v4();
    let class_map = ToolClassMap::new([(1, tool_7), (2, tool_9)]);
    let session_id = Uuid::new_v4();

    let transport = transport_returning(batch_of(vec![detection(1)]));

    let mut store = MockSessionStore::new();
    let opened = record(session_id, SessionStatus::Opened);
    let preclosed = SessionRecord {
        status: SessionStatus::CloseWaitingForApproval,
        returned_image_key: Some("sessions/return-key".into()),
        ..opened.clone()
    };
    store
        .expect_find_session()
        .times(1)
        .return_once(move |_| Ok(Some(opened)));
    store
        .expect_record_returned_quantities()
        .times(1)
        .withf(move |sid, counts| {
            *sid == session_id
                && counts.get(&tool_7) == Some(&1)
                && !counts.contains_key(&tool_9)
        })
        .returning(|_, _| Ok(()));
    store
        .expect_mark_preclosed()
        .times(1)
        .return_once(move |_, _| Ok(preclosed));
    store.expect_ledger().times(1).returning(move |_| {
        Ok(vec![
            LedgerLine {
                tool_id: tool_7,
                tool_name: "brace".into(),
                quantity_required: 2,
                quantity_given: 2,
                quantity_returned: 1,
            },
            LedgerLine {
                tool_id: tool_9,
                tool_name: "screwdriver".into(),
                quantity_required: 1,
                quantity_given: 1,
                quantity_returned: 0,
            },
        ])
    });

    let mut blobs = MockBlobStore::new();
    blobs.expect_upload().times(1).returning(|_, _| Ok(()));
    blobs
        .expect_presign()
        .times(1)
        .returning(|key| Ok(format!("https://blobs.example/{key}")));

    let workflow = make_workflow(transport, store, blobs, class_map);
    let details = workflow
        .preclose(session_id, sample_image())
        .await
        .expect("preclose");

    assert_eq!(details.status, SessionStatus::CloseWaitingForApproval);
    let returned: HashMap<Uuid, u32> = details
        .tools
        .iter()
        .map(|line| (line.tool_id, line.quantity_returned))
        .collect();
    assert_eq!(returned.get(&tool_7), Some(&1));
    assert_eq!(returned.get(&tool_9), Some(&0));
}

#[tokio::test]
async fn initialize_aborts_before_persistence_on_unsuccessful_batch() {
    // The store and blob mocks carry no expectations: any call would panic.
    let transport = transport_returning(failed_batch());
    let workflow = make_workflow(
        transport,
        MockSessionStore::new(),
        MockBlobStore::new(),
        ToolClassMap::default(),
    );

    let err = workflow
        .initialize(draft(), sample_image())
        .await
        .expect_err("recognition failure");
    assert_eq!(err.code(), ErrorCode::RecognitionFailed);
}

#[tokio::test]
async fn initialize_aborts_before_persistence_on_undecodable_image() {
    // The detector accepted the bytes, but annotation cannot; no session or
    // ledger rows may exist afterwards, so the store mock carries no
    // expectations.
    let transport = transport_returning(batch_of(vec![detection(1)]));
    let workflow = make_workflow(
        transport,
        MockSessionStore::new(),
        MockBlobStore::new(),
        ToolClassMap::new([(1, Uuid::new_v4())]),
    );

    let err = workflow
        .initialize(draft(), b"not an image".to_vec())
        .await
        .expect_err("undecodable image");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn preclose_leaves_returned_counts_untouched_on_undecodable_image() {
    let session_id = Uuid::new_v4();
    let transport = transport_returning(batch_of(vec![detection(1)]));

    let mut store = MockSessionStore::new();
    let opened = record(session_id, SessionStatus::Opened);
    store
        .expect_find_session()
        .times(1)
        .return_once(move |_| Ok(Some(opened)));
    // No record_returned_quantities or mark_preclosed expectation: a
    // write after the annotation failure would panic the mock.

    let workflow = make_workflow(
        transport,
        store,
        MockBlobStore::new(),
        ToolClassMap::new([(1, Uuid::new_v4())]),
    );

    let err = workflow
        .preclose(session_id, b"not an image".to_vec())
        .await
        .expect_err("undecodable image");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn preclose_rejects_sessions_not_open_for_a_return_pass() {
    let session_id = Uuid::new_v4();
    let mut store = MockSessionStore::new();
    let waiting = record(session_id, SessionStatus::OpenWaitingForApproval);
    store
        .expect_find_session()
        .times(1)
        .return_once(move |_| Ok(Some(waiting)));

    let workflow = make_workflow(
        MockDetectionTransport::new(),
        store,
        MockBlobStore::new(),
        ToolClassMap::default(),
    );

    let err = workflow
        .preclose(session_id, sample_image())
        .await
        .expect_err("precondition");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn details_of_unknown_session_is_not_found() {
    let mut store = MockSessionStore::new();
    store
        .expect_find_session()
        .times(1)
        .return_once(|_| Ok(None));

    let workflow = make_workflow(
        MockDetectionTransport::new(),
        store,
        MockBlobStore::new(),
        ToolClassMap::default(),
    );

    let err = workflow
        .details(Uuid::new_v4())
        .await
        .expect_err("not found");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn open_surfaces_stale_status_as_invalid_request() {
    let session_id = Uuid::new_v4();
    let mut store = MockSessionStore::new();
    store
        .expect_mark_opened()
        .times(1)
        .return_once(|_, _| Err(SessionStoreError::stale_status(SessionStatus::Closed)));

    let workflow = make_workflow(
        MockDetectionTransport::new(),
        store,
        MockBlobStore::new(),
        ToolClassMap::default(),
    );

    let err = workflow.open(session_id).await.expect_err("stale");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn transport_timeout_surfaces_as_recognition_failure() {
    let mut transport = MockDetectionTransport::new();
    transport
        .expect_recognize()
        .times(1)
        .returning(|_| Err(DetectionTransportError::timeout("no reply within 30s")));

    let workflow = make_workflow(
        transport,
        MockSessionStore::new(),
        MockBlobStore::new(),
        ToolClassMap::default(),
    );

    let err = workflow
        .initialize(draft(), sample_image())
        .await
        .expect_err("timeout");
    assert_eq!(err.code(), ErrorCode::RecognitionFailed);
}

#[tokio::test]
async fn recognize_batch_rejects_mismatched_result_lengths() {
    let mut transport = MockDetectionTransport::new();
    transport
        .expect_recognize()
        .times(1)
        .returning(|_| Ok(Vec::new()));

    let workflow = make_workflow(
        transport,
        MockSessionStore::new(),
        MockBlobStore::new(),
        ToolClassMap::default(),
    );

    let err = workflow
        .recognize_batch(vec![sample_image()])
        .await
        .expect_err("length mismatch");
    assert_eq!(err.code(), ErrorCode::InternalError);
}
