//! Domain types, ports and the session workflow.
//!
//! Everything here is transport agnostic: the HTTP adapter in `api` and the
//! driven adapters in `outbound` talk to this module through the types and
//! port traits it exports.

pub mod detection;
pub mod error;
pub mod evidence;
pub mod ports;
pub mod reconcile;
pub mod session;
pub mod workflow;

pub use self::detection::{BoundingBox, Detection, DetectionBatch, ImageMeta};
pub use self::error::{DomainError, ErrorCode};
pub use self::reconcile::{LedgerLine, ToolClassMap};
pub use self::session::{NewSessionDraft, SessionDetails, SessionRecord, SessionStatus};
pub use self::workflow::{RecognizedImage, SessionWorkflow};
