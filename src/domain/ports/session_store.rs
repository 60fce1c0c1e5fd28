//! Port for durable session and ledger persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::reconcile::LedgerLine;
use crate::domain::session::{NewSessionDraft, SessionRecord, SessionStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by session store adapters.
    pub enum SessionStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "session store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "session store query failed: {message}",
        /// A referenced employee, location, kit or tool does not exist.
        MissingReference { message: String } =>
            "referenced entity does not exist: {message}",
        /// The session id did not resolve to a row.
        SessionNotFound { session_id: Uuid } =>
            "session {session_id} not found",
        /// A guarded transition found the session in a different state.
        StaleStatus { actual: SessionStatus } =>
            "session is in state {actual}",
    }
}

/// New ledger row written in bulk at session initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub tool_id: Uuid,
    pub quantity_given: u32,
}

/// Port for session rows and their per-tool ledgers.
///
/// Transition methods are guarded: each performs a single-row atomic update
/// conditioned on the current status, so an out-of-order call fails with
/// [`SessionStoreError::StaleStatus`] instead of corrupting the lifecycle.
/// Cross-call read-modify-write races (two preclose passes racing) are
/// deliberately not serialised here; the last committed write wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session row in [`SessionStatus::OpenWaitingForApproval`].
    async fn create_session(
        &self,
        draft: NewSessionDraft,
    ) -> Result<SessionRecord, SessionStoreError>;

    /// Find a session by id.
    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Record the hand-off evidence key. Set exactly once, at initialisation.
    async fn record_given_evidence(
        &self,
        id: Uuid,
        image_key: &str,
    ) -> Result<SessionRecord, SessionStoreError>;

    /// Guarded transition to [`SessionStatus::Opened`], stamping `given_at`.
    async fn mark_opened(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionStoreError>;

    /// Guarded transition to [`SessionStatus::CloseWaitingForApproval`],
    /// recording the return evidence key. Valid from `Opened` or from a
    /// previous `CloseWaitingForApproval` (re-run).
    async fn mark_preclosed(
        &self,
        id: Uuid,
        image_key: &str,
    ) -> Result<SessionRecord, SessionStoreError>;

    /// Guarded transition to [`SessionStatus::Closed`], stamping `returned_at`.
    async fn mark_closed(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionStoreError>;

    /// Bulk-insert the ledger rows created at initialisation.
    async fn insert_ledger(
        &self,
        session_id: Uuid,
        entries: Vec<NewLedgerEntry>,
    ) -> Result<(), SessionStoreError>;

    /// Overwrite `quantity_returned` for the ledger rows whose tool appears
    /// in `counts`. Rows for tools absent from `counts` are untouched; counts
    /// for tools without a ledger row are ignored.
    async fn record_returned_quantities(
        &self,
        session_id: Uuid,
        counts: &HashMap<Uuid, u32>,
    ) -> Result<(), SessionStoreError>;

    /// Read the reconciliation view: one line per kit tool with required,
    /// given and returned quantities (zero where no ledger row exists).
    async fn ledger(&self, session_id: Uuid) -> Result<Vec<LedgerLine>, SessionStoreError>;
}
