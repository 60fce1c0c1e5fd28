//! PostgreSQL-backed `SessionStore` implementation using Diesel ORM.
//!
//! Transitions are guarded single-row updates: the `WHERE` clause pins both
//! the session id and the expected current status, so a zero-row update
//! means either an unknown session or a stale state. The helper
//! `disambiguate` re-reads the row to tell the two apart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{NewLedgerEntry, SessionStore, SessionStoreError};
use crate::domain::reconcile::LedgerLine;
use crate::domain::session::{NewSessionDraft, SessionRecord, SessionStatus};

use super::models::{NewSessionRow, NewSessionToolRow, SessionRow};
use super::pool::{DbPool, PoolError};
use super::schema::{kit_tools, session_tools, sessions, tools};

/// Diesel-backed implementation of the session store port.
#[derive(Clone)]
pub struct DieselSessionStore {
    pool: DbPool,
}

impl DieselSessionStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_row(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<Option<SessionRow>, SessionStoreError> {
        sessions::table
            .filter(sessions::id.eq(id))
            .select(SessionRow::as_select())
            .first::<SessionRow>(conn)
            .await
            .optional()
            .map_err(map_diesel_error)
    }

    /// Turn a zero-row guarded update into the precise failure.
    async fn disambiguate(
        conn: &mut AsyncPgConnection,
        id: Uuid,
    ) -> Result<SessionStoreError, SessionStoreError> {
        match Self::find_row(conn, id).await? {
            None => Ok(SessionStoreError::session_not_found(id)),
            Some(row) => {
                let actual: SessionStatus = row
                    .status
                    .parse()
                    .map_err(|err: crate::domain::session::SessionStatusParseError| {
                        SessionStoreError::query(err.to_string())
                    })?;
                Ok(SessionStoreError::stale_status(actual))
            }
        }
    }
}

fn map_pool_error(error: PoolError) -> SessionStoreError {
    SessionStoreError::connection(error.to_string())
}

fn map_diesel_error(error: DieselError) -> SessionStoreError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            SessionStoreError::missing_reference(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            SessionStoreError::connection(info.message().to_owned())
        }
        other => SessionStoreError::query(other.to_string()),
    }
}

/// Ledger quantities are non-negative by schema intent; a negative value
/// means a corrupt row and surfaces as a query error, the same way an
/// unknown status text does.
fn quantity(value: i32) -> Result<u32, SessionStoreError> {
    u32::try_from(value)
        .map_err(|_| SessionStoreError::query(format!("negative quantity {value} in ledger row")))
}

#[async_trait]
impl SessionStore for DieselSessionStore {
    async fn create_session(
        &self,
        draft: NewSessionDraft,
    ) -> Result<SessionRecord, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let now = Utc::now();
        let row = NewSessionRow {
            id: Uuid::new_v4(),
            receiver_id: draft.receiver_id,
            location_id: draft.location_id,
            kit_id: draft.kit_id,
            status: SessionStatus::OpenWaitingForApproval.as_str(),
            created_at: now,
            updated_at: now,
        };

        diesel::insert_into(sessions::table)
            .values(&row)
            .get_result::<SessionRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_domain()
    }

    async fn find_session(&self, id: Uuid) -> Result<Option<SessionRecord>, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        match Self::find_row(&mut conn, id).await? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    async fn record_given_evidence(
        &self,
        id: Uuid,
        image_key: &str,
    ) -> Result<SessionRecord, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(sessions::table.filter(sessions::id.eq(id)))
            .set((
                sessions::given_image_key.eq(Some(image_key)),
                sessions::updated_at.eq(Utc::now()),
            ))
            .get_result::<SessionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        match updated {
            Some(row) => row.into_domain(),
            None => Err(SessionStoreError::session_not_found(id)),
        }
    }

    async fn mark_opened(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            sessions::table
                .filter(sessions::id.eq(id))
                .filter(sessions::status.eq(SessionStatus::OpenWaitingForApproval.as_str())),
        )
        .set((
            sessions::status.eq(SessionStatus::Opened.as_str()),
            sessions::given_at.eq(Some(at)),
            sessions::updated_at.eq(Utc::now()),
        ))
        .get_result::<SessionRow>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        match updated {
            Some(row) => row.into_domain(),
            None => Err(Self::disambiguate(&mut conn, id).await?),
        }
    }

    async fn mark_preclosed(
        &self,
        id: Uuid,
        image_key: &str,
    ) -> Result<SessionRecord, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let from_states = [
            SessionStatus::Opened.as_str(),
            SessionStatus::CloseWaitingForApproval.as_str(),
        ];
        let updated = diesel::update(
            sessions::table
                .filter(sessions::id.eq(id))
                .filter(sessions::status.eq_any(from_states)),
        )
        .set((
            sessions::status.eq(SessionStatus::CloseWaitingForApproval.as_str()),
            sessions::returned_image_key.eq(Some(image_key)),
            sessions::updated_at.eq(Utc::now()),
        ))
        .get_result::<SessionRow>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        match updated {
            Some(row) => row.into_domain(),
            None => Err(Self::disambiguate(&mut conn, id).await?),
        }
    }

    async fn mark_closed(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            sessions::table
                .filter(sessions::id.eq(id))
                .filter(sessions::status.eq(SessionStatus::CloseWaitingForApproval.as_str())),
        )
        .set((
            sessions::status.eq(SessionStatus::Closed.as_str()),
            sessions::returned_at.eq(Some(at)),
            sessions::updated_at.eq(Utc::now()),
        ))
        .get_result::<SessionRow>(&mut conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;

        match updated {
            Some(row) => row.into_domain(),
            None => Err(Self::disambiguate(&mut conn, id).await?),
        }
    }

    async fn insert_ledger(
        &self,
        session_id: Uuid,
        entries: Vec<NewLedgerEntry>,
    ) -> Result<(), SessionStoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let now = Utc::now();
        let rows: Vec<NewSessionToolRow> = entries
            .into_iter()
            .map(|entry| NewSessionToolRow {
                id: Uuid::new_v4(),
                session_id,
                tool_id: entry.tool_id,
                quantity_given: entry.quantity_given as i32,
                quantity_returned: 0,
                created_at: now,
                updated_at: now,
            })
            .collect();

        diesel::insert_into(session_tools::table)
            .values(&rows)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn record_returned_quantities(
        &self,
        session_id: Uuid,
        counts: &HashMap<Uuid, u32>,
    ) -> Result<(), SessionStoreError> {
        if counts.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let now = Utc::now();
        // One single-row update per tool; rows for tools without a ledger
        // entry simply match nothing.
        for (tool_id, quantity) in counts {
            diesel::update(
                session_tools::table
                    .filter(session_tools::session_id.eq(session_id))
                    .filter(session_tools::tool_id.eq(tool_id)),
            )
            .set((
                session_tools::quantity_returned.eq(*quantity as i32),
                session_tools::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        }
        Ok(())
    }

    async fn ledger(&self, session_id: Uuid) -> Result<Vec<LedgerLine>, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let session = Self::find_row(&mut conn, session_id)
            .await?
            .ok_or_else(|| SessionStoreError::session_not_found(session_id))?;

        let requirements: Vec<(Uuid, String, i32)> = kit_tools::table
            .inner_join(tools::table)
            .filter(kit_tools::kit_id.eq(session.kit_id))
            .select((tools::id, tools::name, kit_tools::quantity))
            .order(tools::name.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let counted: Vec<(Uuid, i32, i32)> = session_tools::table
            .filter(session_tools::session_id.eq(session_id))
            .select((
                session_tools::tool_id,
                session_tools::quantity_given,
                session_tools::quantity_returned,
            ))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let counted: HashMap<Uuid, (i32, i32)> = counted
            .into_iter()
            .map(|(tool_id, given, returned)| (tool_id, (given, returned)))
            .collect();

        requirements
            .into_iter()
            .map(|(tool_id, tool_name, required)| {
                let (given, returned) = counted.get(&tool_id).copied().unwrap_or((0, 0));
                Ok(LedgerLine {
                    tool_id,
                    tool_name,
                    quantity_required: quantity(required)?,
                    quantity_given: quantity(given)?,
                    quantity_returned: quantity(returned)?,
                })
            })
            .collect()
    }
}
