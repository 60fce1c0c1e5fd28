//! Diesel row models and their domain conversions.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::SessionStoreError;
use crate::domain::session::{SessionRecord, SessionStatus};

use super::schema::{session_tools, sessions};

/// Queryable row for checkout sessions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SessionRow {
    pub id: Uuid,
    pub receiver_id: Uuid,
    pub giver_id: Option<Uuid>,
    pub location_id: Uuid,
    pub kit_id: Uuid,
    pub status: String,
    pub given_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub given_image_key: Option<String>,
    pub returned_image_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRow {
    /// Convert a database row into a validated domain record.
    pub(crate) fn into_domain(self) -> Result<SessionRecord, SessionStoreError> {
        let status: SessionStatus = self
            .status
            .parse()
            .map_err(|err: crate::domain::session::SessionStatusParseError| {
                SessionStoreError::query(err.to_string())
            })?;
        Ok(SessionRecord {
            id: self.id,
            receiver_id: self.receiver_id,
            giver_id: self.giver_id,
            location_id: self.location_id,
            kit_id: self.kit_id,
            status,
            given_at: self.given_at,
            returned_at: self.returned_at,
            given_image_key: self.given_image_key,
            returned_image_key: self.returned_image_key,
        })
    }
}

/// Insertable row for new sessions.
#[derive(Debug, Insertable)]
#[diesel(table_name = sessions)]
pub(crate) struct NewSessionRow<'a> {
    pub id: Uuid,
    pub receiver_id: Uuid,
    pub location_id: Uuid,
    pub kit_id: Uuid,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable row for ledger lines created at initialisation.
#[derive(Debug, Insertable)]
#[diesel(table_name = session_tools)]
pub(crate) struct NewSessionToolRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub tool_id: Uuid,
    pub quantity_given: i32,
    pub quantity_returned: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
