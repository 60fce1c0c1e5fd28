//! Checkout session aggregate and its state machine.
//!
//! A session tracks one checkout-to-return cycle for a kit of tools. Its
//! status moves along a strictly linear path; transitions never regress and
//! never skip a state. The store enforces transitions with guarded
//! single-row updates, so any status sequence observed over time is a prefix
//! of the canonical order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::reconcile::LedgerLine;

/// Lifecycle states of a checkout session, in canonical order.
///
/// # Examples
/// ```
/// use toolcrib::domain::SessionStatus;
///
/// assert!(SessionStatus::OpenWaitingForApproval.may_precede(SessionStatus::Opened));
/// assert!(!SessionStatus::Closed.may_precede(SessionStatus::Opened));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Tools recognised at hand-off; awaiting giver approval.
    OpenWaitingForApproval,
    /// Hand-off approved; tools are with the receiver.
    Opened,
    /// Tools recognised at return; awaiting return approval.
    CloseWaitingForApproval,
    /// Return approved; cycle complete.
    Closed,
}

impl SessionStatus {
    /// Position in the canonical lifecycle order.
    fn rank(self) -> u8 {
        match self {
            Self::OpenWaitingForApproval => 0,
            Self::Opened => 1,
            Self::CloseWaitingForApproval => 2,
            Self::Closed => 3,
        }
    }

    /// Whether `next` is the immediate successor of this state.
    pub fn may_precede(self, next: SessionStatus) -> bool {
        next.rank() == self.rank() + 1
    }

    /// Whether a preclose pass may run in this state.
    ///
    /// Preclose is also valid from `CloseWaitingForApproval` so a re-run with
    /// a different image replaces the previous return counts.
    pub fn allows_preclose(self) -> bool {
        matches!(self, Self::Opened | Self::CloseWaitingForApproval)
    }

    /// Database text representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenWaitingForApproval => "open_waiting_for_approval",
            Self::Opened => "opened",
            Self::CloseWaitingForApproval => "close_waiting_for_approval",
            Self::Closed => "closed",
        }
    }
}

/// Raised when a stored status value is not a known lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown session status: {value}")]
pub struct SessionStatusParseError {
    pub value: String,
}

impl std::str::FromStr for SessionStatus {
    type Err = SessionStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open_waiting_for_approval" => Ok(Self::OpenWaitingForApproval),
            "opened" => Ok(Self::Opened),
            "close_waiting_for_approval" => Ok(Self::CloseWaitingForApproval),
            "closed" => Ok(Self::Closed),
            other => Err(SessionStatusParseError {
                value: other.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persistent state of one checkout session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub receiver_id: Uuid,
    pub giver_id: Option<Uuid>,
    pub location_id: Uuid,
    pub kit_id: Uuid,
    pub status: SessionStatus,
    pub given_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub given_image_key: Option<String>,
    pub returned_image_key: Option<String>,
}

/// Input for creating a session at initialisation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionDraft {
    pub receiver_id: Uuid,
    pub location_id: Uuid,
    pub kit_id: Uuid,
}

/// Read view assembled by the workflow: session state, the per-tool ledger,
/// and presigned evidence URLs for whichever image keys are set.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    pub id: Uuid,
    pub receiver_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub giver_id: Option<Uuid>,
    pub location_id: Uuid,
    pub kit_id: Uuid,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_image_url: Option<String>,
    pub tools: Vec<LedgerLine>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    const ORDER: [SessionStatus; 4] = [
        SessionStatus::OpenWaitingForApproval,
        SessionStatus::Opened,
        SessionStatus::CloseWaitingForApproval,
        SessionStatus::Closed,
    ];

    #[test]
    fn lifecycle_is_linear_without_skips_or_regressions() {
        for (i, from) in ORDER.iter().enumerate() {
            for (j, to) in ORDER.iter().enumerate() {
                assert_eq!(from.may_precede(*to), j == i + 1, "{from} -> {to}");
            }
        }
    }

    #[rstest]
    #[case(SessionStatus::OpenWaitingForApproval, false)]
    #[case(SessionStatus::Opened, true)]
    #[case(SessionStatus::CloseWaitingForApproval, true)]
    #[case(SessionStatus::Closed, false)]
    fn preclose_is_valid_from_opened_and_rerunnable(
        #[case] status: SessionStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(status.allows_preclose(), allowed);
    }

    #[test]
    fn status_text_round_trips_through_the_database_representation() {
        for status in ORDER {
            let parsed: SessionStatus = status.as_str().parse().expect("known status");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_text_is_rejected() {
        let err = "reopened".parse::<SessionStatus>().expect_err("unknown");
        assert_eq!(err.value, "reopened");
    }
}
