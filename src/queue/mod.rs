/// Queue ledger and status transition engine
///
/// The ledger owns all queue entries; every mutation runs under a per-kind
/// lock inside one transaction, recomputes positions, and writes the
/// notifications the mutation caused.

mod ledger;
mod schedule;

pub use ledger::QueueLedger;
pub use schedule::validate_slot;

use crate::db::models::QueueEntry;
use crate::error::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service kinds offered by the admissions office
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Consultation,
    Documents,
}

impl QueueKind {
    pub const ALL: [QueueKind; 2] = [QueueKind::Consultation, QueueKind::Documents];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Consultation => "consultation",
            QueueKind::Documents => "documents",
        }
    }

    pub fn from_str(s: &str) -> QueueResult<Self> {
        match s.to_lowercase().as_str() {
            "consultation" => Ok(QueueKind::Consultation),
            "documents" => Ok(QueueKind::Documents),
            _ => Err(QueueError::Validation(format!("Invalid queue kind: {}", s))),
        }
    }
}

/// Lifecycle status of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Confirmed => "confirmed",
            QueueStatus::Completed => "completed",
            QueueStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> QueueResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(QueueStatus::Pending),
            "confirmed" => Ok(QueueStatus::Confirmed),
            "completed" => Ok(QueueStatus::Completed),
            "cancelled" => Ok(QueueStatus::Cancelled),
            _ => Err(QueueError::Validation(format!("Invalid queue status: {}", s))),
        }
    }

    /// Terminal entries never change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Cancelled)
    }

    /// Legal transitions: pending -> confirmed -> completed, with
    /// cancellation reachable from both non-terminal states. Completion
    /// always requires a prior confirmation.
    pub fn can_transition_to(&self, to: QueueStatus) -> bool {
        matches!(
            (*self, to),
            (QueueStatus::Pending, QueueStatus::Confirmed)
                | (QueueStatus::Confirmed, QueueStatus::Completed)
                | (QueueStatus::Pending, QueueStatus::Cancelled)
                | (QueueStatus::Confirmed, QueueStatus::Cancelled)
        )
    }
}

/// Queue entry creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueueRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
}

/// Client view of a queue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub position: i64,
    pub estimated_time: i64,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&QueueEntry> for QueueEntryView {
    fn from(entry: &QueueEntry) -> Self {
        QueueEntryView {
            id: entry.id.clone(),
            kind: entry.kind.clone(),
            status: entry.status.clone(),
            position: entry.position,
            estimated_time: entry.estimated_wait_minutes,
            scheduled_date: entry.scheduled_date.clone(),
            scheduled_time: entry.scheduled_time.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// Admin view of a queue entry with owner details joined
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminQueueEntryView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub position: i64,
    pub estimated_time: i64,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub user_email: String,
    pub user_phone: String,
}

/// Admin status change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQueueStatusRequest {
    pub status: String,
}

/// One row on the public queue board
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub queue_number: i64,
    /// "current" for a confirmed head of queue, "waiting" otherwise
    pub status: String,
    pub estimated_minutes: i64,
}

/// Public queue monitor projection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub entries: Vec<BoardEntry>,
    pub stats: QueueStats,
    pub last_updated: DateTime<Utc>,
}

/// Aggregate queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub consultation_waiting: i64,
    pub documents_waiting: i64,
    pub average_wait_minutes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_rules() {
        use QueueStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));

        // Completion requires confirmation first
        assert!(!Pending.can_transition_to(Completed));

        // Terminal states are frozen
        for from in [Completed, Cancelled] {
            for to in [Pending, Confirmed, Completed, Cancelled] {
                assert!(!from.can_transition_to(to));
            }
        }

        // No self-loops or reverses
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            QueueStatus::Pending,
            QueueStatus::Confirmed,
            QueueStatus::Completed,
            QueueStatus::Cancelled,
        ] {
            assert_eq!(QueueStatus::from_str(status.as_str()).unwrap(), status);
        }

        assert!(QueueStatus::from_str("processing").is_err());
        assert_eq!(
            QueueStatus::from_str("PENDING").unwrap(),
            QueueStatus::Pending
        );
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in QueueKind::ALL {
            assert_eq!(QueueKind::from_str(kind.as_str()).unwrap(), kind);
        }

        assert!(QueueKind::from_str("exam").is_err());
    }
}
